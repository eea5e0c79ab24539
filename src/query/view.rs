use serde_json::{Map, Value, json};

use crate::metadata::ViewDiscriminator;
use crate::query::operator::OperatorKind;

use super::tree::{Condition, PredicateTree};

fn render_condition(c: &Condition) -> String {
    c.operator.js_condition(&c.property, c.value.as_ref())
}

fn discriminator_clause(d: &ViewDiscriminator) -> String {
    OperatorKind::Equals.js_condition(&d.type_field, Some(&Value::String(d.type_value.clone())))
}

/// Renders the predicate tree as one JS boolean expression: `&&` inside
/// AND-groups, `||` across groups.
///
/// The discriminator has to be repeated as the first clause of every
/// OR-branch, since the single expression has no outer grouping. A branch
/// holding more than one clause is parenthesized when there are multiple
/// branches, so `&&`/`||` precedence survives embedding.
#[must_use]
pub fn compile(tree: &PredicateTree, discriminator: Option<&ViewDiscriminator>) -> String {
    if tree.is_empty() {
        return match discriminator {
            Some(d) => discriminator_clause(d),
            None => "true".to_string(),
        };
    }
    let multi_branch = tree.groups.len() > 1;
    let branches: Vec<String> = tree
        .groups
        .iter()
        .map(|g| {
            let mut clauses: Vec<String> = Vec::with_capacity(g.conditions.len() + 1);
            if let Some(d) = discriminator {
                clauses.push(discriminator_clause(d));
            }
            clauses.extend(g.conditions.iter().map(render_condition));
            let joined = clauses.join(" && ");
            if multi_branch && clauses.len() > 1 { format!("({joined})") } else { joined }
        })
        .collect();
    branches.join(" || ")
}

/// Embeds a compiled condition expression into the deterministic map-function
/// template. The document is emitted when the expression holds; `emit_key`
/// defaults to `doc._id`.
#[must_use]
pub fn map_function(expression: &str, emit_key: Option<&str>) -> String {
    let key = emit_key.unwrap_or("doc._id");
    format!("function(doc) {{ if ({expression}) {{ emit({key}, null); }} }}")
}

/// One named view of a design document.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDef {
    pub name: String,
    pub map: String,
    pub reduce: Option<String>,
}

impl ViewDef {
    pub fn new(name: impl Into<String>, map: impl Into<String>) -> Self {
        Self { name: name.into(), map: map.into(), reduce: None }
    }

    /// Attaches a built-in reduce (e.g. `_count`).
    #[must_use]
    pub fn reduced(mut self, reduce: impl Into<String>) -> Self {
        self.reduce = Some(reduce.into());
        self
    }
}

/// Assembles a `_design` document body from compiled views.
#[must_use]
pub fn design_document(views: &[ViewDef]) -> Value {
    let mut rendered = Map::new();
    for v in views {
        let mut body = Map::new();
        body.insert("map".to_string(), Value::String(v.map.clone()));
        if let Some(reduce) = &v.reduce {
            body.insert("reduce".to_string(), Value::String(reduce.clone()));
        }
        rendered.insert(v.name.clone(), Value::Object(body));
    }
    json!({ "language": "javascript", "views": rendered })
}
