use serde_json::{Map, Value, json};

use crate::errors::QueryError;
use crate::metadata::ViewDiscriminator;

use super::page::SortSpec;
use super::tree::{AndGroup, Condition, PredicateTree};

/// Request-level fields of a Mango find call, all optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryShape {
    pub use_index: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub sort: Vec<SortSpec>,
    pub bookmark: Option<String>,
    pub execution_stats: bool,
}

impl QueryShape {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn use_index(mut self, index: Vec<String>) -> Self {
        self.use_index = Some(index);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn bookmark(mut self, bookmark: impl Into<String>) -> Self {
        self.bookmark = Some(bookmark.into());
        self
    }

    #[must_use]
    pub fn with_execution_stats(mut self) -> Self {
        self.execution_stats = true;
        self
    }
}

/// Renders one condition as a Mango clause.
///
/// Most operators produce `{prop: {token: operand}}`; the negated composite
/// operators wrap that in a selector-level `$not`.
fn render_condition(c: &Condition) -> Value {
    let clause = json!({ (c.property.as_str()): { (c.operator.mango_token()): c.operator.mango_operand(c.value.as_ref()) } });
    if c.operator.mango_negated() { json!({ "$not": clause }) } else { clause }
}

fn render_group(g: &AndGroup) -> Value {
    if g.conditions.len() == 1 {
        render_condition(&g.conditions[0])
    } else {
        json!({ "$and": g.conditions.iter().map(render_condition).collect::<Vec<_>>() })
    }
}

/// Renders the predicate tree as a Mango selector, discriminator conjunct
/// first when present.
#[must_use]
pub fn compile_selector(tree: &PredicateTree, discriminator: Option<&ViewDiscriminator>) -> Value {
    let rendered = if tree.is_empty() {
        None
    } else {
        Some(json!({ "$or": tree.groups.iter().map(render_group).collect::<Vec<_>>() }))
    };
    match (discriminator, rendered) {
        (Some(d), Some(inner)) => {
            json!({ "$and": [ { (d.type_field.as_str()): { "$eq": &d.type_value } }, inner ] })
        }
        (Some(d), None) => json!({ (d.type_field.as_str()): { "$eq": &d.type_value } }),
        (None, Some(inner)) => inner,
        (None, None) => json!({}),
    }
}

/// Compiles a find request body. Emitted key order is fixed (use_index,
/// limit, skip, sort, execution_stats, bookmark, selector) and unset shape
/// fields are omitted entirely, never emitted as `null`.
#[must_use]
pub fn compile(
    tree: &PredicateTree,
    discriminator: Option<&ViewDiscriminator>,
    shape: &QueryShape,
) -> Value {
    let mut body = Map::new();
    if let Some(index) = &shape.use_index {
        body.insert("use_index".to_string(), json!(index));
    }
    if let Some(limit) = shape.limit {
        body.insert("limit".to_string(), json!(limit));
    }
    if let Some(skip) = shape.skip {
        body.insert("skip".to_string(), json!(skip));
    }
    if !shape.sort.is_empty() {
        let sort: Vec<Value> =
            shape.sort.iter().map(|s| json!({ (s.field.as_str()): s.order.as_mango() })).collect();
        body.insert("sort".to_string(), Value::Array(sort));
    }
    if shape.execution_stats {
        body.insert("execution_stats".to_string(), Value::Bool(true));
    }
    if let Some(bookmark) = &shape.bookmark {
        body.insert("bookmark".to_string(), json!(bookmark));
    }
    body.insert("selector".to_string(), compile_selector(tree, discriminator));
    Value::Object(body)
}

/// Serialized form of `compile`; byte-identical for identical inputs.
///
/// # Errors
/// Propagates serialization failures.
pub fn to_request_body(
    tree: &PredicateTree,
    discriminator: Option<&ViewDiscriminator>,
    shape: &QueryShape,
) -> Result<String, QueryError> {
    Ok(serde_json::to_string(&compile(tree, discriminator, shape))?)
}
