use std::collections::HashMap;

use serde_json::Value;

use crate::errors::QueryError;

use super::operator::{Arity, OperatorKind};
use super::page::SortSpec;

/// A single named, typed predicate over a dot-separated property path.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub property: String,
    pub operator: OperatorKind,
    pub value: Option<Value>,
}

impl Condition {
    /// Builds a condition, enforcing that `value` matches the operator's
    /// arity (IN/NOT_IN need a list, NULL/EMPTY/TRUE-style operators none).
    ///
    /// # Errors
    /// Returns `QueryError::OperandArity` on a mismatch.
    pub fn new(
        property: impl Into<String>,
        operator: OperatorKind,
        value: Option<Value>,
    ) -> Result<Self, QueryError> {
        match (operator.arity(), &value) {
            (Arity::None, None)
            | (Arity::Scalar, Some(_))
            | (Arity::List, Some(Value::Array(_))) => {}
            (Arity::None, Some(v)) => {
                return Err(QueryError::OperandArity {
                    operator: operator.mango_token(),
                    detail: format!("operator takes no value, got {v}"),
                });
            }
            (Arity::Scalar, None) | (Arity::List, None) => {
                return Err(QueryError::OperandArity {
                    operator: operator.mango_token(),
                    detail: "operator requires a value".to_string(),
                });
            }
            (Arity::List, Some(v)) => {
                return Err(QueryError::OperandArity {
                    operator: operator.mango_token(),
                    detail: format!("operator requires a list, got {v}"),
                });
            }
        }
        Ok(Self { property: property.into(), operator, value })
    }
}

/// Ordered conjunction of conditions. Never empty when built through
/// `PredicateTree::bind`.
#[derive(Debug, Clone, PartialEq)]
pub struct AndGroup {
    pub conditions: Vec<Condition>,
}

impl AndGroup {
    #[must_use]
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }
}

/// One property/operator pair of a predicate specification, before values
/// are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub property: String,
    pub operator: OperatorKind,
}

impl ConditionSpec {
    pub fn new(property: impl Into<String>, operator: OperatorKind) -> Self {
        Self { property: property.into(), operator }
    }
}

/// OR-of-ANDs predicate tree. An empty tree is valid and matches everything.
///
/// Trees are immutable after construction and safe to reuse read-only
/// across threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateTree {
    pub groups: Vec<AndGroup>,
    pub default_sort: Vec<SortSpec>,
}

impl PredicateTree {
    /// The empty tree (matches everything).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(groups: Vec<AndGroup>) -> Self {
        Self { groups, default_sort: Vec::new() }
    }

    /// Attaches a tree-level default sort, the lowest-precedence sort source.
    #[must_use]
    pub fn with_default_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.default_sort = sort;
        self
    }

    /// Builds a tree from OR-groups of condition specs plus a map of bound
    /// parameter values keyed by property path.
    ///
    /// Value-less operators skip the lookup entirely; for all others a
    /// missing entry is an error, never defaulted.
    ///
    /// # Errors
    /// `QueryError::UnboundParameter` for a named condition with no value;
    /// `QueryError::OperandArity` when a bound value does not fit the
    /// operator.
    pub fn bind(
        spec: &[Vec<ConditionSpec>],
        params: &HashMap<String, Value>,
    ) -> Result<Self, QueryError> {
        let mut groups = Vec::with_capacity(spec.len());
        for group in spec {
            let mut conditions = Vec::with_capacity(group.len());
            for cs in group {
                let value = match cs.operator.arity() {
                    Arity::None => None,
                    Arity::Scalar | Arity::List => Some(
                        params
                            .get(&cs.property)
                            .cloned()
                            .ok_or_else(|| QueryError::UnboundParameter(cs.property.clone()))?,
                    ),
                };
                conditions.push(Condition::new(cs.property.clone(), cs.operator, value)?);
            }
            if !conditions.is_empty() {
                groups.push(AndGroup::new(conditions));
            }
        }
        Ok(Self { groups, default_sort: Vec::new() })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All property paths the tree references, in rendering order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flat_map(|g| g.conditions.iter()).map(|c| c.property.as_str())
    }
}
