use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value arity an operator expects from parameter binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Scalar,
    List,
}

/// Closed set of predicate operators.
///
/// Every variant maps to exactly one Mango condition token and one JS
/// condition template; both match tables below are exhaustive, so adding a
/// variant without extending them fails to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LesserThan,
    LesserThanOrEquals,
    Before,
    After,
    Regex,
    Null,
    NotNull,
    StartingWith,
    EndingWith,
    Like,
    NotLike,
    Containing,
    NotContaining,
    Empty,
    NotEmpty,
    In,
    NotIn,
    True,
    False,
}

impl OperatorKind {
    /// The Mango condition-operator token for this kind.
    ///
    /// Negated composites (`NotContaining`, `NotLike`, `NotEmpty`) report the
    /// token of their positive form; the selector compiler wraps their clause
    /// in `$not`.
    #[must_use]
    pub const fn mango_token(self) -> &'static str {
        match self {
            Self::Equals | Self::Null | Self::True | Self::False => "$eq",
            Self::NotEquals | Self::NotNull => "$ne",
            Self::GreaterThan | Self::After => "$gt",
            Self::GreaterThanOrEquals => "$gte",
            Self::LesserThan | Self::Before => "$lt",
            Self::LesserThanOrEquals => "$lte",
            Self::Regex
            | Self::StartingWith
            | Self::EndingWith
            | Self::Like
            | Self::NotLike
            | Self::Containing
            | Self::NotContaining => "$regex",
            Self::Empty | Self::NotEmpty => "$size",
            Self::In => "$in",
            Self::NotIn => "$nin",
        }
    }

    /// Whether the Mango clause must be wrapped in a selector-level `$not`.
    #[must_use]
    pub const fn mango_negated(self) -> bool {
        matches!(self, Self::NotContaining | Self::NotLike | Self::NotEmpty)
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Null | Self::NotNull | Self::Empty | Self::NotEmpty | Self::True | Self::False => {
                Arity::None
            }
            Self::In | Self::NotIn => Arity::List,
            _ => Arity::Scalar,
        }
    }

    /// The operand placed under the Mango token, synthesized for value-less
    /// operators and regex-composed for the substring family.
    #[must_use]
    pub fn mango_operand(self, value: Option<&Value>) -> Value {
        match self {
            Self::Null | Self::NotNull => Value::Null,
            Self::True => Value::Bool(true),
            Self::False => Value::Bool(false),
            Self::Empty | Self::NotEmpty => Value::from(0),
            Self::StartingWith | Self::Like => {
                Value::String(format!("^{}", escape_regex(&raw_str(value))))
            }
            Self::EndingWith => Value::String(format!("{}$", escape_regex(&raw_str(value)))),
            Self::Containing | Self::NotContaining | Self::NotLike => {
                Value::String(escape_regex(&raw_str(value)))
            }
            Self::Regex => Value::String(raw_str(value)),
            _ => value.cloned().unwrap_or(Value::Null),
        }
    }

    /// Renders the JS boolean condition for this operator over `doc.<field>`.
    ///
    /// The output grammar is fixed: field access is always `doc.<field>`,
    /// scalar values are JSON-quoted, lists render as JSON arrays, and regex
    /// patterns are spliced raw into `/pattern/.test(...)`.
    #[must_use]
    pub fn js_condition(self, field: &str, value: Option<&Value>) -> String {
        let f = format!("doc.{field}");
        match self {
            Self::Equals => format!("{f} == {}", js_literal(value)),
            Self::NotEquals => format!("{f} != {}", js_literal(value)),
            Self::GreaterThan | Self::After => format!("{f} > {}", js_literal(value)),
            Self::GreaterThanOrEquals => format!("{f} >= {}", js_literal(value)),
            Self::LesserThan | Self::Before => format!("{f} < {}", js_literal(value)),
            Self::LesserThanOrEquals => format!("{f} <= {}", js_literal(value)),
            Self::Regex => format!("/{}/.test({f})", raw_str(value)),
            Self::Null => format!("{f} == null"),
            Self::NotNull => format!("{f} != null"),
            Self::StartingWith | Self::Like => format!("{f}.startsWith({})", js_literal(value)),
            Self::EndingWith => format!("{f}.endsWith({})", js_literal(value)),
            Self::Containing => format!("{f}.includes({})", js_literal(value)),
            Self::NotContaining | Self::NotLike => format!("!{f}.includes({})", js_literal(value)),
            Self::Empty => format!("{f}.length == 0"),
            Self::NotEmpty => format!("{f}.length != 0"),
            Self::In => format!("{}.includes({f})", js_literal(value)),
            Self::NotIn => format!("!{}.includes({f})", js_literal(value)),
            Self::True => format!("{f} == true"),
            Self::False => format!("{f} == false"),
        }
    }
}

/// JSON-renders a bound value (scalars quoted, lists as arrays).
fn js_literal(value: Option<&Value>) -> String {
    match value {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    }
}

/// The unquoted string form of a bound value, for regex composition.
fn raw_str(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Escapes regex metacharacters so user values match literally inside a
/// `$regex` operand.
fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
