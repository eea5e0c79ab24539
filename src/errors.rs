use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unbound parameter: {0}")]
    UnboundParameter(String),

    #[error("Conflicting sort directions for field: {0}")]
    ConflictingSort(String),

    #[error("Operand incompatible with {operator}: {detail}")]
    OperandArity { operator: &'static str, detail: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed store response: {0}")]
    Decode(String),

    #[error("Entity type not registered: {0}")]
    NoSuchEntity(String),
}
