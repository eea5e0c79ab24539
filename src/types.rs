use serde_json::Value;

pub type DatabaseName = String;
pub type DocumentId = String;
pub type RevisionId = String;

/// A document is any valid JSON value. Top-level is expected to be an object.
pub type Document = Value;
