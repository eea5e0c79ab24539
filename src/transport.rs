use serde::Deserialize;
use serde_json::Value;

use crate::errors::QueryError;

/// The two verbs the core issues: GET for view reads, POST for find and
/// bulk calls. Single-document writes and provisioning are owned by the
/// surrounding collaborators, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Coarse response classification; the core never sees raw status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Success,
    NotFound,
    ClientError,
    ServerError,
}

impl StatusCategory {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCategory,
    pub body: Value,
}

/// Narrow synchronous document-store transport contract.
///
/// Connection pooling, TLS, credentials, timeouts and retries all live
/// behind an implementation of this trait; the core only sends a method,
/// a path and an optional JSON body, and propagates failures unchanged.
pub trait Transport {
    /// # Errors
    /// Implementations surface any transport-level failure as
    /// `QueryError::Transport` with the original cause preserved.
    fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, QueryError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, QueryError> {
        (**self).execute(method, path, body)
    }
}

/// `POST {db}/_find` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub docs: Vec<Value>,
    pub bookmark: Option<String>,
    pub warning: Option<String>,
    pub execution_stats: Option<Value>,
    pub error: Option<String>,
    pub reason: Option<String>,
}

/// One correlated entry of a `POST {db}/_bulk_get` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkGetResult {
    pub id: String,
    #[serde(default)]
    pub docs: Vec<BulkGetItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkGetItem {
    pub ok: Option<Value>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkGetResponse {
    #[serde(default)]
    pub results: Vec<BulkGetResult>,
}

/// One row of a `POST {db}/_bulk_docs` response array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDocsRow {
    pub id: Option<String>,
    pub rev: Option<String>,
    #[serde(default)]
    pub ok: Option<bool>,
    pub error: Option<String>,
    pub reason: Option<String>,
}

impl BulkDocsRow {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.rev.is_some()
    }
}

/// A row of a (non-reduced) view read.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow {
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewResponse {
    pub total_rows: Option<u64>,
    pub offset: Option<u64>,
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_renders_its_verb() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
    }

    #[test]
    fn find_response_tolerates_missing_fields() {
        let parsed: FindResponse = serde_json::from_value(json!({
            "docs": [{"a": 1}], "bookmark": "tok"
        }))
        .unwrap();
        assert_eq!(parsed.docs.len(), 1);
        assert_eq!(parsed.bookmark.as_deref(), Some("tok"));
        assert!(parsed.error.is_none());
    }

    #[test]
    fn bulk_docs_row_success_requires_a_revision() {
        let ok: BulkDocsRow =
            serde_json::from_value(json!({"ok": true, "id": "a", "rev": "1-x"})).unwrap();
        assert!(ok.succeeded());
        let conflict: BulkDocsRow =
            serde_json::from_value(json!({"id": "b", "error": "conflict"})).unwrap();
        assert!(!conflict.succeeded());
    }
}
