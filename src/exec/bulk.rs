use std::collections::HashMap;

use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::metadata::EntityMeta;
use crate::transport::{BulkDocsRow, BulkGetResponse, Method, Transport};
use crate::types::{Document, DocumentId};

/// Field flagging a `_bulk_docs` entry as a tombstone.
pub const DELETED_MARKER: &str = "_deleted";

/// Why a single document of a batch did not go through.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BulkError {
    #[error("no response row for this document")]
    MissingResponse,

    #[error("document has no identifier")]
    MissingId,

    #[error("rejected by store: {error}")]
    Rejected { error: String, reason: Option<String> },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Per-document failure, correlated back to the originating input by id.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub id: DocumentId,
    pub error: BulkError,
}

/// Partition of a batch into successes (input order preserved) and
/// failures. Every input lands in exactly one partition; the executor never
/// errors merely because some items failed.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> BulkOutcome<T> {
    #[must_use]
    pub fn is_fully_successful(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn all_failed(ids: impl IntoIterator<Item = DocumentId>, error: &BulkError) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: ids
                .into_iter()
                .map(|id| BulkFailure { id, error: error.clone() })
                .collect(),
        }
    }
}

/// Executes bulk get/put/delete calls and correlates the store's per-row
/// responses back to the inputs.
pub struct BulkExecutor<'a, T: Transport> {
    transport: &'a T,
    meta: &'a EntityMeta,
}

impl<'a, T: Transport> BulkExecutor<'a, T> {
    #[must_use]
    pub fn new(transport: &'a T, meta: &'a EntityMeta) -> Self {
        Self { transport, meta }
    }

    /// Fetches many documents by id in one round trip.
    ///
    /// Response rows are matched back by id; an id the response omits is
    /// reported failed with `MissingResponse`. A failure of the whole batch
    /// call fails every id identically.
    pub fn bulk_get(&self, ids: &[DocumentId]) -> BulkOutcome<Document> {
        let body = json!({
            "docs": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>()
        });
        let path = format!("{}/_bulk_get", self.meta.database);
        let parsed: BulkGetResponse = match self.batch_call(&path, &body, ids.iter().cloned()) {
            Ok(value) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return BulkOutcome::all_failed(
                        ids.iter().cloned(),
                        &BulkError::Transport(format!("malformed bulk response: {e}")),
                    );
                }
            },
            Err(outcome) => return outcome,
        };

        let mut by_id: HashMap<&str, _> = HashMap::new();
        for result in &parsed.results {
            by_id.entry(result.id.as_str()).or_insert(result);
        }

        let mut outcome = BulkOutcome::default();
        for id in ids {
            match by_id.get(id.as_str()) {
                Some(result) => match result.docs.first() {
                    Some(item) if item.ok.is_some() => {
                        if let Some(doc) = &item.ok {
                            outcome.succeeded.push(doc.clone());
                        }
                    }
                    Some(item) => outcome.failed.push(BulkFailure {
                        id: id.clone(),
                        error: BulkError::Rejected {
                            error: item
                                .error
                                .as_ref()
                                .map_or_else(|| "unknown".to_string(), Value::to_string),
                            reason: None,
                        },
                    }),
                    None => outcome
                        .failed
                        .push(BulkFailure { id: id.clone(), error: BulkError::MissingResponse }),
                },
                None => outcome
                    .failed
                    .push(BulkFailure { id: id.clone(), error: BulkError::MissingResponse }),
            }
        }
        if !outcome.failed.is_empty() {
            log::warn!("bulk_get: {} of {} documents failed", outcome.failed.len(), ids.len());
        }
        outcome
    }

    /// Saves many documents in one round trip, assigning a fresh UUID to any
    /// input without an identifier and writing returned revisions back.
    pub fn bulk_put(&self, mut docs: Vec<Document>) -> BulkOutcome<Document> {
        for doc in &mut docs {
            if self.meta.doc_id(doc).is_none() {
                self.meta.set_doc_id(doc, &Uuid::new_v4().to_string());
            }
        }
        self.bulk_docs(docs)
    }

    /// Deletes many documents in one round trip by attaching the tombstone
    /// marker and reusing the save wire shape.
    pub fn bulk_delete(&self, mut docs: Vec<Document>) -> BulkOutcome<Document> {
        for doc in &mut docs {
            if let Some(obj) = doc.as_object_mut() {
                obj.insert(DELETED_MARKER.to_string(), Value::Bool(true));
            }
        }
        self.bulk_docs(docs)
    }

    fn bulk_docs(&self, docs: Vec<Document>) -> BulkOutcome<Document> {
        let input_ids = || docs.iter().map(|d| self.meta.doc_id(d).unwrap_or_default());
        let body = json!({ "docs": &docs });
        let path = format!("{}/_bulk_docs", self.meta.database);
        let rows: Vec<BulkDocsRow> = match self.batch_call(&path, &body, input_ids()) {
            Ok(value) => match serde_json::from_value(value) {
                Ok(rows) => rows,
                Err(e) => {
                    return BulkOutcome::all_failed(
                        input_ids(),
                        &BulkError::Transport(format!("malformed bulk response: {e}")),
                    );
                }
            },
            Err(outcome) => return outcome,
        };

        let mut by_id: HashMap<&str, &BulkDocsRow> = HashMap::new();
        for row in &rows {
            if let Some(id) = &row.id {
                by_id.entry(id.as_str()).or_insert(row);
            }
        }

        let total = docs.len();
        let mut outcome = BulkOutcome::default();
        for mut doc in docs {
            let Some(id) = self.meta.doc_id(&doc) else {
                outcome.failed.push(BulkFailure {
                    id: String::new(),
                    error: BulkError::MissingId,
                });
                continue;
            };
            match by_id.get(id.as_str()) {
                Some(row) if row.succeeded() => {
                    if let Some(rev) = &row.rev {
                        self.meta.set_doc_rev(&mut doc, rev);
                    }
                    outcome.succeeded.push(doc);
                }
                Some(row) => outcome.failed.push(BulkFailure {
                    id,
                    error: BulkError::Rejected {
                        error: row.error.clone().unwrap_or_else(|| "unknown".to_string()),
                        reason: row.reason.clone(),
                    },
                }),
                None => {
                    outcome.failed.push(BulkFailure { id, error: BulkError::MissingResponse });
                }
            }
        }
        if !outcome.failed.is_empty() {
            log::warn!("bulk_docs: {} of {} documents failed", outcome.failed.len(), total);
        }
        outcome
    }

    /// Runs the batch round trip; a whole-call failure is reported as every
    /// pending item failed identically, never as a partial guess.
    fn batch_call(
        &self,
        path: &str,
        body: &Value,
        ids: impl IntoIterator<Item = DocumentId>,
    ) -> Result<Value, BulkOutcome<Document>> {
        match self.transport.execute(Method::Post, path, Some(body)) {
            Ok(resp) if resp.status.is_success() => Ok(resp.body),
            Ok(resp) => {
                log::error!("{} {path} rejected: {:?}", Method::Post.as_str(), resp.status);
                Err(BulkOutcome::all_failed(
                    ids,
                    &BulkError::Transport(format!("store returned {:?}: {}", resp.status, resp.body)),
                ))
            }
            Err(e) => {
                log::error!("{} {path} failed: {e}", Method::Post.as_str());
                Err(BulkOutcome::all_failed(ids, &BulkError::Transport(e.to_string())))
            }
        }
    }
}
