// In-memory document store speaking just enough of the wire protocol for
// integration tests: _find with a small selector evaluator, _bulk_docs,
// _bulk_get, and design-document view reads.

use std::cmp::Ordering;
use std::collections::HashSet;

use parking_lot::RwLock;
use serde_json::{Value, json};

use mangolite::errors::QueryError;
use mangolite::transport::{Method, StatusCategory, Transport, TransportResponse};

#[derive(Default)]
pub struct MockStore {
    docs: RwLock<Vec<Value>>,
    omit_rows: RwLock<HashSet<String>>,
    reject_ids: RwLock<HashSet<String>>,
    fail_transport: RwLock<bool>,
    calls: RwLock<usize>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, docs: Vec<Value>) {
        self.docs.write().extend(docs);
    }

    pub fn doc_count(&self) -> usize {
        self.docs.read().len()
    }

    /// Response rows for these ids are silently dropped from bulk replies.
    pub fn omit_row(&self, id: &str) {
        self.omit_rows.write().insert(id.to_string());
    }

    /// Bulk writes for these ids come back as conflicts.
    pub fn reject(&self, id: &str) {
        self.reject_ids.write().insert(id.to_string());
    }

    pub fn fail_transport(&self, fail: bool) {
        *self.fail_transport.write() = fail;
    }

    pub fn calls(&self) -> usize {
        *self.calls.read()
    }

    fn handle_find(&self, body: &Value) -> Value {
        let selector = body.get("selector").cloned().unwrap_or_else(|| json!({}));
        let mut matched: Vec<Value> = self
            .docs
            .read()
            .iter()
            .filter(|d| eval_selector(d, &selector))
            .cloned()
            .collect();
        if let Some(sort) = body.get("sort").and_then(Value::as_array) {
            matched.sort_by(|a, b| compare_sorted(a, b, sort));
        }
        let skip = body.get("skip").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = body.get("limit").and_then(Value::as_u64).unwrap_or(u64::MAX) as usize;
        let docs: Vec<Value> = matched.into_iter().skip(skip).take(limit).collect();
        json!({ "docs": docs, "bookmark": "nil" })
    }

    fn handle_bulk_docs(&self, body: &Value) -> Value {
        let inputs = body.get("docs").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut rows = Vec::new();
        for doc in inputs {
            let id = doc.get("_id").and_then(Value::as_str).unwrap_or_default().to_string();
            if self.omit_rows.read().contains(&id) {
                continue;
            }
            if self.reject_ids.read().contains(&id) {
                rows.push(json!({
                    "id": id, "error": "conflict", "reason": "Document update conflict."
                }));
                continue;
            }
            let mut store = self.docs.write();
            store.retain(|d| d.get("_id").and_then(Value::as_str) != Some(id.as_str()));
            let deleted = doc.get("_deleted").and_then(Value::as_bool).unwrap_or(false);
            if !deleted {
                store.push(doc.clone());
            }
            rows.push(json!({ "ok": true, "id": id, "rev": "1-mock" }));
        }
        Value::Array(rows)
    }

    fn handle_bulk_get(&self, body: &Value) -> Value {
        let requested = body.get("docs").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut results = Vec::new();
        for entry in requested {
            let id = entry.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            if self.omit_rows.read().contains(&id) {
                continue;
            }
            let found = self
                .docs
                .read()
                .iter()
                .find(|d| d.get("_id").and_then(Value::as_str) == Some(id.as_str()))
                .cloned();
            match found {
                Some(doc) => results.push(json!({ "id": id, "docs": [{ "ok": doc }] })),
                None => results.push(json!({
                    "id": id,
                    "docs": [{ "error": { "error": "not_found", "id": id } }]
                })),
            }
        }
        json!({ "results": results })
    }

    fn handle_view(&self, path: &str) -> Value {
        let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
        let mut skip = 0usize;
        let mut limit = usize::MAX;
        let mut descending = false;
        let mut include_docs = false;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("skip", v)) => skip = v.parse().unwrap_or(0),
                Some(("limit", v)) => limit = v.parse().unwrap_or(usize::MAX),
                Some(("descending", v)) => descending = v == "true",
                Some(("include_docs", v)) => include_docs = v == "true",
                _ => {}
            }
        }
        if path.contains("/_view/count_all") {
            return json!({ "rows": [{ "key": null, "value": self.docs.read().len() }] });
        }
        let mut docs: Vec<Value> = self.docs.read().clone();
        docs.sort_by(|a, b| {
            let ka = a.get("_id").and_then(Value::as_str).unwrap_or("");
            let kb = b.get("_id").and_then(Value::as_str).unwrap_or("");
            ka.cmp(kb)
        });
        if descending {
            docs.reverse();
        }
        let rows: Vec<Value> = docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| {
                let id = d.get("_id").cloned().unwrap_or(Value::Null);
                if include_docs {
                    json!({ "id": id, "key": id, "value": null, "doc": d })
                } else {
                    json!({ "id": id, "key": id, "value": d })
                }
            })
            .collect();
        json!({ "total_rows": self.docs.read().len(), "offset": skip, "rows": rows })
    }
}

impl Transport for MockStore {
    fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, QueryError> {
        *self.calls.write() += 1;
        if *self.fail_transport.read() {
            return Err(QueryError::Transport("connection refused".to_string()));
        }
        let empty = json!({});
        let body = body.unwrap_or(&empty);
        let reply = match method {
            Method::Post if path.ends_with("/_find") => self.handle_find(body),
            Method::Post if path.ends_with("/_bulk_docs") => self.handle_bulk_docs(body),
            Method::Post if path.ends_with("/_bulk_get") => self.handle_bulk_get(body),
            Method::Get if path.contains("/_design/") => self.handle_view(path),
            _ => {
                return Ok(TransportResponse {
                    status: StatusCategory::NotFound,
                    body: json!({ "error": "not_found" }),
                });
            }
        };
        Ok(TransportResponse { status: StatusCategory::Success, body: reply })
    }
}

fn eval_selector(doc: &Value, selector: &Value) -> bool {
    let Some(obj) = selector.as_object() else { return true };
    obj.iter().all(|(key, spec)| match key.as_str() {
        "$and" => spec
            .as_array()
            .is_some_and(|cs| cs.iter().all(|c| eval_selector(doc, c))),
        "$or" => spec
            .as_array()
            .is_some_and(|cs| cs.iter().any(|c| eval_selector(doc, c))),
        "$not" => !eval_selector(doc, spec),
        field => eval_field(doc.get(field), spec),
    })
}

fn eval_field(value: Option<&Value>, spec: &Value) -> bool {
    let Some(ops) = spec.as_object() else { return false };
    ops.iter().all(|(op, operand)| {
        let cmp = || value.map(|v| compare_json(v, operand));
        match op.as_str() {
            "$eq" => value.unwrap_or(&Value::Null) == operand,
            "$ne" => value.unwrap_or(&Value::Null) != operand,
            "$gt" => cmp() == Some(Ordering::Greater),
            "$gte" => matches!(cmp(), Some(Ordering::Greater | Ordering::Equal)),
            "$lt" => cmp() == Some(Ordering::Less),
            "$lte" => matches!(cmp(), Some(Ordering::Less | Ordering::Equal)),
            "$in" => operand
                .as_array()
                .is_some_and(|set| value.is_some_and(|v| set.contains(v))),
            "$nin" => !operand
                .as_array()
                .is_some_and(|set| value.is_some_and(|v| set.contains(v))),
            "$size" => value
                .and_then(Value::as_array)
                .is_some_and(|a| Some(a.len() as u64) == operand.as_u64()),
            "$regex" => value.and_then(Value::as_str).is_some_and(|s| {
                let pattern = operand.as_str().unwrap_or_default().replace('\\', "");
                match (pattern.strip_prefix('^'), pattern.strip_suffix('$')) {
                    (Some(prefix), None) => s.starts_with(prefix),
                    (None, Some(suffix)) => s.ends_with(suffix),
                    _ => s.contains(pattern.trim_start_matches('^').trim_end_matches('$')),
                }
            }),
            _ => false,
        }
    })
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn compare_sorted(a: &Value, b: &Value, sort: &[Value]) -> Ordering {
    for spec in sort {
        let Some(obj) = spec.as_object() else { continue };
        for (field, dir) in obj {
            let va = a.get(field).unwrap_or(&Value::Null);
            let vb = b.get(field).unwrap_or(&Value::Null);
            let ord = compare_json(va, vb);
            if ord != Ordering::Equal {
                return if dir.as_str() == Some("desc") { ord.reverse() } else { ord };
            }
        }
    }
    Ordering::Equal
}
