pub mod bulk;

use serde_json::Value;

use crate::errors::QueryError;
use crate::metadata::EntityMeta;
use crate::query::{
    PageRequest, Page, PredicateTree, QueryShape, Slice, SortSpec, merge_sort_sources,
};
use crate::transport::{FindResponse, Method, Transport, ViewResponse};
use crate::types::Document;

use bulk::{BulkExecutor, BulkOutcome};

/// Post-processing policy applied to the raw result list, selected by the
/// caller's declared intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    Identity,
    Count,
    Exists,
    DeleteByQuery,
    Distinct,
}

/// Result of an executed query after post-processing.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Docs(Vec<Document>),
    Count(usize),
    Exists(bool),
    Deleted(BulkOutcome<Document>),
}

/// Result list plus the continuation bookmark the find endpoint returned.
#[derive(Debug, Clone)]
pub struct FindResult {
    pub docs: Vec<Document>,
    pub bookmark: Option<String>,
}

/// Addressing and key-range parameters of a design-document view read.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub design: String,
    pub view: String,
    pub start_key: Option<Value>,
    pub end_key: Option<Value>,
    pub descending: bool,
}

impl ViewQuery {
    pub fn new(design: impl Into<String>, view: impl Into<String>) -> Self {
        Self { design: design.into(), view: view.into(), ..Self::default() }
    }

    #[must_use]
    pub fn between(mut self, start_key: Value, end_key: Value) -> Self {
        self.start_key = Some(start_key);
        self.end_key = Some(end_key);
        self
    }

    #[must_use]
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
}

/// Binds compiled queries to page/slice requests, dispatches them through
/// the transport, and applies the post-processing policy.
///
/// Binding and sort-merge errors surface before any network call is made.
pub struct Executor<'a, T: Transport> {
    transport: &'a T,
    meta: &'a EntityMeta,
}

impl<'a, T: Transport> Executor<'a, T> {
    #[must_use]
    pub fn new(transport: &'a T, meta: &'a EntityMeta) -> Self {
        Self { transport, meta }
    }

    #[must_use]
    pub fn bulk(&self) -> BulkExecutor<'a, T> {
        BulkExecutor::new(self.transport, self.meta)
    }

    /// Runs a Mango find with an explicit shape and returns the documents
    /// plus the response bookmark, so callers can continue without
    /// re-skipping.
    ///
    /// # Errors
    /// Transport failures propagate with their original cause; an error
    /// body from the find endpoint maps to `QueryError::Decode`.
    pub fn find(&self, tree: &PredicateTree, shape: &QueryShape) -> Result<FindResult, QueryError> {
        let response = self.dispatch_find(tree, shape)?;
        Ok(FindResult { docs: response.docs, bookmark: response.bookmark })
    }

    /// Offset/limit page over a Mango find. The total match count comes
    /// from a second, unlimited dispatch of the same predicate; callers
    /// that only need "is there more" should use `find_slice` instead.
    ///
    /// # Errors
    /// `ConflictingSort` when sort sources disagree (detected before
    /// dispatch); transport failures otherwise.
    pub fn find_page(
        &self,
        tree: &PredicateTree,
        sort: &[SortSpec],
        page: &PageRequest,
    ) -> Result<Page<Document>, QueryError> {
        let shape = self.page_shape(tree, sort, page)?.limit(page.size as u64);
        let response = self.dispatch_find(tree, &shape)?;
        let total = self.count(tree)? as u64;
        Ok(Page { items: response.docs, offset: page.offset, total })
    }

    /// Slice over a Mango find: fetches one extra row to learn whether a
    /// next page exists, and drops it from the returned items.
    ///
    /// # Errors
    /// Same as `find_page`.
    pub fn find_slice(
        &self,
        tree: &PredicateTree,
        sort: &[SortSpec],
        page: &PageRequest,
    ) -> Result<Slice<Document>, QueryError> {
        let shape = self.page_shape(tree, sort, page)?.limit(page.size as u64 + 1);
        let mut docs = self.dispatch_find(tree, &shape)?.docs;
        let has_next = docs.len() > page.size;
        docs.truncate(page.size);
        Ok(Slice { items: docs, has_next })
    }

    /// # Errors
    /// Same as `find`.
    pub fn count(&self, tree: &PredicateTree) -> Result<usize, QueryError> {
        Ok(self.dispatch_find(tree, &QueryShape::default())?.docs.len())
    }

    /// # Errors
    /// Same as `find`.
    pub fn exists(&self, tree: &PredicateTree) -> Result<bool, QueryError> {
        let shape = QueryShape::new().limit(1);
        Ok(!self.dispatch_find(tree, &shape)?.docs.is_empty())
    }

    /// Deletes every document the predicate matches, through the bulk
    /// fan-out executor, and reports the deleted set.
    ///
    /// # Errors
    /// Same as `find`; per-document delete failures are reported in the
    /// returned outcome, not raised.
    pub fn delete_by_query(
        &self,
        tree: &PredicateTree,
    ) -> Result<BulkOutcome<Document>, QueryError> {
        let docs = self.dispatch_find(tree, &QueryShape::default())?.docs;
        Ok(self.bulk().bulk_delete(docs))
    }

    /// Dispatches a find and applies the chosen post-processing policy.
    ///
    /// # Errors
    /// Same as `find`.
    pub fn execute(
        &self,
        tree: &PredicateTree,
        shape: &QueryShape,
        policy: PostProcess,
    ) -> Result<QueryOutcome, QueryError> {
        match policy {
            PostProcess::DeleteByQuery => {
                let docs = self.dispatch_find(tree, shape)?.docs;
                Ok(QueryOutcome::Deleted(self.bulk().bulk_delete(docs)))
            }
            _ => {
                let docs = self.dispatch_find(tree, shape)?.docs;
                Ok(post_process(policy, docs))
            }
        }
    }

    /// Offset/limit page over a view read, in the view's natural key order.
    ///
    /// # Errors
    /// Transport and decode failures.
    pub fn view_page(
        &self,
        query: &ViewQuery,
        page: &PageRequest,
    ) -> Result<Page<Document>, QueryError> {
        let response = self.dispatch_view(query, Some(page.offset), Some(page.size as u64), true)?;
        let total = response.total_rows.unwrap_or(page.offset + response.rows.len() as u64);
        Ok(Page { items: view_docs(response), offset: page.offset, total })
    }

    /// Slice over a view read; limit is size + 1, the synthetic row only
    /// decides `has_next`.
    ///
    /// # Errors
    /// Transport and decode failures.
    pub fn view_slice(
        &self,
        query: &ViewQuery,
        page: &PageRequest,
    ) -> Result<Slice<Document>, QueryError> {
        let response =
            self.dispatch_view(query, Some(page.offset), Some(page.size as u64 + 1), true)?;
        let mut items = view_docs(response);
        let has_next = items.len() > page.size;
        items.truncate(page.size);
        Ok(Slice { items, has_next })
    }

    /// Reads a reduced view and returns the scalar/collection reduce value.
    ///
    /// # Errors
    /// Transport and decode failures; an empty row set is a decode failure.
    pub fn view_reduce(&self, query: &ViewQuery) -> Result<Value, QueryError> {
        let mut response = self.dispatch_view(query, None, None, false)?;
        if response.rows.is_empty() {
            return Err(QueryError::Decode("reduced view returned no rows".to_string()));
        }
        Ok(response.rows.swap_remove(0).value)
    }

    fn page_shape(
        &self,
        tree: &PredicateTree,
        sort: &[SortSpec],
        page: &PageRequest,
    ) -> Result<QueryShape, QueryError> {
        let mut default = tree.default_sort.clone();
        default.extend(self.meta.default_sort.iter().cloned());
        let merged = merge_sort_sources(sort, &page.sort, &default)?;
        Ok(QueryShape::new().skip(page.offset).sorted_by(merged))
    }

    fn dispatch_find(
        &self,
        tree: &PredicateTree,
        shape: &QueryShape,
    ) -> Result<FindResponse, QueryError> {
        let body = crate::query::compile_mango(tree, self.meta.discriminator.as_ref(), shape);
        let path = format!("{}/_find", self.meta.database);
        let resp = self.transport.execute(Method::Post, &path, Some(&body))?;
        if !resp.status.is_success() {
            return Err(QueryError::Transport(format!(
                "{} {path} returned {:?}: {}",
                Method::Post.as_str(),
                resp.status,
                resp.body
            )));
        }
        let parsed: FindResponse = serde_json::from_value(resp.body)?;
        if let Some(error) = &parsed.error {
            let reason = parsed.reason.as_deref().unwrap_or("no reason given");
            return Err(QueryError::Decode(format!("find error {error}: {reason}")));
        }
        if let Some(warning) = &parsed.warning {
            log::warn!("find warning for {path}: {warning}");
        }
        Ok(parsed)
    }

    fn dispatch_view(
        &self,
        query: &ViewQuery,
        skip: Option<u64>,
        limit: Option<u64>,
        include_docs: bool,
    ) -> Result<ViewResponse, QueryError> {
        let mut path = format!(
            "{}/_design/{}/_view/{}",
            self.meta.database, query.design, query.view
        );
        let mut params: Vec<String> = Vec::new();
        if let Some(skip) = skip {
            params.push(format!("skip={skip}"));
        }
        if let Some(limit) = limit {
            params.push(format!("limit={limit}"));
        }
        if query.descending {
            params.push("descending=true".to_string());
        }
        if let Some(key) = &query.start_key {
            params.push(format!("startkey={key}"));
        }
        if let Some(key) = &query.end_key {
            params.push(format!("endkey={key}"));
        }
        if include_docs {
            params.push("include_docs=true".to_string());
        }
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }
        let resp = self.transport.execute(Method::Get, &path, None)?;
        if !resp.status.is_success() {
            return Err(QueryError::Transport(format!(
                "{} {path} returned {:?}: {}",
                Method::Get.as_str(),
                resp.status,
                resp.body
            )));
        }
        Ok(serde_json::from_value(resp.body)?)
    }
}

/// Applies a pure post-processing policy to the raw result list.
///
/// `Distinct` is recognized but unimplemented; it passes results through
/// unchanged and logs a warning so the gap stays visible.
#[must_use]
pub fn post_process(policy: PostProcess, docs: Vec<Document>) -> QueryOutcome {
    match policy {
        PostProcess::Identity => QueryOutcome::Docs(docs),
        PostProcess::Count => QueryOutcome::Count(docs.len()),
        PostProcess::Exists => QueryOutcome::Exists(!docs.is_empty()),
        PostProcess::DeleteByQuery => {
            // Deleting needs the bulk executor; Executor::execute owns that
            // path. Called directly, nothing is deleted.
            log::warn!("delete-by-query cannot run without an executor; results pass through undeleted");
            QueryOutcome::Docs(docs)
        }
        PostProcess::Distinct => {
            log::warn!("distinct post-processing is not implemented; results pass through");
            QueryOutcome::Docs(docs)
        }
    }
}

fn view_docs(response: ViewResponse) -> Vec<Document> {
    response
        .rows
        .into_iter()
        .map(|row| row.doc.unwrap_or(row.value))
        .collect()
}
