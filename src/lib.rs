pub mod errors;
pub mod exec;
pub mod logger;
pub mod metadata;
pub mod query;
pub mod transport;
pub mod types;

use serde_json::Value;

use crate::errors::QueryError;
use crate::exec::bulk::BulkOutcome;
use crate::exec::{Executor, FindResult, PostProcess, QueryOutcome, ViewQuery};
use crate::metadata::{EntityMeta, MetaRegistry};
use crate::query::{Page, PageRequest, PredicateTree, QueryShape, Slice, SortSpec};
use crate::transport::Transport;
use crate::types::{Document, DocumentId};

/// Facade over the compiler and execution layers: one transport plus a
/// registry of entity metadata, addressed by entity name.
pub struct Store<T: Transport> {
    transport: T,
    registry: MetaRegistry,
}

impl<T: Transport> Store<T> {
    #[must_use]
    pub fn new(transport: T, registry: MetaRegistry) -> Self {
        Self { transport, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    pub fn register(&self, entity: impl Into<String>, meta: EntityMeta) {
        self.registry.register(entity, meta);
    }

    fn meta(&self, entity: &str) -> Result<EntityMeta, QueryError> {
        self.registry.get(entity)
    }

    /// Runs a Mango find with an explicit shape (bookmark continuation
    /// included).
    pub fn find(
        &self,
        entity: &str,
        tree: &PredicateTree,
        shape: &QueryShape,
    ) -> Result<FindResult, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).find(tree, shape)
    }

    pub fn find_page(
        &self,
        entity: &str,
        tree: &PredicateTree,
        sort: &[SortSpec],
        page: &PageRequest,
    ) -> Result<Page<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).find_page(tree, sort, page)
    }

    pub fn find_slice(
        &self,
        entity: &str,
        tree: &PredicateTree,
        sort: &[SortSpec],
        page: &PageRequest,
    ) -> Result<Slice<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).find_slice(tree, sort, page)
    }

    pub fn count(&self, entity: &str, tree: &PredicateTree) -> Result<usize, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).count(tree)
    }

    pub fn exists(&self, entity: &str, tree: &PredicateTree) -> Result<bool, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).exists(tree)
    }

    pub fn delete_by_query(
        &self,
        entity: &str,
        tree: &PredicateTree,
    ) -> Result<BulkOutcome<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).delete_by_query(tree)
    }

    /// Dispatches a find and applies a post-processing policy.
    pub fn execute(
        &self,
        entity: &str,
        tree: &PredicateTree,
        shape: &QueryShape,
        policy: PostProcess,
    ) -> Result<QueryOutcome, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).execute(tree, shape, policy)
    }

    pub fn view_page(
        &self,
        entity: &str,
        query: &ViewQuery,
        page: &PageRequest,
    ) -> Result<Page<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).view_page(query, page)
    }

    pub fn view_slice(
        &self,
        entity: &str,
        query: &ViewQuery,
        page: &PageRequest,
    ) -> Result<Slice<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).view_slice(query, page)
    }

    pub fn view_reduce(&self, entity: &str, query: &ViewQuery) -> Result<Value, QueryError> {
        let meta = self.meta(entity)?;
        Executor::new(&self.transport, &meta).view_reduce(query)
    }

    pub fn bulk_get(
        &self,
        entity: &str,
        ids: &[DocumentId],
    ) -> Result<BulkOutcome<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Ok(Executor::new(&self.transport, &meta).bulk().bulk_get(ids))
    }

    pub fn bulk_put(
        &self,
        entity: &str,
        docs: Vec<Document>,
    ) -> Result<BulkOutcome<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Ok(Executor::new(&self.transport, &meta).bulk().bulk_put(docs))
    }

    pub fn bulk_delete(
        &self,
        entity: &str,
        docs: Vec<Document>,
    ) -> Result<BulkOutcome<Document>, QueryError> {
        let meta = self.meta(entity)?;
        Ok(Executor::new(&self.transport, &meta).bulk().bulk_delete(docs))
    }
}

/// Initializes file-based logging for the library.
///
/// Optional: queries work without it, but warnings from the execution and
/// bulk layers are dropped unless some logger is installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
