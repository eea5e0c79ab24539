// Submodules for separation of concerns
pub mod mango;
mod operator;
mod page;
mod tree;
pub mod view;

// Public API re-exports
pub use mango::{QueryShape, compile as compile_mango, compile_selector, to_request_body};
pub use operator::{Arity, OperatorKind};
pub use page::{Order, Page, PageRequest, Slice, SortSpec, merge_sort_sources};
pub use tree::{AndGroup, Condition, ConditionSpec, PredicateTree};
pub use view::{ViewDef, compile as compile_view, design_document, map_function};
