use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub const fn as_mango(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Offset/size paging request; `sort` is the request-level sort source.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub offset: u64,
    pub size: usize,
    pub sort: Vec<SortSpec>,
}

impl PageRequest {
    #[must_use]
    pub fn of(offset: u64, size: usize) -> Self {
        Self { offset, size, sort: Vec::new() }
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }
}

/// A page of results at a known offset, with the total number of rows the
/// query matches (this is what distinguishes a page from a slice).
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: u64,
    pub total: u64,
}

/// A page of results plus a "more data exists" flag, without a total count.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

/// Concatenates the three sort sources in fixed precedence order
/// (explicit parameter, then paging request, then tree default).
///
/// A field repeated with the same direction is kept once; opposite
/// directions for the same field are rejected before any dispatch.
///
/// # Errors
/// Returns `QueryError::ConflictingSort` on a direction conflict.
pub fn merge_sort_sources(
    explicit: &[SortSpec],
    request: &[SortSpec],
    default: &[SortSpec],
) -> Result<Vec<SortSpec>, QueryError> {
    let mut seen: HashMap<&str, Order> = HashMap::new();
    let mut merged = Vec::new();
    for s in explicit.iter().chain(request).chain(default) {
        match seen.get(s.field.as_str()) {
            Some(order) if *order == s.order => {}
            Some(_) => return Err(QueryError::ConflictingSort(s.field.clone())),
            None => {
                seen.insert(s.field.as_str(), s.order);
                merged.push(s.clone());
            }
        }
    }
    Ok(merged)
}
