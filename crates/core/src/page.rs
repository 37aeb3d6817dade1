//! Pagination primitives for listing queries.

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of items to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of rows across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Slice an already-ordered collection into a page.
    pub fn from_ordered(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let start = (pagination.offset as usize).min(all.len());
        let items: Vec<T> = all
            .into_iter()
            .skip(start)
            .take(pagination.limit as usize)
            .collect();
        let has_more = (start + items.len()) < total as usize;
        Self {
            items,
            total,
            pagination,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        assert_eq!(Pagination::new(Some(5000), None).limit, MAX_LIMIT);
        assert_eq!(Pagination::new(None, None), Pagination::default());
    }

    #[test]
    fn pages_through_a_collection() {
        let p = Page::from_ordered((0..5).collect::<Vec<_>>(), Pagination::new(Some(2), Some(2)));
        assert_eq!(p.items, vec![2, 3]);
        assert_eq!(p.total, 5);
        assert!(p.has_more);

        let last = Page::from_ordered((0..5).collect::<Vec<_>>(), Pagination::new(Some(2), Some(4)));
        assert_eq!(last.items, vec![4]);
        assert!(!last.has_more);

        let past_end = Page::from_ordered((0..5).collect::<Vec<_>>(), Pagination::new(Some(2), Some(9)));
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_more);
    }
}
