//! Pagination parameters for provider list operations.

use serde::{Deserialize, Serialize};

/// Limit/offset window applied to a final result set.
///
/// Pagination is applied only after any group-membership enumeration a
/// lookup performs; the enumeration itself is unpaginated, which is a
/// known scale limit for accounts in very large numbers of groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Paging {
    /// Maximum number of rows to return; `None` returns everything.
    pub limit: Option<usize>,
    /// Number of rows to skip.
    pub offset: usize,
}

impl Paging {
    /// A window returning `limit` rows after skipping `offset`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// The unbounded window.
    pub fn all() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }

    /// Apply the window to an in-memory result set.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Paging::new(2, 1).slice(items.clone()), vec![2, 3]);
        assert_eq!(Paging::all().slice(items.clone()), items);
        assert_eq!(Paging::new(10, 4).slice(items), vec![5]);
    }
}
