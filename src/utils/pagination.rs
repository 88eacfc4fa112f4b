//! Offset pagination helpers shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound for client-supplied page sizes.
pub const MAX_PER_PAGE: i64 = 100;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Resolves the 1-based page number and page size, falling back to `default_per_page`.
    pub fn resolve(self, default_per_page: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// Page size and row offset for a SQL `LIMIT/OFFSET` clause.
    ///
    /// The offset saturates, so an absurd page number yields an empty page.
    pub fn limit_offset(self, default_per_page: i64) -> (i64, i64) {
        let (page, per_page) = self.resolve(default_per_page);
        (per_page, (page - 1).saturating_mul(per_page))
    }
}

/// A page of results with its position in the full result set.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, params: PageParams, default_per_page: i64, total: i64) -> Self {
        let (current_page, per_page) = params.resolve(default_per_page);
        let last_page = if total <= 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };

        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let params = PageParams::default();
        assert_eq!(params.resolve(15), (1, 15));
        assert_eq!(params.limit_offset(15), (15, 0));
    }

    #[test]
    fn test_resolve_clamps_out_of_range_values() {
        let params = PageParams {
            page: Some(-3),
            per_page: Some(10_000),
        };
        assert_eq!(params.resolve(10), (1, MAX_PER_PAGE));

        let params = PageParams {
            page: Some(2),
            per_page: Some(0),
        };
        assert_eq!(params.resolve(10), (2, 1));
    }

    #[test]
    fn test_offset_for_later_pages() {
        let params = PageParams {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(params.limit_offset(20), (20, 40));
    }

    #[test]
    fn test_huge_page_saturates_offset() {
        let params = PageParams {
            page: Some(i64::MAX),
            per_page: None,
        };
        assert_eq!(params.limit_offset(15), (15, i64::MAX));

        let params = PageParams {
            page: Some(i64::MAX / 2),
            per_page: Some(MAX_PER_PAGE),
        };
        let (_, offset) = params.limit_offset(10);
        assert!(offset >= 0);
    }

    #[test]
    fn test_last_page_rounding() {
        let params = PageParams::default();
        assert_eq!(Page::new(vec![0; 10], params, 10, 21).last_page, 3);
        assert_eq!(Page::new(vec![0; 10], params, 10, 20).last_page, 2);
        assert_eq!(Page::<i32>::new(vec![], params, 10, 0).last_page, 1);
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], PageParams::default(), 12, 3).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20, 30]);
        assert_eq!(page.per_page, 12);
        assert_eq!(page.total, 3);
    }
}
