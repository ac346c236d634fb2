//! Pagination types shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not send `limit`.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Items per page, `1..=MAX_LIMIT`.
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// SQL `LIMIT` value.
    #[must_use]
    pub fn sql_limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// SQL `OFFSET` value.
    #[must_use]
    pub fn sql_offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Wrap query results for the given request.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit.max(1));
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        let request = PageRequest { page: 3, limit: 20 };
        assert_eq!(request.sql_offset(), 40);
        assert_eq!(request.sql_limit(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Page<()> = Page::new(Vec::new(), PageRequest { page: 1, limit: 20 }, 41);
        assert_eq!(page.total_pages, 3);

        let empty: Page<()> = Page::new(Vec::new(), PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
    }
}
