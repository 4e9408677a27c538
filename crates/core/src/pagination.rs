//! Offset pagination shared by every listing endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Requested page, as parsed from `?page=&limit=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// 1-based page number, never below 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn skip(&self) -> usize {
        (self.page() as usize - 1) * self.limit() as usize
    }

    /// Slice an already filtered and ordered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.skip())
            .take(self.limit() as usize)
            .collect();
        Page {
            items,
            pagination: Pagination::new(self.page(), self.limit(), total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let request = PageRequest::default();
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), DEFAULT_PAGE_SIZE);

        let request = PageRequest::new(0, 500);
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), MAX_PAGE_SIZE);

        let request = PageRequest::new(3, 0);
        assert_eq!(request.limit(), 1);
    }

    #[test]
    fn second_page_slice() {
        let items: Vec<u32> = (0..45).collect();
        let page = PageRequest::new(2, 20).apply(items);

        assert_eq!(page.items.first(), Some(&20));
        assert_eq!(page.items.last(), Some(&39));
        assert_eq!(page.pagination.total, 45);
        assert_eq!(page.pagination.pages, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = PageRequest::new(5, 10).apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.pages, 1);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page = PageRequest::default().apply(Vec::<u8>::new());
        assert_eq!(page.pagination.pages, 0);
    }
}
