//! Page/per-page handling shared by listing endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32> }

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page()) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * self.limit() }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32, pub per_page: u32 }

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self { data, total, page: params.page(), per_page: params.per_page() }
    }

    /// Pages an in-memory list.
    pub fn from_vec(items: Vec<T>, params: &ListParams) -> Self {
        let total = items.len() as i64;
        let data = items.into_iter().skip(params.offset() as usize).take(params.per_page() as usize).collect();
        Self::new(data, total, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let p = ListParams { page: Some(0), per_page: Some(500) };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), MAX_PER_PAGE);
        let p = ListParams { page: Some(3), per_page: Some(10) };
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_from_vec() {
        let page = PaginatedResponse::from_vec((1..=25).collect::<Vec<_>>(), &ListParams { page: Some(2), per_page: Some(10) });
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
    }
}
