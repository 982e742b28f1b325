use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// `?page=&page_size=` query parameters (1-based page).
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based index for SeaORM's `fetch_page`
    pub fn index(&self) -> u64 {
        self.page() - 1
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, params: PageParams) -> Self {
        Self {
            results,
            count,
            page: params.page(),
            page_size: params.page_size(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let params = PageParams {
            page: Some(0),
            page_size: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.index(), 0);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageParams::default().page_size(), DEFAULT_PAGE_SIZE);
    }
}
