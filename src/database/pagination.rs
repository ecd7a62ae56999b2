use serde::{Deserialize, Serialize};

use super::error::FoodgramError;
use crate::constants::MAX_PAGE_SIZE;

/// Page-number pagination requested through `page` and `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page_size: i64) -> Self {
        Self {
            page: 1,
            limit: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Applies `page` and `limit` from query parameters, ignoring the rest
    pub fn from_query(params: &[(String, String)], page_size: i64) -> Result<Self, FoodgramError> {
        let mut pagination = Self::new(page_size);

        for (key, value) in params.iter() {
            match key.as_str() {
                "page" => {
                    pagination.page = value
                        .parse::<i64>()
                        .ok()
                        .filter(|page| *page >= 1)
                        .ok_or_else(|| FoodgramError::validation("Invalid page"))?;
                }
                "limit" => {
                    pagination.limit = value
                        .parse::<i64>()
                        .ok()
                        .filter(|limit| *limit >= 1)
                        .ok_or_else(|| FoodgramError::validation("Invalid limit"))?
                        .min(MAX_PAGE_SIZE);
                }
                _ => {}
            }
        }

        Ok(pagination)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page from one window of rows. A page past the last one is
    /// rejected, the first page is always valid even when empty.
    pub fn from_rows(
        results: Vec<T>,
        count: i64,
        pagination: Pagination,
    ) -> Result<Self, FoodgramError> {
        if results.is_empty() && pagination.page > 1 {
            return Err(FoodgramError::NotFound(String::from("Invalid page")));
        }

        let page_count = (count + pagination.limit - 1) / pagination.limit;

        let next = if pagination.page < page_count {
            Some(pagination.page + 1)
        } else {
            None
        };
        let previous = if pagination.page > 1 {
            Some(pagination.page - 1)
        } else {
            None
        };

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_first_page() {
        let pagination = Pagination::from_query(&[], 6).unwrap();
        assert_eq!(pagination, Pagination { page: 1, limit: 6 });
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn reads_page_and_limit() {
        let pagination = Pagination::from_query(&params(&[("page", "3"), ("limit", "10")]), 6).unwrap();
        assert_eq!(pagination.offset(), 20);
    }

    #[test]
    fn caps_limit() {
        let pagination = Pagination::from_query(&params(&[("limit", "100000")]), 6).unwrap();
        assert_eq!(pagination.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn rejects_page_zero() {
        assert!(Pagination::from_query(&params(&[("page", "0")]), 6).is_err());
        assert!(Pagination::from_query(&params(&[("limit", "x")]), 6).is_err());
    }

    #[test]
    fn links_neighbouring_pages() {
        let page = Page::from_rows(vec![1, 2], 14, Pagination { page: 2, limit: 6 }).unwrap();
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::from_rows(vec![1, 2], 14, Pagination { page: 3, limit: 6 }).unwrap();
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));

        let single = Page::from_rows(vec![1], 1, Pagination { page: 1, limit: 6 }).unwrap();
        assert_eq!(single.next, None);
        assert_eq!(single.previous, None);
    }

    #[test]
    fn rejects_page_past_the_end() {
        let result = Page::<i32>::from_rows(vec![], 0, Pagination { page: 4, limit: 6 });
        assert_eq!(
            result.map(|page| page.count),
            Err(FoodgramError::NotFound(String::from("Invalid page")))
        );

        let empty = Page::<i32>::from_rows(vec![], 0, Pagination { page: 1, limit: 6 }).unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.next, None);
        assert_eq!(empty.previous, None);
    }
}
