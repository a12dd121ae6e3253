use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// `?page=&limit=` query window
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self, default: i64) -> i64 {
        (self.page() - 1).saturating_mul(self.limit(default))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_page: i64) -> Self {
        if rows.is_empty() && current_page <= 1 {
            return Self::no_rows();
        }

        let next = if current_page.saturating_mul(page_size) < total_rows {
            Some(current_page + 1)
        } else {
            None
        };
        let previous = if current_page > 1 {
            Some(current_page - 1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}
