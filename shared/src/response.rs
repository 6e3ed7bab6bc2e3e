//! Common response types
//!
//! Pagination envelope returned by list endpoints

use serde::{Deserialize, Serialize};

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Paginated list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// Build a page from data and the total row count
    pub fn new(data: Vec<T>, page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            data,
            meta: PageMeta {
                page,
                limit,
                total,
                total_pages,
            },
        }
    }
}
