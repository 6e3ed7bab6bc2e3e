//! Common request types
//!
//! Query-string types shared by list endpoints

/// Pagination query parameters
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaginationQuery {
    /// Page number (1-based, default: 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page (default: 10, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub fn default_page() -> u32 {
    1
}

pub fn default_limit() -> u32 {
    10
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationQuery {
    /// Get the offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) as u64 * self.limit() as u64
    }

    /// Get the limit (clamped to max 100)
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, 100)
    }
}
