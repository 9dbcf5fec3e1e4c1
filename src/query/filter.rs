//! Query filters, sorting, and pagination

use serde::Serialize;

use crate::store::records::SymbolKind;

/// Hard ceiling on page size
pub const MAX_LIMIT: u32 = 500;

/// Default page size
pub const DEFAULT_LIMIT: u32 = 50;

/// Pagination window. Limits above the ceiling are clamped.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit.min(MAX_LIMIT)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Requested sort; fields are validated per query with a default fallback
#[derive(Debug, Clone, Default)]
pub struct Sort {
    pub field: Option<String>,
    pub order: Option<SortOrder>,
}

impl Sort {
    /// Pick the SQL sort expression: the requested field when it is one of
    /// `allowed` (name → expression), else the first (default) entry.
    pub fn sql_expr(&self, allowed: &[(&str, &str)]) -> String {
        let (_, default_expr) = allowed[0];
        let expr = self
            .field
            .as_deref()
            .and_then(|f| {
                allowed
                    .iter()
                    .find(|(name, _)| *name == f)
                    .map(|(_, expr)| *expr)
            })
            .unwrap_or(default_expr);
        let order = self.order.unwrap_or(SortOrder::Asc);
        format!("{} {}", expr, order.sql())
    }
}

/// Filters for symbol discovery queries
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    /// Any-of kinds; empty means all
    pub kinds: Vec<SymbolKind>,
    pub visibility: Option<String>,
    /// All-required modifier tokens
    pub modifiers: Vec<String>,
    pub file_id: Option<i64>,
    pub parent_id: Option<i64>,
    /// Prefix over the owning file's path
    pub path_prefix: Option<String>,
}

/// A page of results plus the pre-pagination total
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}
