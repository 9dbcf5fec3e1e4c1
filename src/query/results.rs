//! Result shapes returned by the query layer
//!
//! These are the JSON-envelope payloads: field names here are the wire
//! contract, so changes ripple to consumers.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::store::records::Span;

/// A file path plus a span, optionally tagged with the symbol it locates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<i64>,
}

impl Location {
    pub fn new(file: String, span: Span, symbol_id: Option<i64>) -> Self {
        Self {
            file,
            start_line: span.start_line,
            start_col: span.start_col,
            end_line: span.end_line,
            end_col: span.end_col,
            symbol_id,
        }
    }
}

/// A symbol row enriched with its file path and reference count
#[derive(Debug, Clone, Serialize)]
pub struct SymbolResult {
    pub id: i64,
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub ref_count: i64,
}

/// A call-graph edge with both endpoint names resolved
#[derive(Debug, Clone, Serialize)]
pub struct CallEdgeResult {
    pub caller_id: i64,
    pub caller_name: String,
    pub callee_id: i64,
    pub callee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub col: u32,
}

/// A file row as surfaced by discovery queries
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub id: i64,
    pub path: String,
    pub language: String,
    pub last_indexed: String,
}

/// A package (directory of indexed files)
#[derive(Debug, Clone, Serialize)]
pub struct PackageResult {
    pub path: String,
    pub file_count: u64,
}

/// Whole-project summary
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub files_by_language: BTreeMap<String, u64>,
    pub package_count: u64,
    pub symbol_count: u64,
    pub top_symbols: Vec<SymbolResult>,
}

/// Per-package summary
#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub path: String,
    pub file_count: u64,
    pub exported_symbols: Vec<SymbolResult>,
    pub symbols_by_kind: BTreeMap<String, u64>,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

/// An import row as surfaced by deps/dependents queries
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub file: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_alias: Option<String>,
    pub kind: String,
}
