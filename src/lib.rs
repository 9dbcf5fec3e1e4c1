//! Canopy - Deterministic, scope-aware semantic code analysis
//!
//! Indexes a source tree into a queryable relational database capturing
//! declarations, scopes, references, imports, and type structure, then
//! resolves references into a call graph and implementation relationships.
//! Consumers get LSP-style answers without a running language server.

pub mod cli;
pub mod core;
pub mod engine;
pub mod output;
pub mod parse;
pub mod query;
pub mod script;
pub mod store;

pub use crate::core::error::{Error, Result};
pub use crate::core::{CancelToken, Project};
pub use engine::{Engine, EngineOptions, IndexReport};
pub use query::QueryBuilder;
pub use store::Store;
