//! Parsing: language registry and the tree-sitter bridge

pub mod bridge;
pub mod languages;

pub use bridge::{query_matches, ParserBridge, TreeHandle};
pub use languages::{Language, ALL_LANGUAGES};
