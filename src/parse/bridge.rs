//! Thin adapter over the tree-sitter CST library
//!
//! The bridge owns per-language parsers and a compiled-query cache. A
//! parse produces a shared [`TreeHandle`] carrying the tree, the raw
//! source bytes, and the language; node text is always sliced from the
//! handle's bytes, so no CST is persisted between extraction runs.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

use super::languages::Language;
use crate::core::error::{Error, Result};

/// A parsed tree plus the bytes it was parsed from
pub struct TreeHandle {
    pub tree: Tree,
    pub source: Vec<u8>,
    pub language: Language,
}

impl TreeHandle {
    /// Source text for a node, sliced by its byte range
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Parser bridge: parse files, compile and run queries
///
/// One bridge per worker; parsers and compiled queries are cached per
/// language and never shared across threads.
pub struct ParserBridge {
    parsers: HashMap<Language, Parser>,
    queries: HashMap<(Language, String), Rc<Query>>,
}

impl ParserBridge {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    /// Parse a file from disk
    pub fn parse_file(&mut self, path: &Path, language: Language) -> Result<Rc<TreeHandle>> {
        let source = std::fs::read(path)?;
        self.parse_source(source, language, path)
    }

    /// Parse raw source bytes
    ///
    /// A partial tree (parse errors inside) is returned as-is; only an
    /// outright refusal from the parser is a `ParseFailure`.
    pub fn parse_source(
        &mut self,
        source: Vec<u8>,
        language: Language,
        path: &Path,
    ) -> Result<Rc<TreeHandle>> {
        let parser = self.parser_for(language, path)?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::ParseFailure {
                path: path.to_path_buf(),
                message: "parser returned no tree".to_string(),
            })?;

        Ok(Rc::new(TreeHandle {
            tree,
            source,
            language,
        }))
    }

    /// Compile (or fetch from cache) a query pattern for a language
    pub fn compiled_query(&mut self, language: Language, pattern: &str) -> Result<Rc<Query>> {
        if let Some(q) = self.queries.get(&(language, pattern.to_string())) {
            return Ok(Rc::clone(q));
        }
        let query =
            Query::new(&language.grammar(), pattern).map_err(|e| Error::InvalidArgument {
                message: format!("query pattern failed to compile for {}: {}", language, e),
            })?;
        let query = Rc::new(query);
        self.queries
            .insert((language, pattern.to_string()), Rc::clone(&query));
        Ok(query)
    }

    fn parser_for(&mut self, language: Language, path: &Path) -> Result<&mut Parser> {
        if !self.parsers.contains_key(&language) {
            let mut parser = Parser::new();
            parser
                .set_language(&language.grammar())
                .map_err(|e| Error::ParseFailure {
                    path: path.to_path_buf(),
                    message: format!("grammar rejected for {}: {}", language, e),
                })?;
            self.parsers.insert(language, parser);
        }
        Ok(self.parsers.get_mut(&language).expect("parser just inserted"))
    }
}

impl Default for ParserBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a compiled query rooted at `node`.
///
/// Each match yields its captures as `(capture_index, node)` pairs;
/// capture names come from `query.capture_names()`.
pub fn query_matches<'tree>(
    query: &Query,
    node: Node<'tree>,
    source: &[u8],
) -> Vec<Vec<(usize, Node<'tree>)>> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, node, source);
    let mut out = Vec::new();
    while let Some(m) = matches.next() {
        let captures = m
            .captures
            .iter()
            .map(|c| (c.index as usize, c.node))
            .collect();
        out.push(captures);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_query_go() {
        let mut bridge = ParserBridge::new();
        let source = b"package main\n\nfunc helper() {}\n".to_vec();
        let handle = bridge
            .parse_source(source, Language::Go, Path::new("main.go"))
            .unwrap();

        let query = bridge
            .compiled_query(
                Language::Go,
                "(function_declaration name: (identifier) @name)",
            )
            .unwrap();

        let matches = query_matches(&query, handle.tree.root_node(), &handle.source);
        assert_eq!(matches.len(), 1);
        let (idx, node) = matches[0][0];
        assert_eq!(query.capture_names()[idx], "name");
        assert_eq!(handle.node_text(node), "helper");
    }

    #[test]
    fn test_partial_tree_is_not_an_error() {
        let mut bridge = ParserBridge::new();
        // Broken Go still parses into a tree with error nodes
        let source = b"package main\n\nfunc broken( {\n".to_vec();
        let handle = bridge
            .parse_source(source, Language::Go, Path::new("broken.go"))
            .unwrap();
        assert!(handle.tree.root_node().has_error());
    }

    #[test]
    fn test_bad_query_pattern() {
        let mut bridge = ParserBridge::new();
        let result = bridge.compiled_query(Language::Go, "(nonexistent_node_kind) @x");
        assert!(result.is_err());
    }

    #[test]
    fn test_query_cache_reuse() {
        let mut bridge = ParserBridge::new();
        let a = bridge
            .compiled_query(Language::Go, "(identifier) @id")
            .unwrap();
        let b = bridge
            .compiled_query(Language::Go, "(identifier) @id")
            .unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
