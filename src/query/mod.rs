//! Read-only query surface over the store
//!
//! Position queries, symbol-ID queries, and discovery queries. Unknown
//! files, positions, and symbol IDs yield empty results, not errors.

pub mod filter;
pub mod results;

pub use filter::{Page, PagedResult, Sort, SortOrder, SymbolFilter};
pub use results::*;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use crate::core::error::Result;
use crate::store::records::split_modifiers;
use crate::store::Store;

/// Escape `%`, `_` and `\` for a LIKE pattern with `ESCAPE '\'`
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            c => out.push(c),
        }
    }
    out
}

/// Map a `*`-wildcard glob to a LIKE pattern, escaping LIKE metacharacters
fn glob_to_like(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    for ch in glob.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '*' => out.push('%'),
            c => out.push(c),
        }
    }
    out
}

/// Parent directory of a store path; files at the root map to "."
fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    }
}

const SYMBOL_SELECT: &str = "SELECT s.id, s.name, s.kind, s.visibility, s.modifiers,
       s.start_line, s.start_col, s.end_line, s.end_col, f.path,
       (SELECT COUNT(*) FROM resolved_references rr WHERE rr.target_symbol_id = s.id) AS ref_count
  FROM symbols s LEFT JOIN files f ON f.id = s.file_id";

fn scan_symbol_result(row: &rusqlite::Row) -> rusqlite::Result<SymbolResult> {
    let modifiers: String = row.get(4)?;
    Ok(SymbolResult {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        visibility: row.get(3)?,
        modifiers: split_modifiers(&modifiers),
        start_line: row.get(5)?,
        start_col: row.get(6)?,
        end_line: row.get(7)?,
        end_col: row.get(8)?,
        file: row.get(9)?,
        ref_count: row.get(10)?,
    })
}

/// Read-only query builder over one store
pub struct QueryBuilder<'a> {
    store: &'a Store,
    root: Option<PathBuf>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store, root: None }
    }

    /// Attach the project root so position queries can clamp to real file
    /// contents before matching spans.
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = Some(root);
        self
    }

    /// File id for a store path, if indexed
    pub fn file_id_of(&self, path: &str) -> Result<Option<i64>> {
        Ok(self.store.file_by_path(path)?.map(|f| f.id))
    }

    // =========================================================================
    // POSITION QUERIES
    // =========================================================================

    /// The narrowest symbol whose span contains `(line, col)`
    pub fn symbol_at(&self, file: &str, line: u32, col: u32) -> Result<Option<SymbolResult>> {
        let Some(file_row) = self.store.file_by_path(file)? else {
            return Ok(None);
        };
        let (line, col) = self.clamp_position(file, line, col);

        let sql = format!(
            "{} WHERE s.file_id = ?1
               AND (s.start_line < ?2 OR (s.start_line = ?2 AND s.start_col <= ?3))
               AND (s.end_line > ?2 OR (s.end_line = ?2 AND s.end_col >= ?3))
             ORDER BY (s.end_line - s.start_line) ASC, (s.end_col - s.start_col) ASC, s.id ASC
             LIMIT 1",
            SYMBOL_SELECT
        );
        let mut stmt = self.store.conn().prepare(&sql)?;
        let mut rows = stmt.query_map(params![file_row.id, line, col], scan_symbol_result)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Resolved definition targets for the reference(s) at a position,
    /// de-duplicated by `(file, span)`.
    pub fn definition_at(&self, file: &str, line: u32, col: u32) -> Result<Vec<Location>> {
        let Some(file_row) = self.store.file_by_path(file)? else {
            return Ok(Vec::new());
        };
        let (line, col) = self.clamp_position(file, line, col);

        let mut stmt = self.store.conn().prepare(
            "SELECT id FROM \"references\"
              WHERE file_id = ?1
                AND (start_line < ?2 OR (start_line = ?2 AND start_col <= ?3))
                AND (end_line > ?2 OR (end_line = ?2 AND end_col >= ?3))
              ORDER BY id",
        )?;
        let ref_ids: Vec<i64> = stmt
            .query_map(params![file_row.id, line, col], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for ref_id in ref_ids {
            for resolution in self.store.resolutions_of_reference(ref_id)? {
                let Some(target) = self.store.symbol_by_id(resolution.target_symbol_id)? else {
                    continue;
                };
                let path = match target.file_id {
                    Some(fid) => self
                        .store
                        .file_by_id(fid)?
                        .map(|f| f.path)
                        .unwrap_or_default(),
                    None => String::new(),
                };
                let key = (
                    path.clone(),
                    target.span.start_line,
                    target.span.start_col,
                    target.span.end_line,
                    target.span.end_col,
                );
                if seen.insert(key) {
                    out.push(Location::new(path, target.span, Some(target.id)));
                }
            }
        }
        Ok(out)
    }

    // =========================================================================
    // SYMBOL-ID QUERIES
    // =========================================================================

    /// Locations of every reference resolved to the symbol
    pub fn references_to(&self, symbol_id: i64) -> Result<Vec<Location>> {
        let mut stmt = self.store.conn().prepare(
            "SELECT f.path, r.start_line, r.start_col, r.end_line, r.end_col
               FROM resolved_references rr
               JOIN \"references\" r ON r.id = rr.reference_id
               JOIN files f ON f.id = r.file_id
              WHERE rr.target_symbol_id = ?1
              ORDER BY f.path, r.start_line, r.start_col",
        )?;
        let rows = stmt.query_map(params![symbol_id], |row| {
            Ok(Location {
                file: row.get(0)?,
                start_line: row.get(1)?,
                start_col: row.get(2)?,
                end_line: row.get(3)?,
                end_col: row.get(4)?,
                symbol_id: Some(symbol_id),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Spans of the types implementing the given interface
    pub fn implementations(&self, symbol_id: i64) -> Result<Vec<Location>> {
        let mut stmt = self.store.conn().prepare(
            "SELECT f.path, s.start_line, s.start_col, s.end_line, s.end_col, s.id
               FROM implementations i
               JOIN symbols s ON s.id = i.type_symbol_id
               LEFT JOIN files f ON f.id = s.file_id
              WHERE i.interface_symbol_id = ?1
              ORDER BY f.path, s.start_line",
        )?;
        let rows = stmt.query_map(params![symbol_id], |row| {
            Ok(Location {
                file: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                start_line: row.get(1)?,
                start_col: row.get(2)?,
                end_line: row.get(3)?,
                end_col: row.get(4)?,
                symbol_id: Some(row.get(5)?),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn callers(&self, symbol_id: i64) -> Result<Vec<CallEdgeResult>> {
        self.call_edges("cg.callee_symbol_id = ?1", symbol_id)
    }

    pub fn callees(&self, symbol_id: i64) -> Result<Vec<CallEdgeResult>> {
        self.call_edges("cg.caller_symbol_id = ?1", symbol_id)
    }

    fn call_edges(&self, where_clause: &str, symbol_id: i64) -> Result<Vec<CallEdgeResult>> {
        let sql = format!(
            "SELECT cg.caller_symbol_id, caller.name, cg.callee_symbol_id, callee.name,
                    f.path, cg.line, cg.col
               FROM call_graph cg
               JOIN symbols caller ON caller.id = cg.caller_symbol_id
               JOIN symbols callee ON callee.id = cg.callee_symbol_id
               LEFT JOIN files f ON f.id = cg.file_id
              WHERE {}
              ORDER BY f.path, cg.line, cg.col",
            where_clause
        );
        let mut stmt = self.store.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![symbol_id], |row| {
            Ok(CallEdgeResult {
                caller_id: row.get(0)?,
                caller_name: row.get(1)?,
                callee_id: row.get(2)?,
                callee_name: row.get(3)?,
                file: row.get(4)?,
                line: row.get(5)?,
                col: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Imports of a file, by store path
    pub fn dependencies(&self, file: &str) -> Result<Vec<ImportResult>> {
        let Some(file_row) = self.store.file_by_path(file)? else {
            return Ok(Vec::new());
        };
        let imports = self.store.imports_of_file(file_row.id)?;
        Ok(imports
            .into_iter()
            .map(|i| ImportResult {
                file: file_row.path.clone(),
                source: i.source,
                imported_name: i.imported_name,
                local_alias: i.local_alias,
                kind: i.kind.as_str().to_string(),
            })
            .collect())
    }

    /// Imports whose source matches exactly or by `%/source` suffix
    pub fn dependents(&self, source: &str) -> Result<Vec<ImportResult>> {
        let imports = self.store.imports_matching_source(source)?;
        let mut out = Vec::new();
        for import in imports {
            let path = self
                .store
                .file_by_id(import.file_id)?
                .map(|f| f.path)
                .unwrap_or_default();
            out.push(ImportResult {
                file: path,
                source: import.source,
                imported_name: import.imported_name,
                local_alias: import.local_alias,
                kind: import.kind.as_str().to_string(),
            });
        }
        out.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(out)
    }

    // =========================================================================
    // DISCOVERY
    // =========================================================================

    /// Filtered, sorted, paginated symbol listing
    pub fn symbols(
        &self,
        filter: &SymbolFilter,
        sort: &Sort,
        page: Page,
    ) -> Result<PagedResult<SymbolResult>> {
        self.symbol_page(filter, None, sort, page)
    }

    /// Case-insensitive glob search over symbol names (`*` is the wildcard)
    pub fn search_symbols(
        &self,
        glob: &str,
        filter: &SymbolFilter,
        sort: &Sort,
        page: Page,
    ) -> Result<PagedResult<SymbolResult>> {
        let pattern = glob_to_like(glob);
        self.symbol_page(filter, Some(pattern), sort, page)
    }

    fn symbol_page(
        &self,
        filter: &SymbolFilter,
        name_pattern: Option<String>,
        sort: &Sort,
        page: Page,
    ) -> Result<PagedResult<SymbolResult>> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if !filter.kinds.is_empty() {
            let placeholders = vec!["?"; filter.kinds.len()].join(", ");
            where_clauses.push(format!("s.kind IN ({})", placeholders));
            for kind in &filter.kinds {
                args.push(Value::Text(kind.as_str().to_string()));
            }
        }
        if let Some(visibility) = &filter.visibility {
            where_clauses.push("s.visibility = ?".to_string());
            args.push(Value::Text(visibility.clone()));
        }
        for modifier in &filter.modifiers {
            where_clauses.push("instr(' ' || s.modifiers || ' ', ?) > 0".to_string());
            args.push(Value::Text(format!(" {} ", modifier)));
        }
        if let Some(file_id) = filter.file_id {
            where_clauses.push("s.file_id = ?".to_string());
            args.push(Value::Integer(file_id));
        }
        if let Some(parent_id) = filter.parent_id {
            where_clauses.push("s.parent_symbol_id = ?".to_string());
            args.push(Value::Integer(parent_id));
        }
        if let Some(prefix) = &filter.path_prefix {
            where_clauses.push("f.path LIKE ? ESCAPE '\\'".to_string());
            args.push(Value::Text(format!("{}%", escape_like(prefix))));
        }
        if let Some(pattern) = &name_pattern {
            where_clauses.push("LOWER(s.name) LIKE LOWER(?) ESCAPE '\\'".to_string());
            args.push(Value::Text(pattern.clone()));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM symbols s LEFT JOIN files f ON f.id = s.file_id{}",
            where_sql
        );
        let total_count: u64 = self.store.conn().query_row(
            &count_sql,
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let order = sort.sql_expr(&[
            ("name", "s.name"),
            ("kind", "s.kind"),
            ("file", "f.path"),
            ("refs", "ref_count"),
        ]);
        let sql = format!(
            "{}{} ORDER BY {}, s.id ASC LIMIT ? OFFSET ?",
            SYMBOL_SELECT, where_sql, order
        );
        args.push(Value::Integer(page.effective_limit() as i64));
        args.push(Value::Integer(page.offset as i64));

        let mut stmt = self.store.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), scan_symbol_result)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        Ok(PagedResult { items, total_count })
    }

    /// File listing with optional path prefix and language filters
    pub fn files(
        &self,
        path_prefix: Option<&str>,
        language: Option<&str>,
        sort: &Sort,
        page: Page,
    ) -> Result<PagedResult<FileResult>> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(prefix) = path_prefix {
            where_clauses.push("path LIKE ? ESCAPE '\\'".to_string());
            args.push(Value::Text(format!("{}%", escape_like(prefix))));
        }
        if let Some(language) = language {
            where_clauses.push("language = ?".to_string());
            args.push(Value::Text(language.to_string()));
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let total_count: u64 = self.store.conn().query_row(
            &format!("SELECT COUNT(*) FROM files{}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let order = sort.sql_expr(&[
            ("file", "path"),
            ("path", "path"),
            ("language", "language"),
            ("indexed", "last_indexed"),
        ]);
        let sql = format!(
            "SELECT id, path, language, last_indexed FROM files{} ORDER BY {}, id ASC LIMIT ? OFFSET ?",
            where_sql, order
        );
        args.push(Value::Integer(page.effective_limit() as i64));
        args.push(Value::Integer(page.offset as i64));

        let mut stmt = self.store.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(FileResult {
                id: row.get(0)?,
                path: row.get(1)?,
                language: row.get(2)?,
                last_indexed: row.get(3)?,
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(PagedResult { items, total_count })
    }

    /// Package (directory) listing derived from indexed file paths
    pub fn packages(
        &self,
        path_prefix: Option<&str>,
        sort: &Sort,
        page: Page,
    ) -> Result<PagedResult<PackageResult>> {
        let files = self.store.all_files()?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for file in &files {
            let dir = parent_dir(&file.path);
            if let Some(prefix) = path_prefix {
                if !dir.starts_with(prefix) {
                    continue;
                }
            }
            *counts.entry(dir).or_insert(0) += 1;
        }

        let mut items: Vec<PackageResult> = counts
            .into_iter()
            .map(|(path, file_count)| PackageResult { path, file_count })
            .collect();

        let descending = sort.order == Some(SortOrder::Desc);
        match sort.field.as_deref() {
            Some("files") => items.sort_by(|a, b| {
                a.file_count
                    .cmp(&b.file_count)
                    .then_with(|| a.path.cmp(&b.path))
            }),
            _ => items.sort_by(|a, b| a.path.cmp(&b.path)),
        }
        if descending {
            items.reverse();
        }

        let total_count = items.len() as u64;
        let start = (page.offset as usize).min(items.len());
        let end = (start + page.effective_limit() as usize).min(items.len());
        Ok(PagedResult {
            items: items[start..end].to_vec(),
            total_count,
        })
    }

    /// Per-language counts, package count, top-N most-referenced symbols
    pub fn project_summary(&self, top_n: u32) -> Result<ProjectSummary> {
        let mut files_by_language = BTreeMap::new();
        let mut stmt = self
            .store
            .conn()
            .prepare("SELECT language, COUNT(*) FROM files GROUP BY language")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        for row in rows {
            let (language, count) = row?;
            files_by_language.insert(language, count);
        }

        let package_count = {
            let files = self.store.all_files()?;
            files
                .iter()
                .map(|f| parent_dir(&f.path))
                .collect::<BTreeSet<_>>()
                .len() as u64
        };

        let symbol_count: u64 =
            self.store
                .conn()
                .query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))?;

        let top_symbols = self
            .symbols(
                &SymbolFilter::default(),
                &Sort {
                    field: Some("refs".to_string()),
                    order: Some(SortOrder::Desc),
                },
                Page::new(top_n.max(1), 0),
            )?
            .items;

        Ok(ProjectSummary {
            files_by_language,
            package_count,
            symbol_count,
            top_symbols,
        })
    }

    /// Summary of one package (directory of files)
    pub fn package_summary(&self, path: &str) -> Result<PackageSummary> {
        let pkg = path.trim_end_matches('/');
        let pkg = if pkg.is_empty() { "." } else { pkg };

        let files = self.store.all_files()?;
        let member_ids: Vec<i64> = files
            .iter()
            .filter(|f| parent_dir(&f.path) == pkg)
            .map(|f| f.id)
            .collect();
        let member_set: BTreeSet<i64> = member_ids.iter().copied().collect();

        let mut exported_symbols = Vec::new();
        let mut symbols_by_kind: BTreeMap<String, u64> = BTreeMap::new();
        for file_id in &member_ids {
            let page = self.symbol_page(
                &SymbolFilter {
                    file_id: Some(*file_id),
                    ..Default::default()
                },
                None,
                &Sort::default(),
                Page::new(filter::MAX_LIMIT, 0),
            )?;
            for symbol in page.items {
                *symbols_by_kind.entry(symbol.kind.clone()).or_insert(0) += 1;
                let exported = symbol
                    .visibility
                    .as_deref()
                    .is_some_and(|v| v == "public" || v.starts_with("pub"));
                if exported {
                    exported_symbols.push(symbol);
                }
            }
        }
        exported_symbols.sort_by(|a, b| {
            b.ref_count
                .cmp(&a.ref_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        // Union of import sources from member files.
        let mut dependencies = BTreeSet::new();
        for file_id in &member_ids {
            for import in self.store.imports_of_file(*file_id)? {
                dependencies.insert(import.source);
            }
        }

        // Files outside the package importing into it, matched by the
        // package path or by its module symbol names.
        let mut match_sources: BTreeSet<String> = BTreeSet::new();
        match_sources.insert(pkg.to_string());
        for file_id in &member_ids {
            if let Some(name) = self.store.module_source_of_file(*file_id)? {
                match_sources.insert(name);
            }
        }
        let mut dependents = BTreeSet::new();
        for source in &match_sources {
            for import in self.store.imports_matching_source(source)? {
                if member_set.contains(&import.file_id) {
                    continue;
                }
                if let Some(file) = self.store.file_by_id(import.file_id)? {
                    dependents.insert(file.path);
                }
            }
        }

        Ok(PackageSummary {
            path: pkg.to_string(),
            file_count: member_ids.len() as u64,
            exported_symbols,
            symbols_by_kind,
            dependencies: dependencies.into_iter().collect(),
            dependents: dependents.into_iter().collect(),
        })
    }

    // =========================================================================
    // POSITION CLAMPING
    // =========================================================================

    /// Clamp a position to one that exists in the on-disk file, when the
    /// file is readable. Without this, a multi-line symbol with no upper
    /// column bound would match any column on its start line.
    fn clamp_position(&self, rel_path: &str, line: u32, col: u32) -> (u32, u32) {
        let Some(root) = &self.root else {
            return (line, col);
        };
        let Ok(content) = std::fs::read_to_string(root.join(rel_path)) else {
            return (line, col);
        };
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return (0, 0);
        }
        let line = line.min(lines.len() as u32 - 1);
        let len = lines[line as usize].chars().count() as u32;
        let col = if len == 0 { 0 } else { col.min(len - 1) };
        (line, col)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::*;
    use crate::store::test_support::*;

    fn insert_named_symbol(store: &Store, fid: i64, name: &str, lines: (u32, u32)) -> i64 {
        symbol(store, fid, name, SymbolKind::Function, lines)
    }

    #[test]
    fn test_symbol_at_narrowest_wins() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.py", "python");
        let outer = store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "Outer".to_string(),
                    kind: SymbolKind::Class,
                    visibility: None,
                    modifiers: Vec::new(),
                    span: Span::new(0, 0, 20, 0),
                    parent_symbol_id: None,
                },
                "",
            )
            .unwrap();
        let inner = store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "method".to_string(),
                    kind: SymbolKind::Method,
                    visibility: None,
                    modifiers: Vec::new(),
                    span: Span::new(5, 4, 8, 10),
                    parent_symbol_id: Some(outer),
                },
                "",
            )
            .unwrap();

        let q = QueryBuilder::new(&store);
        assert_eq!(q.symbol_at("a.py", 6, 0).unwrap().unwrap().id, inner);
        assert_eq!(q.symbol_at("a.py", 2, 0).unwrap().unwrap().id, outer);
        assert!(q.symbol_at("a.py", 50, 0).unwrap().is_none());
        assert!(q.symbol_at("missing.py", 0, 0).unwrap().is_none());
    }

    #[test]
    fn test_references_and_definitions_are_inverse() {
        let store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");
        let target = insert_named_symbol(&store, fa, "Greet", (2, 4));
        let rid = call_ref(&store, fb, "Greet", 7, 8);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: target,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Direct,
            })
            .unwrap();

        let q = QueryBuilder::new(&store);

        let refs = q.references_to(target).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file, "b.go");
        assert_eq!(refs[0].start_line, 7);

        let defs = q.definition_at("b.go", 7, 9).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].file, "a.go");
        assert_eq!(defs[0].start_line, 2);
        assert_eq!(defs[0].symbol_id, Some(target));
    }

    #[test]
    fn test_callers_callees_symmetry() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "m.go", "go");
        let main_fn = insert_named_symbol(&store, fid, "main", (5, 9));
        let helper = insert_named_symbol(&store, fid, "helper", (1, 3));
        store
            .insert_call_edge(&NewCallEdge {
                caller_symbol_id: main_fn,
                callee_symbol_id: helper,
                file_id: Some(fid),
                line: 6,
                col: 4,
            })
            .unwrap();

        let q = QueryBuilder::new(&store);
        let callers = q.callers(helper).unwrap();
        let callees = q.callees(main_fn).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callees.len(), 1);
        assert_eq!(callers[0].caller_name, "main");
        assert_eq!(callers[0].callee_name, "helper");
        assert_eq!(callees[0].callee_id, helper);
        assert_eq!(callers[0].line, 6);
    }

    #[test]
    fn test_pagination_laws() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "big.go", "go");
        for i in 0..120 {
            insert_named_symbol(&store, fid, &format!("fn_{:03}", i), (i, i + 1));
        }

        let q = QueryBuilder::new(&store);
        let filter = SymbolFilter {
            kinds: vec![SymbolKind::Function],
            ..Default::default()
        };

        let first = q.symbols(&filter, &Sort::default(), Page::new(50, 0)).unwrap();
        assert_eq!(first.items.len(), 50);
        assert_eq!(first.total_count, 120);
        assert_eq!(first.items[0].name, "fn_000");

        let last = q.symbols(&filter, &Sort::default(), Page::new(50, 100)).unwrap();
        assert_eq!(last.items.len(), 20);
        assert_eq!(last.total_count, 120);
        assert_eq!(last.items[19].name, "fn_119");

        // Concatenating pages equals the unpaginated list.
        let mid = q.symbols(&filter, &Sort::default(), Page::new(50, 50)).unwrap();
        let all = q.symbols(&filter, &Sort::default(), Page::new(500, 0)).unwrap();
        let stitched: Vec<&str> = first
            .items
            .iter()
            .chain(mid.items.iter())
            .chain(last.items.iter())
            .map(|s| s.name.as_str())
            .collect();
        let direct: Vec<&str> = all.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stitched, direct);
    }

    #[test]
    fn test_search_glob() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "u.go", "go");
        for name in ["GetUser", "GetUserName", "SetUser"] {
            insert_named_symbol(&store, fid, name, (0, 1));
        }

        let q = QueryBuilder::new(&store);
        let filter = SymbolFilter::default();

        let get = q
            .search_symbols("Get*", &filter, &Sort::default(), Page::default())
            .unwrap();
        let names: Vec<&str> = get.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["GetUser", "GetUserName"]);

        let user = q
            .search_symbols("*User*", &filter, &Sort::default(), Page::default())
            .unwrap();
        let names: Vec<&str> = user.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["GetUser", "GetUserName", "SetUser"]);

        // Case-insensitive.
        let lower = q
            .search_symbols("getuser*", &filter, &Sort::default(), Page::default())
            .unwrap();
        assert_eq!(lower.items.len(), 2);
    }

    #[test]
    fn test_search_escapes_like_metacharacters() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "odd.go", "go");
        insert_named_symbol(&store, fid, "do_thing", (0, 1));
        insert_named_symbol(&store, fid, "doXthing", (2, 3));

        let q = QueryBuilder::new(&store);
        // `_` must match literally, not as a LIKE wildcard.
        let hits = q
            .search_symbols("do_*", &SymbolFilter::default(), &Sort::default(), Page::default())
            .unwrap();
        let names: Vec<&str> = hits.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["do_thing"]);
    }

    #[test]
    fn test_modifier_filter_requires_all() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "m.rs", "rust");
        store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "a".to_string(),
                    kind: SymbolKind::Function,
                    visibility: None,
                    modifiers: vec!["async".to_string(), "unsafe".to_string()],
                    span: Span::new(0, 0, 1, 0),
                    parent_symbol_id: None,
                },
                "",
            )
            .unwrap();
        store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "b".to_string(),
                    kind: SymbolKind::Function,
                    visibility: None,
                    modifiers: vec!["async".to_string()],
                    span: Span::new(2, 0, 3, 0),
                    parent_symbol_id: None,
                },
                "",
            )
            .unwrap();

        let q = QueryBuilder::new(&store);
        let both = q
            .symbols(
                &SymbolFilter {
                    modifiers: vec!["async".to_string(), "unsafe".to_string()],
                    ..Default::default()
                },
                &Sort::default(),
                Page::default(),
            )
            .unwrap();
        assert_eq!(both.items.len(), 1);
        assert_eq!(both.items[0].name, "a");
    }

    #[test]
    fn test_dependents_suffix_matching() {
        let store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");
        for (fid, source) in [(fa, "util"), (fb, "github.com/acme/util")] {
            store
                .insert_import(&NewImport {
                    file_id: fid,
                    source: source.to_string(),
                    imported_name: None,
                    local_alias: None,
                    kind: ImportKind::Module,
                    scope: "file".to_string(),
                })
                .unwrap();
        }

        let q = QueryBuilder::new(&store);
        let hits = q.dependents("util").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(q.dependents("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_packages_and_summary() {
        let store = Store::open_in_memory().unwrap();
        let f1 = file(&store, "pkg/util/a.go", "go");
        let _f2 = file(&store, "pkg/util/b.go", "go");
        let f3 = file(&store, "cmd/main.go", "go");

        let greet = insert_named_symbol(&store, f1, "Greet", (0, 2));
        store
            .insert_import(&NewImport {
                file_id: f3,
                source: "example.com/app/pkg/util".to_string(),
                imported_name: None,
                local_alias: None,
                kind: ImportKind::Module,
                scope: "file".to_string(),
            })
            .unwrap();
        let rid = call_ref(&store, f3, "Greet", 4, 2);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: greet,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Import,
            })
            .unwrap();

        let q = QueryBuilder::new(&store);

        let packages = q.packages(None, &Sort::default(), Page::default()).unwrap();
        assert_eq!(packages.total_count, 2);
        assert_eq!(packages.items[0].path, "cmd");
        assert_eq!(packages.items[1].path, "pkg/util");
        assert_eq!(packages.items[1].file_count, 2);

        let summary = q.package_summary("pkg/util").unwrap();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.exported_symbols[0].name, "Greet");
        assert_eq!(summary.exported_symbols[0].ref_count, 1);
        assert_eq!(summary.dependents, vec!["cmd/main.go".to_string()]);

        let project = q.project_summary(5).unwrap();
        assert_eq!(project.files_by_language.get("go"), Some(&3));
        assert_eq!(project.package_count, 2);
        assert_eq!(project.top_symbols[0].name, "Greet");
    }

    #[test]
    fn test_position_clamping_against_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.go"), "package main\nfunc f() {}\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");
        // Symbol span covers line 1 fully.
        store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "f".to_string(),
                    kind: SymbolKind::Function,
                    visibility: None,
                    modifiers: Vec::new(),
                    span: Span::new(1, 0, 1, 11),
                    parent_symbol_id: None,
                },
                "",
            )
            .unwrap();

        let q = QueryBuilder::new(&store).with_root(temp.path().to_path_buf());
        // Column far past end of line clamps back inside the line.
        assert!(q.symbol_at("a.go", 1, 500).unwrap().is_some());
        // Line past EOF clamps to the last line.
        assert!(q.symbol_at("a.go", 99, 0).unwrap().is_some());
    }
}
