//! Persistent relational state
//!
//! The store is the sole source of truth: sixteen tables of extraction and
//! resolution rows, typed CRUD, atomic per-file replacement, and the
//! blast-radius queries the incremental resolver is built on.
//!
//! Concurrency discipline: one process, one connection. Reads may be
//! concurrent (WAL journaling), writes go through a single writer. The
//! query side opens read-only and bypasses migration.

pub mod batch;
pub mod blast;
pub mod records;
pub mod schema;

pub use batch::RowBatch;
pub use records::*;

use std::cell::Cell;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};

use crate::core::error::{Error, Result};

// =============================================================================
// MUTATION COUNTERS
// =============================================================================

/// In-process counters over resolution-table mutations.
///
/// Incremental tests assert the no-op property against these: re-indexing
/// an unchanged tree must touch zero resolution rows.
#[derive(Debug, Default)]
pub struct MutationCounters {
    resolution_written: Cell<u64>,
    resolution_deleted: Cell<u64>,
}

impl MutationCounters {
    pub fn resolution_rows_written(&self) -> u64 {
        self.resolution_written.get()
    }

    pub fn resolution_rows_deleted(&self) -> u64 {
        self.resolution_deleted.get()
    }

    pub(crate) fn add_written(&self, n: u64) {
        self.resolution_written.set(self.resolution_written.get() + n);
    }

    pub(crate) fn add_deleted(&self, n: u64) {
        self.resolution_deleted.set(self.resolution_deleted.get() + n);
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Typed access to the relational index
pub struct Store {
    conn: Connection,
    counters: MutationCounters,
}

impl Store {
    /// Open (creating if needed) a store at `path` and migrate the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn,
            counters: MutationCounters::default(),
        })
    }

    /// Open an existing store read-only; migration is bypassed
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound {
                what: format!("index database {}", path.display()),
            });
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn,
            counters: MutationCounters::default(),
        })
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn,
            counters: MutationCounters::default(),
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn counters(&self) -> &MutationCounters {
        &self.counters
    }

    // =========================================================================
    // FILES
    // =========================================================================

    pub fn insert_file(&self, file: &NewFile) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO files (path, language, content_hash, last_indexed) VALUES (?1, ?2, ?3, ?4)",
            params![file.path, file.language, file.content_hash, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        self.optional_row(
            "SELECT id, path, language, content_hash, last_indexed FROM files WHERE path = ?1",
            params![path],
            scan_file,
        )
    }

    pub fn file_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        self.optional_row(
            "SELECT id, path, language, content_hash, last_indexed FROM files WHERE id = ?1",
            params![id],
            scan_file,
        )
    }

    pub fn all_files(&self) -> Result<Vec<FileRecord>> {
        self.rows(
            "SELECT id, path, language, content_hash, last_indexed FROM files ORDER BY path",
            params![],
            scan_file,
        )
    }

    pub fn files_with_language(&self, language: &str) -> Result<Vec<FileRecord>> {
        self.rows(
            "SELECT id, path, language, content_hash, last_indexed FROM files WHERE language = ?1 ORDER BY path",
            params![language],
            scan_file,
        )
    }

    /// Atomically remove all extraction rows for a file, all resolution rows
    /// originating from it, and the file row itself.
    ///
    /// Resolution rows that merely *target* the file's symbols are left for
    /// the incremental resolver's blast-radius step.
    pub fn delete_file_data(&mut self, file_id: i64) -> Result<()> {
        let deleted = {
            let tx = self.conn.transaction()?;

            let mut n = 0u64;
            // Resolution rows originating from this file.
            n += tx.execute(
                "DELETE FROM resolved_references WHERE reference_id IN
                 (SELECT id FROM \"references\" WHERE file_id = ?1)",
                params![file_id],
            )? as u64;
            n += tx.execute(
                "DELETE FROM call_graph WHERE file_id = ?1 OR caller_symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )? as u64;
            n += tx.execute(
                "DELETE FROM implementations WHERE type_symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )? as u64;
            n += tx.execute("DELETE FROM reexports WHERE file_id = ?1", params![file_id])? as u64;
            n += tx.execute(
                "DELETE FROM extension_bindings WHERE member_symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )? as u64;
            n += tx.execute(
                "DELETE FROM type_compositions WHERE composite_symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )? as u64;

            // Extraction rows, child-first.
            tx.execute(
                "DELETE FROM annotations WHERE file_id = ?1 OR target_symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute(
                "DELETE FROM type_params WHERE symbol_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute(
                "DELETE FROM function_params WHERE symbol_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute(
                "DELETE FROM type_members WHERE symbol_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute(
                "DELETE FROM symbol_fragments WHERE file_id = ?1 OR symbol_id IN
                 (SELECT id FROM symbols WHERE file_id = ?1)",
                params![file_id],
            )?;
            tx.execute("DELETE FROM imports WHERE file_id = ?1", params![file_id])?;
            tx.execute(
                "DELETE FROM \"references\" WHERE file_id = ?1",
                params![file_id],
            )?;
            tx.execute("DELETE FROM scopes WHERE file_id = ?1", params![file_id])?;
            tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
            tx.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;

            tx.commit()?;
            n
        };
        self.counters.add_deleted(deleted);
        Ok(())
    }

    /// Remove just the file row (extraction failed before any rows landed)
    pub fn delete_file_row(&self, file_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        Ok(())
    }

    // =========================================================================
    // SYMBOLS
    // =========================================================================

    pub fn insert_symbol(&self, symbol: &NewSymbol, signature_hash: &str) -> Result<i64> {
        if !symbol.span.is_valid() {
            return Err(Error::InvalidArgument {
                message: format!("invalid span for symbol {}", symbol.name),
            });
        }
        self.conn.execute(
            "INSERT INTO symbols (file_id, name, kind, visibility, modifiers, signature_hash,
                                  start_line, start_col, end_line, end_col, parent_symbol_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                symbol.file_id,
                symbol.name,
                symbol.kind.as_str(),
                symbol.visibility,
                join_modifiers(&symbol.modifiers),
                signature_hash,
                symbol.span.start_line,
                symbol.span.start_col,
                symbol.span.end_line,
                symbol.span.end_col,
                symbol.parent_symbol_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn symbol_by_id(&self, id: i64) -> Result<Option<SymbolRecord>> {
        self.optional_row(
            &format!("{} WHERE id = ?1", SELECT_SYMBOL),
            params![id],
            scan_symbol,
        )
    }

    pub fn symbols_in_file(&self, file_id: i64) -> Result<Vec<SymbolRecord>> {
        self.rows(
            &format!("{} WHERE file_id = ?1 ORDER BY id", SELECT_SYMBOL),
            params![file_id],
            scan_symbol,
        )
    }

    pub fn symbols_named(&self, name: &str) -> Result<Vec<SymbolRecord>> {
        self.rows(
            &format!("{} WHERE name = ?1 ORDER BY id", SELECT_SYMBOL),
            params![name],
            scan_symbol,
        )
    }

    /// The module identifier of a file: the name of its package/module/
    /// namespace symbol when one was extracted, else None.
    pub fn module_source_of_file(&self, file_id: i64) -> Result<Option<String>> {
        self.optional_row(
            "SELECT name FROM symbols
             WHERE file_id = ?1 AND kind IN ('package', 'module', 'namespace')
             ORDER BY id LIMIT 1",
            params![file_id],
            |row| row.get(0),
        )
    }

    pub fn symbols_with_parent(&self, parent_id: i64) -> Result<Vec<SymbolRecord>> {
        self.rows(
            &format!("{} WHERE parent_symbol_id = ?1 ORDER BY id", SELECT_SYMBOL),
            params![parent_id],
            scan_symbol,
        )
    }

    // =========================================================================
    // SCOPES
    // =========================================================================

    pub fn insert_scope(&self, scope: &NewScope) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scopes (file_id, symbol_id, kind, start_line, start_col, end_line, end_col, parent_scope_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                scope.file_id,
                scope.symbol_id,
                scope.kind.as_str(),
                scope.span.start_line,
                scope.span.start_col,
                scope.span.end_line,
                scope.span.end_col,
                scope.parent_scope_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn scopes_in_file(&self, file_id: i64) -> Result<Vec<ScopeRecord>> {
        self.rows(
            "SELECT id, file_id, symbol_id, kind, start_line, start_col, end_line, end_col, parent_scope_id
             FROM scopes WHERE file_id = ?1 ORDER BY id",
            params![file_id],
            scan_scope,
        )
    }

    // =========================================================================
    // REFERENCES
    // =========================================================================

    pub fn insert_reference(&self, reference: &NewReference) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO \"references\" (file_id, scope_id, name, start_line, start_col, end_line, end_col, context)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reference.file_id,
                reference.scope_id,
                reference.name,
                reference.span.start_line,
                reference.span.start_col,
                reference.span.end_line,
                reference.span.end_col,
                reference.context.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn reference_by_id(&self, id: i64) -> Result<Option<ReferenceRecord>> {
        self.optional_row(
            "SELECT id, file_id, scope_id, name, start_line, start_col, end_line, end_col, context
             FROM \"references\" WHERE id = ?1",
            params![id],
            scan_reference,
        )
    }

    pub fn references_in_file(&self, file_id: i64) -> Result<Vec<ReferenceRecord>> {
        self.rows(
            "SELECT id, file_id, scope_id, name, start_line, start_col, end_line, end_col, context
             FROM \"references\" WHERE file_id = ?1 ORDER BY id",
            params![file_id],
            scan_reference,
        )
    }

    // =========================================================================
    // IMPORTS
    // =========================================================================

    pub fn insert_import(&self, import: &NewImport) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO imports (file_id, source, imported_name, local_alias, kind, scope)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                import.file_id,
                import.source,
                import.imported_name,
                import.local_alias,
                import.kind.as_str(),
                import.scope,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn imports_of_file(&self, file_id: i64) -> Result<Vec<ImportRecord>> {
        self.rows(
            "SELECT id, file_id, source, imported_name, local_alias, kind, scope
             FROM imports WHERE file_id = ?1 ORDER BY id",
            params![file_id],
            scan_import,
        )
    }

    pub fn imports_matching_source(&self, source: &str) -> Result<Vec<ImportRecord>> {
        self.rows(
            "SELECT id, file_id, source, imported_name, local_alias, kind, scope
             FROM imports WHERE source = ?1 OR source LIKE ?2 ORDER BY id",
            params![source, format!("%/{}", source)],
            scan_import,
        )
    }

    // =========================================================================
    // TYPE MEMBERS / PARAMS / ANNOTATIONS / FRAGMENTS
    // =========================================================================

    pub fn insert_type_member(&self, member: &NewTypeMember) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO type_members (symbol_id, name, kind, type_expr, visibility)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member.symbol_id,
                member.name,
                member.kind.as_str(),
                member.type_expr,
                member.visibility,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn type_members_of(&self, symbol_id: i64) -> Result<Vec<TypeMemberRecord>> {
        self.rows(
            "SELECT id, symbol_id, name, kind, type_expr, visibility
             FROM type_members WHERE symbol_id = ?1 ORDER BY id",
            params![symbol_id],
            scan_type_member,
        )
    }

    pub fn insert_function_param(&self, param: &NewFunctionParam) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO function_params (symbol_id, name, ordinal, type_expr, is_receiver, is_return, has_default, default_expr)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                param.symbol_id,
                param.name,
                param.ordinal,
                param.type_expr,
                param.is_receiver,
                param.is_return,
                param.has_default,
                param.default_expr,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn function_params_of(&self, symbol_id: i64) -> Result<Vec<FunctionParamRecord>> {
        self.rows(
            "SELECT id, symbol_id, name, ordinal, type_expr, is_receiver, is_return, has_default, default_expr
             FROM function_params WHERE symbol_id = ?1 ORDER BY ordinal, id",
            params![symbol_id],
            scan_function_param,
        )
    }

    pub fn insert_type_param(&self, param: &NewTypeParam) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO type_params (symbol_id, name, ordinal, param_kind, variance, constraints)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                param.symbol_id,
                param.name,
                param.ordinal,
                param.param_kind,
                param.variance,
                param.constraints,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn type_params_of(&self, symbol_id: i64) -> Result<Vec<TypeParamRecord>> {
        self.rows(
            "SELECT id, symbol_id, name, ordinal, param_kind, variance, constraints
             FROM type_params WHERE symbol_id = ?1 ORDER BY ordinal, id",
            params![symbol_id],
            scan_type_param,
        )
    }

    pub fn insert_annotation(&self, annotation: &NewAnnotation) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO annotations (target_symbol_id, name, resolved_symbol_id, arguments, file_id, line, col)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                annotation.target_symbol_id,
                annotation.name,
                annotation.resolved_symbol_id,
                annotation.arguments,
                annotation.file_id,
                annotation.line,
                annotation.col,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn annotations_of(&self, target_symbol_id: i64) -> Result<Vec<AnnotationRecord>> {
        self.rows(
            "SELECT id, target_symbol_id, name, resolved_symbol_id, arguments, file_id, line, col
             FROM annotations WHERE target_symbol_id = ?1 ORDER BY id",
            params![target_symbol_id],
            scan_annotation,
        )
    }

    pub fn insert_symbol_fragment(&self, fragment: &NewSymbolFragment) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO symbol_fragments (symbol_id, file_id, start_line, start_col, end_line, end_col, is_primary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                fragment.symbol_id,
                fragment.file_id,
                fragment.span.start_line,
                fragment.span.start_col,
                fragment.span.end_line,
                fragment.span.end_col,
                fragment.is_primary,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn fragments_of(&self, symbol_id: i64) -> Result<Vec<SymbolFragmentRecord>> {
        self.rows(
            "SELECT id, symbol_id, file_id, start_line, start_col, end_line, end_col, is_primary
             FROM symbol_fragments WHERE symbol_id = ?1 ORDER BY id",
            params![symbol_id],
            scan_fragment,
        )
    }

    // =========================================================================
    // RESOLUTION ROWS
    // =========================================================================

    pub fn insert_resolved_reference(&self, row: &NewResolvedReference) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO resolved_references (reference_id, target_symbol_id, confidence, resolution_kind)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.reference_id,
                row.target_symbol_id,
                row.confidence,
                row.resolution_kind.as_str(),
            ],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn resolutions_of_reference(&self, reference_id: i64) -> Result<Vec<ResolvedReferenceRecord>> {
        self.rows(
            "SELECT id, reference_id, target_symbol_id, confidence, resolution_kind
             FROM resolved_references WHERE reference_id = ?1 ORDER BY id",
            params![reference_id],
            scan_resolved_reference,
        )
    }

    pub fn resolutions_targeting(&self, symbol_id: i64) -> Result<Vec<ResolvedReferenceRecord>> {
        self.rows(
            "SELECT id, reference_id, target_symbol_id, confidence, resolution_kind
             FROM resolved_references WHERE target_symbol_id = ?1 ORDER BY id",
            params![symbol_id],
            scan_resolved_reference,
        )
    }

    pub fn insert_implementation(&self, row: &NewImplementation) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO implementations (type_symbol_id, interface_symbol_id, kind) VALUES (?1, ?2, ?3)",
            params![row.type_symbol_id, row.interface_symbol_id, row.kind.as_str()],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn implementations_of(&self, interface_symbol_id: i64) -> Result<Vec<ImplementationRecord>> {
        self.rows(
            "SELECT id, type_symbol_id, interface_symbol_id, kind
             FROM implementations WHERE interface_symbol_id = ?1 ORDER BY id",
            params![interface_symbol_id],
            scan_implementation,
        )
    }

    pub fn insert_call_edge(&self, row: &NewCallEdge) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO call_graph (caller_symbol_id, callee_symbol_id, file_id, line, col)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.caller_symbol_id,
                row.callee_symbol_id,
                row.file_id,
                row.line,
                row.col,
            ],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn callers_of(&self, symbol_id: i64) -> Result<Vec<CallEdgeRecord>> {
        self.rows(
            "SELECT id, caller_symbol_id, callee_symbol_id, file_id, line, col
             FROM call_graph WHERE callee_symbol_id = ?1 ORDER BY id",
            params![symbol_id],
            scan_call_edge,
        )
    }

    pub fn callees_of(&self, symbol_id: i64) -> Result<Vec<CallEdgeRecord>> {
        self.rows(
            "SELECT id, caller_symbol_id, callee_symbol_id, file_id, line, col
             FROM call_graph WHERE caller_symbol_id = ?1 ORDER BY id",
            params![symbol_id],
            scan_call_edge,
        )
    }

    pub fn insert_reexport(&self, row: &NewReexport) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO reexports (file_id, original_symbol_id, exported_name) VALUES (?1, ?2, ?3)",
            params![row.file_id, row.original_symbol_id, row.exported_name],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_extension_binding(&self, row: &NewExtensionBinding) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO extension_bindings (member_symbol_id, extended_type_expr, extended_type_symbol_id, kind, constraints, is_default_impl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.member_symbol_id,
                row.extended_type_expr,
                row.extended_type_symbol_id,
                row.kind.as_str(),
                row.constraints,
                row.is_default_impl,
            ],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_type_composition(&self, row: &NewTypeComposition) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO type_compositions (composite_symbol_id, component_symbol_id, composition_kind)
             VALUES (?1, ?2, ?3)",
            params![
                row.composite_symbol_id,
                row.component_symbol_id,
                row.composition_kind.as_str(),
            ],
        )?;
        self.counters.add_written(1);
        Ok(self.conn.last_insert_rowid())
    }

    // =========================================================================
    // ROW HELPERS
    // =========================================================================

    fn optional_row<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        scan: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query_map(params, scan)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn rows<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        scan: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, scan)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// =============================================================================
// ROW SCANNERS
// =============================================================================

const SELECT_SYMBOL: &str = "SELECT id, file_id, name, kind, visibility, modifiers, signature_hash,
start_line, start_col, end_line, end_col, parent_symbol_id FROM symbols";

fn scan_span_at(row: &Row, base: usize) -> rusqlite::Result<Span> {
    Ok(Span {
        start_line: row.get(base)?,
        start_col: row.get(base + 1)?,
        end_line: row.get(base + 2)?,
        end_col: row.get(base + 3)?,
    })
}

fn scan_kind<T>(raw: String, parse: fn(&str) -> Option<T>, idx: usize) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown tag '{}'", raw).into(),
        )
    })
}

fn scan_file(row: &Row) -> rusqlite::Result<FileRecord> {
    let raw: String = row.get(4)?;
    let last_indexed = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        language: row.get(2)?,
        content_hash: row.get(3)?,
        last_indexed,
    })
}

pub(crate) fn scan_symbol(row: &Row) -> rusqlite::Result<SymbolRecord> {
    let kind: String = row.get(3)?;
    let modifiers: String = row.get(5)?;
    Ok(SymbolRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        name: row.get(2)?,
        kind: scan_kind(kind, SymbolKind::parse, 3)?,
        visibility: row.get(4)?,
        modifiers: split_modifiers(&modifiers),
        signature_hash: row.get(6)?,
        span: scan_span_at(row, 7)?,
        parent_symbol_id: row.get(11)?,
    })
}

fn scan_scope(row: &Row) -> rusqlite::Result<ScopeRecord> {
    let kind: String = row.get(3)?;
    Ok(ScopeRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        symbol_id: row.get(2)?,
        kind: scan_kind(kind, ScopeKind::parse, 3)?,
        span: scan_span_at(row, 4)?,
        parent_scope_id: row.get(8)?,
    })
}

fn scan_reference(row: &Row) -> rusqlite::Result<ReferenceRecord> {
    let context: String = row.get(8)?;
    Ok(ReferenceRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        scope_id: row.get(2)?,
        name: row.get(3)?,
        span: scan_span_at(row, 4)?,
        context: scan_kind(context, RefContext::parse, 8)?,
    })
}

pub(crate) fn scan_import(row: &Row) -> rusqlite::Result<ImportRecord> {
    let kind: String = row.get(5)?;
    Ok(ImportRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        source: row.get(2)?,
        imported_name: row.get(3)?,
        local_alias: row.get(4)?,
        kind: scan_kind(kind, ImportKind::parse, 5)?,
        scope: row.get(6)?,
    })
}

fn scan_type_member(row: &Row) -> rusqlite::Result<TypeMemberRecord> {
    let kind: String = row.get(3)?;
    Ok(TypeMemberRecord {
        id: row.get(0)?,
        symbol_id: row.get(1)?,
        name: row.get(2)?,
        kind: scan_kind(kind, MemberKind::parse, 3)?,
        type_expr: row.get(4)?,
        visibility: row.get(5)?,
    })
}

fn scan_function_param(row: &Row) -> rusqlite::Result<FunctionParamRecord> {
    Ok(FunctionParamRecord {
        id: row.get(0)?,
        symbol_id: row.get(1)?,
        name: row.get(2)?,
        ordinal: row.get(3)?,
        type_expr: row.get(4)?,
        is_receiver: row.get(5)?,
        is_return: row.get(6)?,
        has_default: row.get(7)?,
        default_expr: row.get(8)?,
    })
}

fn scan_type_param(row: &Row) -> rusqlite::Result<TypeParamRecord> {
    Ok(TypeParamRecord {
        id: row.get(0)?,
        symbol_id: row.get(1)?,
        name: row.get(2)?,
        ordinal: row.get(3)?,
        param_kind: row.get(4)?,
        variance: row.get(5)?,
        constraints: row.get(6)?,
    })
}

fn scan_annotation(row: &Row) -> rusqlite::Result<AnnotationRecord> {
    Ok(AnnotationRecord {
        id: row.get(0)?,
        target_symbol_id: row.get(1)?,
        name: row.get(2)?,
        resolved_symbol_id: row.get(3)?,
        arguments: row.get(4)?,
        file_id: row.get(5)?,
        line: row.get(6)?,
        col: row.get(7)?,
    })
}

fn scan_fragment(row: &Row) -> rusqlite::Result<SymbolFragmentRecord> {
    Ok(SymbolFragmentRecord {
        id: row.get(0)?,
        symbol_id: row.get(1)?,
        file_id: row.get(2)?,
        span: scan_span_at(row, 3)?,
        is_primary: row.get(7)?,
    })
}

fn scan_resolved_reference(row: &Row) -> rusqlite::Result<ResolvedReferenceRecord> {
    let kind: String = row.get(4)?;
    Ok(ResolvedReferenceRecord {
        id: row.get(0)?,
        reference_id: row.get(1)?,
        target_symbol_id: row.get(2)?,
        confidence: row.get(3)?,
        resolution_kind: scan_kind(kind, ResolutionKind::parse, 4)?,
    })
}

fn scan_implementation(row: &Row) -> rusqlite::Result<ImplementationRecord> {
    let kind: String = row.get(3)?;
    Ok(ImplementationRecord {
        id: row.get(0)?,
        type_symbol_id: row.get(1)?,
        interface_symbol_id: row.get(2)?,
        kind: scan_kind(kind, ImplKind::parse, 3)?,
    })
}

fn scan_call_edge(row: &Row) -> rusqlite::Result<CallEdgeRecord> {
    Ok(CallEdgeRecord {
        id: row.get(0)?,
        caller_symbol_id: row.get(1)?,
        callee_symbol_id: row.get(2)?,
        file_id: row.get(3)?,
        line: row.get(4)?,
        col: row.get(5)?,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Insert a file with fixed metadata
    pub fn file(store: &Store, path: &str, language: &str) -> i64 {
        store
            .insert_file(&NewFile {
                path: path.to_string(),
                language: language.to_string(),
                content_hash: format!("hash-of-{}", path),
            })
            .unwrap()
    }

    /// Insert a plain symbol spanning the given lines
    pub fn symbol(store: &Store, file_id: i64, name: &str, kind: SymbolKind, lines: (u32, u32)) -> i64 {
        store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(file_id),
                    name: name.to_string(),
                    kind,
                    visibility: Some("public".to_string()),
                    modifiers: Vec::new(),
                    span: Span::new(lines.0, 0, lines.1, 0),
                    parent_symbol_id: None,
                },
                "",
            )
            .unwrap()
    }

    /// Insert a call reference at a position
    pub fn call_ref(store: &Store, file_id: i64, name: &str, line: u32, col: u32) -> i64 {
        store
            .insert_reference(&NewReference {
                file_id,
                scope_id: None,
                name: name.to_string(),
                span: Span::new(line, col, line, col + name.len() as u32),
                context: RefContext::Call,
            })
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_file_crud() {
        let store = Store::open_in_memory().unwrap();
        let id = file(&store, "src/main.go", "go");

        let fetched = store.file_by_path("src/main.go").unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.language, "go");

        assert!(store.file_by_path("missing.go").unwrap().is_none());
        assert_eq!(store.all_files().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let store = Store::open_in_memory().unwrap();
        file(&store, "a.go", "go");
        let dup = store.insert_file(&NewFile {
            path: "a.go".to_string(),
            language: "go".to_string(),
            content_hash: "x".to_string(),
        });
        assert!(dup.is_err());
    }

    #[test]
    fn test_symbol_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "lib.rs", "rust");
        let id = store
            .insert_symbol(
                &NewSymbol {
                    file_id: Some(fid),
                    name: "Widget".to_string(),
                    kind: SymbolKind::Struct,
                    visibility: Some("pub(crate)".to_string()),
                    modifiers: vec!["derive".to_string()],
                    span: Span::new(3, 0, 9, 1),
                    parent_symbol_id: None,
                },
                "00ff00ff00ff00ff",
            )
            .unwrap();

        let sym = store.symbol_by_id(id).unwrap().unwrap();
        assert_eq!(sym.name, "Widget");
        assert_eq!(sym.kind, SymbolKind::Struct);
        assert_eq!(sym.visibility.as_deref(), Some("pub(crate)"));
        assert_eq!(sym.modifiers, vec!["derive".to_string()]);
        assert_eq!(sym.signature_hash, "00ff00ff00ff00ff");
        assert_eq!(sym.span, Span::new(3, 0, 9, 1));
    }

    #[test]
    fn test_symbol_with_bad_file_id_rejected() {
        let store = Store::open_in_memory().unwrap();
        let result = store.insert_symbol(
            &NewSymbol {
                file_id: Some(9999),
                name: "orphan".to_string(),
                kind: SymbolKind::Function,
                visibility: None,
                modifiers: Vec::new(),
                span: Span::new(0, 0, 0, 10),
                parent_symbol_id: None,
            },
            "",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_span_rejected() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "x.go", "go");
        let result = store.insert_symbol(
            &NewSymbol {
                file_id: Some(fid),
                name: "bad".to_string(),
                kind: SymbolKind::Function,
                visibility: None,
                modifiers: Vec::new(),
                span: Span::new(5, 0, 2, 0),
                parent_symbol_id: None,
            },
            "",
        );
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_delete_file_data_removes_extraction_rows() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "main.go", "go");
        let sid = symbol(&store, fid, "main", SymbolKind::Function, (2, 4));
        store
            .insert_scope(&NewScope {
                file_id: fid,
                symbol_id: Some(sid),
                kind: ScopeKind::Function,
                span: Span::new(2, 0, 4, 1),
                parent_scope_id: None,
            })
            .unwrap();
        let rid = call_ref(&store, fid, "helper", 3, 4);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: sid,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Direct,
            })
            .unwrap();

        store.delete_file_data(fid).unwrap();

        assert!(store.file_by_id(fid).unwrap().is_none());
        assert!(store.symbols_in_file(fid).unwrap().is_empty());
        assert!(store.references_in_file(fid).unwrap().is_empty());
        assert!(store.resolutions_of_reference(rid).unwrap().is_empty());
    }

    #[test]
    fn test_delete_file_data_keeps_rows_targeting_the_file() {
        let mut store = Store::open_in_memory().unwrap();
        let fa = file(&store, "a.go", "go");
        let fb = file(&store, "b.go", "go");
        let target = symbol(&store, fa, "Foo", SymbolKind::Function, (1, 3));
        let rid = call_ref(&store, fb, "Foo", 5, 2);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: target,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Direct,
            })
            .unwrap();

        // Deleting A leaves B's resolution row: target-side cleanup is the
        // blast-radius step's job.
        store.delete_file_data(fa).unwrap();
        assert_eq!(store.resolutions_of_reference(rid).unwrap().len(), 1);
    }

    #[test]
    fn test_reference_cascade_to_resolutions() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");
        let sid = symbol(&store, fid, "f", SymbolKind::Function, (0, 1));
        let rid = call_ref(&store, fid, "f", 0, 0);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: sid,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Direct,
            })
            .unwrap();

        store
            .conn()
            .execute("DELETE FROM \"references\" WHERE id = ?1", params![rid])
            .unwrap();
        assert!(store.resolutions_of_reference(rid).unwrap().is_empty());
    }

    #[test]
    fn test_imports_matching_source_suffix() {
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

        let matched = store.imports_matching_source("util").unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_mutation_counters() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");
        let sid = symbol(&store, fid, "f", SymbolKind::Function, (0, 1));
        let rid = call_ref(&store, fid, "f", 0, 0);

        assert_eq!(store.counters().resolution_rows_written(), 0);
        store
            .insert_resolved_reference(&NewResolvedReference {
                reference_id: rid,
                target_symbol_id: sid,
                confidence: 1.0,
                resolution_kind: ResolutionKind::Direct,
            })
            .unwrap();
        store
            .insert_call_edge(&NewCallEdge {
                caller_symbol_id: sid,
                callee_symbol_id: sid,
                file_id: Some(fid),
                line: 0,
                col: 0,
            })
            .unwrap();
        assert_eq!(store.counters().resolution_rows_written(), 2);
    }
}
