//! Schema definition and migration
//!
//! Sixteen tables plus the full index set. Migration is idempotent and
//! versioned through `PRAGMA user_version`; query-side consumers open the
//! database read-only and never migrate.

use rusqlite::Connection;

use crate::core::error::{Error, Result};

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Number of tables the migration creates
pub const TABLE_COUNT: usize = 16;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id            INTEGER PRIMARY KEY,
    path          TEXT NOT NULL UNIQUE,
    language      TEXT NOT NULL,
    content_hash  TEXT NOT NULL,
    last_indexed  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS symbols (
    id                INTEGER PRIMARY KEY,
    file_id           INTEGER REFERENCES files(id),
    name              TEXT NOT NULL,
    kind              TEXT NOT NULL,
    visibility        TEXT,
    modifiers         TEXT NOT NULL DEFAULT '',
    signature_hash    TEXT NOT NULL DEFAULT '',
    start_line        INTEGER NOT NULL,
    start_col         INTEGER NOT NULL,
    end_line          INTEGER NOT NULL,
    end_col           INTEGER NOT NULL,
    parent_symbol_id  INTEGER REFERENCES symbols(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS symbol_fragments (
    id          INTEGER PRIMARY KEY,
    symbol_id   INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    file_id     INTEGER NOT NULL REFERENCES files(id),
    start_line  INTEGER NOT NULL,
    start_col   INTEGER NOT NULL,
    end_line    INTEGER NOT NULL,
    end_col     INTEGER NOT NULL,
    is_primary  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS scopes (
    id               INTEGER PRIMARY KEY,
    file_id          INTEGER NOT NULL REFERENCES files(id),
    symbol_id        INTEGER REFERENCES symbols(id),
    kind             TEXT NOT NULL,
    start_line       INTEGER NOT NULL,
    start_col        INTEGER NOT NULL,
    end_line         INTEGER NOT NULL,
    end_col          INTEGER NOT NULL,
    parent_scope_id  INTEGER REFERENCES scopes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS "references" (
    id          INTEGER PRIMARY KEY,
    file_id     INTEGER NOT NULL REFERENCES files(id),
    scope_id    INTEGER REFERENCES scopes(id),
    name        TEXT NOT NULL,
    start_line  INTEGER NOT NULL,
    start_col   INTEGER NOT NULL,
    end_line    INTEGER NOT NULL,
    end_col     INTEGER NOT NULL,
    context     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS imports (
    id             INTEGER PRIMARY KEY,
    file_id        INTEGER NOT NULL REFERENCES files(id),
    source         TEXT NOT NULL,
    imported_name  TEXT,
    local_alias    TEXT,
    kind           TEXT NOT NULL,
    scope          TEXT NOT NULL DEFAULT 'file'
);

CREATE TABLE IF NOT EXISTS type_members (
    id          INTEGER PRIMARY KEY,
    symbol_id   INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    type_expr   TEXT,
    visibility  TEXT
);

CREATE TABLE IF NOT EXISTS function_params (
    id            INTEGER PRIMARY KEY,
    symbol_id     INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    name          TEXT,
    ordinal       INTEGER NOT NULL,
    type_expr     TEXT,
    is_receiver   INTEGER NOT NULL DEFAULT 0,
    is_return     INTEGER NOT NULL DEFAULT 0,
    has_default   INTEGER NOT NULL DEFAULT 0,
    default_expr  TEXT
);

CREATE TABLE IF NOT EXISTS type_params (
    id           INTEGER PRIMARY KEY,
    symbol_id    INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    ordinal      INTEGER NOT NULL,
    param_kind   TEXT,
    variance     TEXT,
    constraints  TEXT
);

CREATE TABLE IF NOT EXISTS annotations (
    id                  INTEGER PRIMARY KEY,
    target_symbol_id    INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    name                TEXT NOT NULL,
    resolved_symbol_id  INTEGER,
    arguments           TEXT,
    file_id             INTEGER REFERENCES files(id),
    line                INTEGER NOT NULL DEFAULT 0,
    col                 INTEGER NOT NULL DEFAULT 0
);

-- Resolution tables reference symbols by bare id: a re-index reassigns the
-- ids of a file's symbols while resolution rows in other files must survive
-- when signatures are unchanged, so these columns carry no FK constraint.

CREATE TABLE IF NOT EXISTS resolved_references (
    id                INTEGER PRIMARY KEY,
    reference_id      INTEGER NOT NULL REFERENCES "references"(id) ON DELETE CASCADE,
    target_symbol_id  INTEGER NOT NULL,
    confidence        REAL NOT NULL DEFAULT 1.0,
    resolution_kind   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS implementations (
    id                   INTEGER PRIMARY KEY,
    type_symbol_id       INTEGER NOT NULL,
    interface_symbol_id  INTEGER NOT NULL,
    kind                 TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS call_graph (
    id                INTEGER PRIMARY KEY,
    caller_symbol_id  INTEGER NOT NULL,
    callee_symbol_id  INTEGER NOT NULL,
    file_id           INTEGER REFERENCES files(id),
    line              INTEGER NOT NULL DEFAULT 0,
    col               INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS reexports (
    id                  INTEGER PRIMARY KEY,
    file_id             INTEGER NOT NULL REFERENCES files(id),
    original_symbol_id  INTEGER NOT NULL,
    exported_name       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS extension_bindings (
    id                       INTEGER PRIMARY KEY,
    member_symbol_id         INTEGER NOT NULL,
    extended_type_expr       TEXT NOT NULL,
    extended_type_symbol_id  INTEGER,
    kind                     TEXT NOT NULL,
    constraints              TEXT,
    is_default_impl          INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS type_compositions (
    id                   INTEGER PRIMARY KEY,
    composite_symbol_id  INTEGER NOT NULL,
    component_symbol_id  INTEGER NOT NULL,
    composition_kind     TEXT NOT NULL
);
"#;

const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
CREATE INDEX IF NOT EXISTS idx_symbols_sig ON symbols(signature_hash);
CREATE INDEX IF NOT EXISTS idx_symbols_parent ON symbols(parent_symbol_id);
CREATE INDEX IF NOT EXISTS idx_fragments_symbol ON symbol_fragments(symbol_id);
CREATE INDEX IF NOT EXISTS idx_fragments_file ON symbol_fragments(file_id);
CREATE INDEX IF NOT EXISTS idx_scopes_file ON scopes(file_id);
CREATE INDEX IF NOT EXISTS idx_scopes_parent ON scopes(parent_scope_id);
CREATE INDEX IF NOT EXISTS idx_scopes_symbol ON scopes(symbol_id);
CREATE INDEX IF NOT EXISTS idx_references_file ON "references"(file_id);
CREATE INDEX IF NOT EXISTS idx_references_name ON "references"(name);
CREATE INDEX IF NOT EXISTS idx_references_scope ON "references"(scope_id);
CREATE INDEX IF NOT EXISTS idx_imports_file ON imports(file_id);
CREATE INDEX IF NOT EXISTS idx_imports_source ON imports(source);
CREATE INDEX IF NOT EXISTS idx_members_symbol ON type_members(symbol_id);
CREATE INDEX IF NOT EXISTS idx_params_symbol ON function_params(symbol_id);
CREATE INDEX IF NOT EXISTS idx_type_params_symbol ON type_params(symbol_id);
CREATE INDEX IF NOT EXISTS idx_annotations_target ON annotations(target_symbol_id);
CREATE INDEX IF NOT EXISTS idx_annotations_file ON annotations(file_id);
CREATE INDEX IF NOT EXISTS idx_resolved_reference ON resolved_references(reference_id);
CREATE INDEX IF NOT EXISTS idx_resolved_target ON resolved_references(target_symbol_id);
CREATE INDEX IF NOT EXISTS idx_impls_type ON implementations(type_symbol_id);
CREATE INDEX IF NOT EXISTS idx_impls_interface ON implementations(interface_symbol_id);
CREATE INDEX IF NOT EXISTS idx_calls_caller ON call_graph(caller_symbol_id);
CREATE INDEX IF NOT EXISTS idx_calls_callee ON call_graph(callee_symbol_id);
CREATE INDEX IF NOT EXISTS idx_calls_file ON call_graph(file_id);
CREATE INDEX IF NOT EXISTS idx_reexports_file ON reexports(file_id);
CREATE INDEX IF NOT EXISTS idx_reexports_symbol ON reexports(original_symbol_id);
CREATE INDEX IF NOT EXISTS idx_extensions_member ON extension_bindings(member_symbol_id);
CREATE INDEX IF NOT EXISTS idx_extensions_type ON extension_bindings(extended_type_symbol_id);
CREATE INDEX IF NOT EXISTS idx_compositions_composite ON type_compositions(composite_symbol_id);
CREATE INDEX IF NOT EXISTS idx_compositions_component ON type_compositions(component_symbol_id);
"#;

/// Ensure the schema exists at the current version. Idempotent.
pub fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(Error::DbSchema {
            message: format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            ),
        });
    }

    conn.execute_batch(CREATE_TABLES)?;
    conn.execute_batch(CREATE_INDEXES)?;

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Names of all tables the migration manages, child-first for deletion order
pub const ALL_TABLES: &[&str] = &[
    "type_compositions",
    "extension_bindings",
    "reexports",
    "call_graph",
    "implementations",
    "resolved_references",
    "annotations",
    "type_params",
    "function_params",
    "type_members",
    "imports",
    "\"references\"",
    "scopes",
    "symbol_fragments",
    "symbols",
    "files",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_migration_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let names = table_names(&conn);
        assert_eq!(names.len(), TABLE_COUNT);
        assert!(names.contains(&"files".to_string()));
        assert!(names.contains(&"references".to_string()));
        assert!(names.contains(&"type_compositions".to_string()));

        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(table_names(&conn).len(), TABLE_COUNT);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        assert!(migrate(&conn).is_err());
    }
}
