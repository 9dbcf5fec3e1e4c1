//! Per-file write batching
//!
//! Extraction (and resolution) scripts never write to the main store.
//! They stage rows into a [`RowBatch`] owned by the worker that runs the
//! script; `Store::commit_batch` transfers the batch in a single
//! transaction, reassigning staged IDs and fixing cross-row references.
//! A failing insert rolls the whole batch back, so a partial batch never
//! reaches the main store.
//!
//! Staged IDs are negative (-1, -2, ...) and remap to real rowids at
//! commit; non-negative IDs pass through untouched, which lets resolution
//! rows reference already-committed extraction rows.

use std::collections::HashMap;

use rusqlite::{params, Transaction};
use xxhash_rust::xxh3::xxh3_64;

use super::records::*;
use super::Store;
use crate::core::error::{Error, Result};

// =============================================================================
// ROW BATCH
// =============================================================================

/// A staging area for one file's (or one resolve run's) rows
#[derive(Debug, Default)]
pub struct RowBatch {
    next_local: i64,
    pub(crate) symbols: Vec<(i64, NewSymbol)>,
    pub(crate) scopes: Vec<(i64, NewScope)>,
    pub(crate) references: Vec<(i64, NewReference)>,
    pub(crate) imports: Vec<(i64, NewImport)>,
    pub(crate) type_members: Vec<(i64, NewTypeMember)>,
    pub(crate) function_params: Vec<(i64, NewFunctionParam)>,
    pub(crate) type_params: Vec<(i64, NewTypeParam)>,
    pub(crate) annotations: Vec<(i64, NewAnnotation)>,
    pub(crate) symbol_fragments: Vec<(i64, NewSymbolFragment)>,
    pub(crate) resolved_references: Vec<(i64, NewResolvedReference)>,
    pub(crate) implementations: Vec<(i64, NewImplementation)>,
    pub(crate) call_edges: Vec<(i64, NewCallEdge)>,
    pub(crate) reexports: Vec<(i64, NewReexport)>,
    pub(crate) extension_bindings: Vec<(i64, NewExtensionBinding)>,
    pub(crate) type_compositions: Vec<(i64, NewTypeComposition)>,
}

macro_rules! stage_fn {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(&mut self, row: $ty) -> i64 {
            let id = self.next_id();
            self.$field.push((id, row));
            id
        }
    };
}

impl RowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_local -= 1;
        self.next_local
    }

    stage_fn!(stage_symbol, symbols, NewSymbol);
    stage_fn!(stage_scope, scopes, NewScope);
    stage_fn!(stage_reference, references, NewReference);
    stage_fn!(stage_import, imports, NewImport);
    stage_fn!(stage_type_member, type_members, NewTypeMember);
    stage_fn!(stage_function_param, function_params, NewFunctionParam);
    stage_fn!(stage_type_param, type_params, NewTypeParam);
    stage_fn!(stage_annotation, annotations, NewAnnotation);
    stage_fn!(stage_symbol_fragment, symbol_fragments, NewSymbolFragment);
    stage_fn!(stage_resolved_reference, resolved_references, NewResolvedReference);
    stage_fn!(stage_implementation, implementations, NewImplementation);
    stage_fn!(stage_call_edge, call_edges, NewCallEdge);
    stage_fn!(stage_reexport, reexports, NewReexport);
    stage_fn!(stage_extension_binding, extension_bindings, NewExtensionBinding);
    stage_fn!(stage_type_composition, type_compositions, NewTypeComposition);

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn row_count(&self) -> usize {
        self.symbols.len()
            + self.scopes.len()
            + self.references.len()
            + self.imports.len()
            + self.type_members.len()
            + self.function_params.len()
            + self.type_params.len()
            + self.annotations.len()
            + self.symbol_fragments.len()
            + self.resolved_references.len()
            + self.implementations.len()
            + self.call_edges.len()
            + self.reexports.len()
            + self.extension_bindings.len()
            + self.type_compositions.len()
    }

    /// Compute the signature hash of every staged symbol.
    ///
    /// The hash covers name, kind, visibility, ordered modifiers, and the
    /// ordered members / params / type-params staged against the symbol.
    /// It deliberately excludes location, so two syntactically identical
    /// declarations hash identically regardless of where they sit.
    pub(crate) fn signature_hashes(&self) -> HashMap<i64, String> {
        let mut out = HashMap::with_capacity(self.symbols.len());
        for (local_id, symbol) in &self.symbols {
            out.insert(*local_id, self.signature_hash_for(*local_id, symbol));
        }
        out
    }

    fn signature_hash_for(&self, local_id: i64, symbol: &NewSymbol) -> String {
        let mut input = String::new();
        input.push_str(&symbol.name);
        input.push('\u{1f}');
        input.push_str(symbol.kind.as_str());
        input.push('\u{1f}');
        input.push_str(symbol.visibility.as_deref().unwrap_or(""));
        input.push('\u{1f}');
        input.push_str(&join_modifiers(&symbol.modifiers));

        for (_, member) in self
            .type_members
            .iter()
            .filter(|(_, m)| m.symbol_id == local_id)
        {
            input.push('\u{1e}');
            input.push_str(&member.name);
            input.push(':');
            input.push_str(member.kind.as_str());
            input.push(':');
            input.push_str(member.type_expr.as_deref().unwrap_or(""));
            input.push(':');
            input.push_str(member.visibility.as_deref().unwrap_or(""));
        }

        let mut params: Vec<&NewFunctionParam> = self
            .function_params
            .iter()
            .filter(|(_, p)| p.symbol_id == local_id)
            .map(|(_, p)| p)
            .collect();
        params.sort_by_key(|p| p.ordinal);
        for param in params {
            input.push('\u{1e}');
            input.push_str(param.name.as_deref().unwrap_or(""));
            input.push(':');
            input.push_str(&param.ordinal.to_string());
            input.push(':');
            input.push_str(param.type_expr.as_deref().unwrap_or(""));
            input.push(':');
            input.push_str(if param.is_receiver { "r" } else { "" });
            input.push_str(if param.is_return { "o" } else { "" });
            input.push_str(if param.has_default { "d" } else { "" });
            input.push(':');
            input.push_str(param.default_expr.as_deref().unwrap_or(""));
        }

        let mut tparams: Vec<&NewTypeParam> = self
            .type_params
            .iter()
            .filter(|(_, p)| p.symbol_id == local_id)
            .map(|(_, p)| p)
            .collect();
        tparams.sort_by_key(|p| p.ordinal);
        for tparam in tparams {
            input.push('\u{1e}');
            input.push_str(&tparam.name);
            input.push(':');
            input.push_str(&tparam.ordinal.to_string());
            input.push(':');
            input.push_str(tparam.param_kind.as_deref().unwrap_or(""));
            input.push(':');
            input.push_str(tparam.variance.as_deref().unwrap_or(""));
            input.push(':');
            input.push_str(tparam.constraints.as_deref().unwrap_or(""));
        }

        format!("{:016x}", xxh3_64(input.as_bytes()))
    }
}

/// Result of committing a batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Real IDs assigned to staged symbols, in stage order
    pub symbol_ids: Vec<i64>,
    /// Total rows written
    pub rows_written: u64,
}

// =============================================================================
// COMMIT
// =============================================================================

/// ID remap table for one commit
#[derive(Default)]
struct IdMap {
    map: HashMap<i64, i64>,
}

impl IdMap {
    fn assign(&mut self, local: i64, real: i64) {
        self.map.insert(local, real);
    }

    /// Staged (negative) IDs must already have a real assignment;
    /// non-negative IDs pass through.
    fn resolve(&self, id: i64) -> Result<i64> {
        if id >= 0 {
            return Ok(id);
        }
        self.map.get(&id).copied().ok_or_else(|| Error::InvalidArgument {
            message: format!("staged id {} referenced before it was defined", id),
        })
    }

    fn resolve_opt(&self, id: Option<i64>) -> Result<Option<i64>> {
        match id {
            Some(id) => Ok(Some(self.resolve(id)?)),
            None => Ok(None),
        }
    }
}

impl Store {
    /// Transfer a batch into the store in one transaction.
    ///
    /// Rows are inserted parent-first in stage order; staged IDs remap to
    /// freshly assigned rowids. Any failure (bad span, dangling staged id,
    /// FK violation) rolls back the entire batch.
    pub fn commit_batch(&mut self, batch: RowBatch) -> Result<BatchOutcome> {
        let hashes = batch.signature_hashes();
        let mut outcome = BatchOutcome::default();
        let mut resolution_rows = 0u64;

        {
            let tx = self.conn_mut().transaction()?;
            let mut symbols = IdMap::default();
            let mut scopes = IdMap::default();
            let mut references = IdMap::default();

            for (local_id, symbol) in &batch.symbols {
                if !symbol.span.is_valid() {
                    return Err(Error::InvalidArgument {
                        message: format!("invalid span for symbol {}", symbol.name),
                    });
                }
                let parent = symbols.resolve_opt(symbol.parent_symbol_id)?;
                let hash = hashes.get(local_id).map(String::as_str).unwrap_or("");
                tx.execute(
                    "INSERT INTO symbols (file_id, name, kind, visibility, modifiers, signature_hash,
                                          start_line, start_col, end_line, end_col, parent_symbol_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        symbol.file_id,
                        symbol.name,
                        symbol.kind.as_str(),
                        symbol.visibility,
                        join_modifiers(&symbol.modifiers),
                        hash,
                        symbol.span.start_line,
                        symbol.span.start_col,
                        symbol.span.end_line,
                        symbol.span.end_col,
                        parent,
                    ],
                )?;
                let real = tx.last_insert_rowid();
                symbols.assign(*local_id, real);
                outcome.symbol_ids.push(real);
            }

            for (local_id, scope) in &batch.scopes {
                if !scope.span.is_valid() {
                    return Err(Error::InvalidArgument {
                        message: "invalid scope span".to_string(),
                    });
                }
                let symbol_id = symbols.resolve_opt(scope.symbol_id)?;
                let parent = scopes.resolve_opt(scope.parent_scope_id)?;
                tx.execute(
                    "INSERT INTO scopes (file_id, symbol_id, kind, start_line, start_col, end_line, end_col, parent_scope_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        scope.file_id,
                        symbol_id,
                        scope.kind.as_str(),
                        scope.span.start_line,
                        scope.span.start_col,
                        scope.span.end_line,
                        scope.span.end_col,
                        parent,
                    ],
                )?;
                scopes.assign(*local_id, tx.last_insert_rowid());
            }

            for (local_id, reference) in &batch.references {
                if !reference.span.is_valid() {
                    return Err(Error::InvalidArgument {
                        message: format!("invalid span for reference {}", reference.name),
                    });
                }
                let scope_id = scopes.resolve_opt(reference.scope_id)?;
                tx.execute(
                    "INSERT INTO \"references\" (file_id, scope_id, name, start_line, start_col, end_line, end_col, context)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        reference.file_id,
                        scope_id,
                        reference.name,
                        reference.span.start_line,
                        reference.span.start_col,
                        reference.span.end_line,
                        reference.span.end_col,
                        reference.context.as_str(),
                    ],
                )?;
                references.assign(*local_id, tx.last_insert_rowid());
            }

            for (_, import) in &batch.imports {
                tx.execute(
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
            }

            for (_, member) in &batch.type_members {
                let symbol_id = symbols.resolve(member.symbol_id)?;
                tx.execute(
                    "INSERT INTO type_members (symbol_id, name, kind, type_expr, visibility)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        symbol_id,
                        member.name,
                        member.kind.as_str(),
                        member.type_expr,
                        member.visibility,
                    ],
                )?;
            }

            for (_, param) in &batch.function_params {
                let symbol_id = symbols.resolve(param.symbol_id)?;
                tx.execute(
                    "INSERT INTO function_params (symbol_id, name, ordinal, type_expr, is_receiver, is_return, has_default, default_expr)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        symbol_id,
                        param.name,
                        param.ordinal,
                        param.type_expr,
                        param.is_receiver,
                        param.is_return,
                        param.has_default,
                        param.default_expr,
                    ],
                )?;
            }

            for (_, tparam) in &batch.type_params {
                let symbol_id = symbols.resolve(tparam.symbol_id)?;
                tx.execute(
                    "INSERT INTO type_params (symbol_id, name, ordinal, param_kind, variance, constraints)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        symbol_id,
                        tparam.name,
                        tparam.ordinal,
                        tparam.param_kind,
                        tparam.variance,
                        tparam.constraints,
                    ],
                )?;
            }

            for (_, annotation) in &batch.annotations {
                let target = symbols.resolve(annotation.target_symbol_id)?;
                let resolved = symbols.resolve_opt(annotation.resolved_symbol_id)?;
                tx.execute(
                    "INSERT INTO annotations (target_symbol_id, name, resolved_symbol_id, arguments, file_id, line, col)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        target,
                        annotation.name,
                        resolved,
                        annotation.arguments,
                        annotation.file_id,
                        annotation.line,
                        annotation.col,
                    ],
                )?;
            }

            for (_, fragment) in &batch.symbol_fragments {
                let symbol_id = symbols.resolve(fragment.symbol_id)?;
                tx.execute(
                    "INSERT INTO symbol_fragments (symbol_id, file_id, start_line, start_col, end_line, end_col, is_primary)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        symbol_id,
                        fragment.file_id,
                        fragment.span.start_line,
                        fragment.span.start_col,
                        fragment.span.end_line,
                        fragment.span.end_col,
                        fragment.is_primary,
                    ],
                )?;
            }

            resolution_rows += commit_resolution_rows(&tx, &batch, &symbols, &references)?;

            tx.commit()?;
        }

        outcome.rows_written = batch.row_count() as u64;
        self.counters().add_written(resolution_rows);
        Ok(outcome)
    }
}

fn commit_resolution_rows(
    tx: &Transaction,
    batch: &RowBatch,
    symbols: &IdMap,
    references: &IdMap,
) -> Result<u64> {
    let mut n = 0u64;

    for (_, row) in &batch.resolved_references {
        tx.execute(
            "INSERT INTO resolved_references (reference_id, target_symbol_id, confidence, resolution_kind)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                references.resolve(row.reference_id)?,
                symbols.resolve(row.target_symbol_id)?,
                row.confidence,
                row.resolution_kind.as_str(),
            ],
        )?;
        n += 1;
    }

    for (_, row) in &batch.implementations {
        tx.execute(
            "INSERT INTO implementations (type_symbol_id, interface_symbol_id, kind) VALUES (?1, ?2, ?3)",
            params![
                symbols.resolve(row.type_symbol_id)?,
                symbols.resolve(row.interface_symbol_id)?,
                row.kind.as_str(),
            ],
        )?;
        n += 1;
    }

    for (_, row) in &batch.call_edges {
        tx.execute(
            "INSERT INTO call_graph (caller_symbol_id, callee_symbol_id, file_id, line, col)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                symbols.resolve(row.caller_symbol_id)?,
                symbols.resolve(row.callee_symbol_id)?,
                row.file_id,
                row.line,
                row.col,
            ],
        )?;
        n += 1;
    }

    for (_, row) in &batch.reexports {
        tx.execute(
            "INSERT INTO reexports (file_id, original_symbol_id, exported_name) VALUES (?1, ?2, ?3)",
            params![row.file_id, symbols.resolve(row.original_symbol_id)?, row.exported_name],
        )?;
        n += 1;
    }

    for (_, row) in &batch.extension_bindings {
        tx.execute(
            "INSERT INTO extension_bindings (member_symbol_id, extended_type_expr, extended_type_symbol_id, kind, constraints, is_default_impl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                symbols.resolve(row.member_symbol_id)?,
                row.extended_type_expr,
                symbols.resolve_opt(row.extended_type_symbol_id)?,
                row.kind.as_str(),
                row.constraints,
                row.is_default_impl,
            ],
        )?;
        n += 1;
    }

    for (_, row) in &batch.type_compositions {
        tx.execute(
            "INSERT INTO type_compositions (composite_symbol_id, component_symbol_id, composition_kind)
             VALUES (?1, ?2, ?3)",
            params![
                symbols.resolve(row.composite_symbol_id)?,
                symbols.resolve(row.component_symbol_id)?,
                row.composition_kind.as_str(),
            ],
        )?;
        n += 1;
    }

    Ok(n)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::file;

    fn new_symbol(file_id: i64, name: &str, lines: (u32, u32)) -> NewSymbol {
        NewSymbol {
            file_id: Some(file_id),
            name: name.to_string(),
            kind: SymbolKind::Function,
            visibility: Some("public".to_string()),
            modifiers: Vec::new(),
            span: Span::new(lines.0, 0, lines.1, 0),
            parent_symbol_id: None,
        }
    }

    #[test]
    fn test_batch_remaps_parent_links() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.py", "python");

        let mut batch = RowBatch::new();
        let class_id = batch.stage_symbol(NewSymbol {
            kind: SymbolKind::Class,
            ..new_symbol(fid, "Widget", (0, 20))
        });
        batch.stage_symbol(NewSymbol {
            kind: SymbolKind::Method,
            parent_symbol_id: Some(class_id),
            ..new_symbol(fid, "render", (2, 5))
        });
        assert!(class_id < 0);

        store.commit_batch(batch).unwrap();

        let symbols = store.symbols_in_file(fid).unwrap();
        assert_eq!(symbols.len(), 2);
        let class = symbols.iter().find(|s| s.name == "Widget").unwrap();
        let method = symbols.iter().find(|s| s.name == "render").unwrap();
        assert_eq!(method.parent_symbol_id, Some(class.id));
        assert!(class.id > 0);
    }

    #[test]
    fn test_batch_remaps_scope_chain_and_references() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");

        let mut batch = RowBatch::new();
        let file_scope = batch.stage_scope(NewScope {
            file_id: fid,
            symbol_id: None,
            kind: ScopeKind::File,
            span: Span::new(0, 0, 30, 0),
            parent_scope_id: None,
        });
        let fn_scope = batch.stage_scope(NewScope {
            file_id: fid,
            symbol_id: None,
            kind: ScopeKind::Function,
            span: Span::new(3, 0, 8, 1),
            parent_scope_id: Some(file_scope),
        });
        batch.stage_reference(NewReference {
            file_id: fid,
            scope_id: Some(fn_scope),
            name: "helper".to_string(),
            span: Span::new(4, 4, 4, 10),
            context: RefContext::Call,
        });

        store.commit_batch(batch).unwrap();

        let scopes = store.scopes_in_file(fid).unwrap();
        assert_eq!(scopes.len(), 2);
        let root = scopes.iter().find(|s| s.kind == ScopeKind::File).unwrap();
        let inner = scopes.iter().find(|s| s.kind == ScopeKind::Function).unwrap();
        assert_eq!(inner.parent_scope_id, Some(root.id));
        assert!(root.parent_scope_id.is_none());

        let refs = store.references_in_file(fid).unwrap();
        assert_eq!(refs[0].scope_id, Some(inner.id));
    }

    #[test]
    fn test_batch_failure_leaves_store_untouched() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");

        let mut batch = RowBatch::new();
        batch.stage_symbol(new_symbol(fid, "ok", (0, 1)));
        // References a staged symbol id that was never defined.
        batch.stage_type_member(NewTypeMember {
            symbol_id: -999,
            name: "bogus".to_string(),
            kind: MemberKind::Field,
            type_expr: None,
            visibility: None,
        });

        assert!(store.commit_batch(batch).is_err());
        assert!(store.symbols_in_file(fid).unwrap().is_empty());
    }

    #[test]
    fn test_signature_hash_excludes_location() {
        let fid = 1;
        let mut a = RowBatch::new();
        a.stage_symbol(new_symbol(fid, "Greet", (2, 4)));
        let mut b = RowBatch::new();
        b.stage_symbol(new_symbol(fid, "Greet", (40, 42)));

        let ha: Vec<_> = a.signature_hashes().into_values().collect();
        let hb: Vec<_> = b.signature_hashes().into_values().collect();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_signature_hash_covers_params_and_members() {
        let fid = 1;
        let mut a = RowBatch::new();
        let sa = a.stage_symbol(new_symbol(fid, "Greet", (0, 2)));
        a.stage_function_param(NewFunctionParam {
            symbol_id: sa,
            name: Some("name".to_string()),
            ordinal: 0,
            type_expr: Some("string".to_string()),
            is_receiver: false,
            is_return: false,
            has_default: false,
            default_expr: None,
        });

        let mut b = RowBatch::new();
        let sb = b.stage_symbol(new_symbol(fid, "Greet", (0, 2)));
        b.stage_function_param(NewFunctionParam {
            symbol_id: sb,
            name: Some("name".to_string()),
            ordinal: 0,
            type_expr: Some("int".to_string()),
            is_receiver: false,
            is_return: false,
            has_default: false,
            default_expr: None,
        });

        let ha = a.signature_hashes().remove(&sa).unwrap();
        let hb = b.signature_hashes().remove(&sb).unwrap();
        assert_ne!(ha, hb);

        let mut c = RowBatch::new();
        let sc = c.stage_symbol(NewSymbol {
            kind: SymbolKind::Struct,
            ..new_symbol(fid, "Box", (0, 4))
        });
        c.stage_type_member(NewTypeMember {
            symbol_id: sc,
            name: "lid".to_string(),
            kind: MemberKind::Field,
            type_expr: Some("string".to_string()),
            visibility: None,
        });
        let mut d = RowBatch::new();
        let sd = d.stage_symbol(NewSymbol {
            kind: SymbolKind::Struct,
            ..new_symbol(fid, "Box", (0, 4))
        });
        let hc = c.signature_hashes().remove(&sc).unwrap();
        let hd = d.signature_hashes().remove(&sd).unwrap();
        assert_ne!(hc, hd);
    }

    #[test]
    fn test_committed_hash_lands_in_store() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");

        let mut batch = RowBatch::new();
        batch.stage_symbol(new_symbol(fid, "Greet", (0, 2)));
        store.commit_batch(batch).unwrap();

        let sym = &store.symbols_in_file(fid).unwrap()[0];
        assert_eq!(sym.signature_hash.len(), 16);

        // Re-staging the identical symbol elsewhere yields the same hash.
        let mut batch = RowBatch::new();
        let id = batch.stage_symbol(new_symbol(fid, "Greet", (100, 102)));
        let hash = batch.signature_hashes().remove(&id).unwrap();
        assert_eq!(sym.signature_hash, hash);
    }

    #[test]
    fn test_resolution_rows_with_real_ids() {
        let mut store = Store::open_in_memory().unwrap();
        let fid = file(&store, "a.go", "go");

        let mut batch = RowBatch::new();
        batch.stage_symbol(new_symbol(fid, "callee", (0, 2)));
        let outcome = store.commit_batch(batch).unwrap();
        let callee = outcome.symbol_ids[0];

        let rid = crate::store::test_support::call_ref(&store, fid, "callee", 1, 0);

        // Resolution batch mixing a real reference id with a real symbol id.
        let mut batch = RowBatch::new();
        batch.stage_resolved_reference(NewResolvedReference {
            reference_id: rid,
            target_symbol_id: callee,
            confidence: 1.0,
            resolution_kind: ResolutionKind::Direct,
        });
        store.commit_batch(batch).unwrap();

        assert_eq!(store.resolutions_of_reference(rid).unwrap().len(), 1);
    }
}
