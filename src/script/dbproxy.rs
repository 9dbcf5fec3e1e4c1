//! The `db` global handed to scripts
//!
//! Write methods take plain Lua records and stage rows into the current
//! batch, returning staged IDs (negative until commit). Read methods are
//! only wired during the resolve phase, where they query the main store;
//! extraction workers never touch it.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Lua, Table, UserData, UserDataMethods};

use crate::core::error::Error;
use crate::store::records::*;
use crate::store::{RowBatch, Store};

/// Store proxy exposed to Lua as `db`
pub struct DbProxy {
    batch: Rc<RefCell<RowBatch>>,
    store: Option<Rc<RefCell<Store>>>,
}

impl DbProxy {
    /// Extraction-phase proxy: writes stage into `batch`, reads are unavailable
    pub fn for_extraction(batch: Rc<RefCell<RowBatch>>) -> Self {
        Self { batch, store: None }
    }

    /// Resolution-phase proxy: writes stage into `batch`, reads hit `store`
    pub fn for_resolution(batch: Rc<RefCell<RowBatch>>, store: Rc<RefCell<Store>>) -> Self {
        Self {
            batch,
            store: Some(store),
        }
    }

    fn store(&self) -> mlua::Result<&Rc<RefCell<Store>>> {
        self.store.as_ref().ok_or_else(|| {
            mlua::Error::external(Error::Script {
                script: "<db>".to_string(),
                message: "db reads are only available in the resolve phase".to_string(),
            })
        })
    }
}

// =============================================================================
// LUA RECORD HELPERS
// =============================================================================

fn bad_arg(message: String) -> mlua::Error {
    mlua::Error::external(Error::InvalidArgument { message })
}

fn req_str(t: &Table, key: &str) -> mlua::Result<String> {
    t.get::<_, Option<String>>(key)?
        .ok_or_else(|| bad_arg(format!("missing required field '{}'", key)))
}

fn opt_str(t: &Table, key: &str) -> mlua::Result<Option<String>> {
    t.get(key)
}

fn req_i64(t: &Table, key: &str) -> mlua::Result<i64> {
    t.get::<_, Option<i64>>(key)?
        .ok_or_else(|| bad_arg(format!("missing required field '{}'", key)))
}

fn opt_i64(t: &Table, key: &str) -> mlua::Result<Option<i64>> {
    t.get(key)
}

fn u32_or(t: &Table, key: &str, default: u32) -> mlua::Result<u32> {
    let v: Option<i64> = t.get(key)?;
    match v {
        Some(v) if v >= 0 => Ok(v as u32),
        Some(v) => Err(bad_arg(format!("field '{}' must be non-negative, got {}", key, v))),
        None => Ok(default),
    }
}

fn req_u32(t: &Table, key: &str) -> mlua::Result<u32> {
    let v = req_i64(t, key)?;
    if v < 0 {
        return Err(bad_arg(format!("field '{}' must be non-negative, got {}", key, v)));
    }
    Ok(v as u32)
}

fn bool_or(t: &Table, key: &str, default: bool) -> mlua::Result<bool> {
    Ok(t.get::<_, Option<bool>>(key)?.unwrap_or(default))
}

fn span_from(t: &Table) -> mlua::Result<Span> {
    Ok(Span {
        start_line: req_u32(t, "start_line")?,
        start_col: req_u32(t, "start_col")?,
        end_line: req_u32(t, "end_line")?,
        end_col: req_u32(t, "end_col")?,
    })
}

fn tag<T>(t: &Table, key: &str, parse: fn(&str) -> Option<T>) -> mlua::Result<T> {
    let raw = req_str(t, key)?;
    parse(&raw).ok_or_else(|| bad_arg(format!("unknown tag '{}' for field '{}'", raw, key)))
}

fn modifiers_from(t: &Table) -> mlua::Result<Vec<String>> {
    match t.get::<_, Option<Table>>("modifiers")? {
        Some(seq) => {
            let mut out = Vec::new();
            for value in seq.sequence_values::<String>() {
                out.push(value?);
            }
            Ok(out)
        }
        None => Ok(Vec::new()),
    }
}

fn set_span(t: &Table, span: Span) -> mlua::Result<()> {
    t.set("start_line", span.start_line)?;
    t.set("start_col", span.start_col)?;
    t.set("end_line", span.end_line)?;
    t.set("end_col", span.end_col)?;
    Ok(())
}

fn symbol_table<'lua>(lua: &'lua Lua, s: &SymbolRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", s.id)?;
    t.set("file_id", s.file_id)?;
    t.set("name", s.name.clone())?;
    t.set("kind", s.kind.as_str())?;
    t.set("visibility", s.visibility.clone())?;
    t.set("modifiers", s.modifiers.clone())?;
    t.set("signature_hash", s.signature_hash.clone())?;
    set_span(&t, s.span)?;
    t.set("parent_symbol_id", s.parent_symbol_id)?;
    Ok(t)
}

fn reference_table<'lua>(lua: &'lua Lua, r: &ReferenceRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", r.id)?;
    t.set("file_id", r.file_id)?;
    t.set("scope_id", r.scope_id)?;
    t.set("name", r.name.clone())?;
    t.set("context", r.context.as_str())?;
    set_span(&t, r.span)?;
    Ok(t)
}

fn scope_table<'lua>(lua: &'lua Lua, s: &ScopeRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", s.id)?;
    t.set("file_id", s.file_id)?;
    t.set("symbol_id", s.symbol_id)?;
    t.set("kind", s.kind.as_str())?;
    set_span(&t, s.span)?;
    t.set("parent_scope_id", s.parent_scope_id)?;
    Ok(t)
}

fn import_table<'lua>(lua: &'lua Lua, i: &ImportRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", i.id)?;
    t.set("file_id", i.file_id)?;
    t.set("source", i.source.clone())?;
    t.set("imported_name", i.imported_name.clone())?;
    t.set("local_alias", i.local_alias.clone())?;
    t.set("kind", i.kind.as_str())?;
    t.set("scope", i.scope.clone())?;
    Ok(t)
}

fn member_table<'lua>(lua: &'lua Lua, m: &TypeMemberRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", m.id)?;
    t.set("symbol_id", m.symbol_id)?;
    t.set("name", m.name.clone())?;
    t.set("kind", m.kind.as_str())?;
    t.set("type_expr", m.type_expr.clone())?;
    t.set("visibility", m.visibility.clone())?;
    Ok(t)
}

fn param_table<'lua>(lua: &'lua Lua, p: &FunctionParamRecord) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("id", p.id)?;
    t.set("symbol_id", p.symbol_id)?;
    t.set("name", p.name.clone())?;
    t.set("ordinal", p.ordinal)?;
    t.set("type_expr", p.type_expr.clone())?;
    t.set("is_receiver", p.is_receiver)?;
    t.set("is_return", p.is_return)?;
    t.set("has_default", p.has_default)?;
    t.set("default_expr", p.default_expr.clone())?;
    Ok(t)
}

fn ext_err(e: Error) -> mlua::Error {
    mlua::Error::external(e)
}

// =============================================================================
// USERDATA METHODS
// =============================================================================

impl UserData for DbProxy {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        // ---- extraction writes ----

        methods.add_method("insert_symbol", |_, this, t: Table| {
            let row = NewSymbol {
                file_id: opt_i64(&t, "file_id")?,
                name: req_str(&t, "name")?,
                kind: tag(&t, "kind", SymbolKind::parse)?,
                visibility: opt_str(&t, "visibility")?,
                modifiers: modifiers_from(&t)?,
                span: span_from(&t)?,
                parent_symbol_id: opt_i64(&t, "parent_symbol_id")?,
            };
            Ok(this.batch.borrow_mut().stage_symbol(row))
        });

        methods.add_method("insert_symbol_fragment", |_, this, t: Table| {
            let row = NewSymbolFragment {
                symbol_id: req_i64(&t, "symbol_id")?,
                file_id: req_i64(&t, "file_id")?,
                span: span_from(&t)?,
                is_primary: bool_or(&t, "is_primary", false)?,
            };
            Ok(this.batch.borrow_mut().stage_symbol_fragment(row))
        });

        methods.add_method("insert_scope", |_, this, t: Table| {
            let row = NewScope {
                file_id: req_i64(&t, "file_id")?,
                symbol_id: opt_i64(&t, "symbol_id")?,
                kind: tag(&t, "kind", ScopeKind::parse)?,
                span: span_from(&t)?,
                parent_scope_id: opt_i64(&t, "parent_scope_id")?,
            };
            Ok(this.batch.borrow_mut().stage_scope(row))
        });

        methods.add_method("insert_reference", |_, this, t: Table| {
            let row = NewReference {
                file_id: req_i64(&t, "file_id")?,
                scope_id: opt_i64(&t, "scope_id")?,
                name: req_str(&t, "name")?,
                span: span_from(&t)?,
                context: tag(&t, "context", RefContext::parse)?,
            };
            Ok(this.batch.borrow_mut().stage_reference(row))
        });

        methods.add_method("insert_import", |_, this, t: Table| {
            let row = NewImport {
                file_id: req_i64(&t, "file_id")?,
                source: req_str(&t, "source")?,
                imported_name: opt_str(&t, "imported_name")?,
                local_alias: opt_str(&t, "local_alias")?,
                kind: tag(&t, "kind", ImportKind::parse)?,
                scope: opt_str(&t, "scope")?.unwrap_or_else(|| "file".to_string()),
            };
            Ok(this.batch.borrow_mut().stage_import(row))
        });

        methods.add_method("insert_type_member", |_, this, t: Table| {
            let row = NewTypeMember {
                symbol_id: req_i64(&t, "symbol_id")?,
                name: req_str(&t, "name")?,
                kind: tag(&t, "kind", MemberKind::parse)?,
                type_expr: opt_str(&t, "type_expr")?,
                visibility: opt_str(&t, "visibility")?,
            };
            Ok(this.batch.borrow_mut().stage_type_member(row))
        });

        methods.add_method("insert_function_param", |_, this, t: Table| {
            let row = NewFunctionParam {
                symbol_id: req_i64(&t, "symbol_id")?,
                name: opt_str(&t, "name")?,
                ordinal: u32_or(&t, "ordinal", 0)?,
                type_expr: opt_str(&t, "type_expr")?,
                is_receiver: bool_or(&t, "is_receiver", false)?,
                is_return: bool_or(&t, "is_return", false)?,
                has_default: bool_or(&t, "has_default", false)?,
                default_expr: opt_str(&t, "default_expr")?,
            };
            Ok(this.batch.borrow_mut().stage_function_param(row))
        });

        methods.add_method("insert_type_param", |_, this, t: Table| {
            let row = NewTypeParam {
                symbol_id: req_i64(&t, "symbol_id")?,
                name: req_str(&t, "name")?,
                ordinal: u32_or(&t, "ordinal", 0)?,
                param_kind: opt_str(&t, "param_kind")?,
                variance: opt_str(&t, "variance")?,
                constraints: opt_str(&t, "constraints")?,
            };
            Ok(this.batch.borrow_mut().stage_type_param(row))
        });

        methods.add_method("insert_annotation", |_, this, t: Table| {
            let row = NewAnnotation {
                target_symbol_id: req_i64(&t, "target_symbol_id")?,
                name: req_str(&t, "name")?,
                resolved_symbol_id: opt_i64(&t, "resolved_symbol_id")?,
                arguments: opt_str(&t, "arguments")?,
                file_id: opt_i64(&t, "file_id")?,
                line: u32_or(&t, "line", 0)?,
                col: u32_or(&t, "col", 0)?,
            };
            Ok(this.batch.borrow_mut().stage_annotation(row))
        });

        // ---- resolution writes ----

        methods.add_method("insert_resolved_reference", |_, this, t: Table| {
            let row = NewResolvedReference {
                reference_id: req_i64(&t, "reference_id")?,
                target_symbol_id: req_i64(&t, "target_symbol_id")?,
                confidence: t.get::<_, Option<f64>>("confidence")?.unwrap_or(1.0),
                resolution_kind: tag(&t, "resolution_kind", ResolutionKind::parse)?,
            };
            Ok(this.batch.borrow_mut().stage_resolved_reference(row))
        });

        methods.add_method("insert_implementation", |_, this, t: Table| {
            let row = NewImplementation {
                type_symbol_id: req_i64(&t, "type_symbol_id")?,
                interface_symbol_id: req_i64(&t, "interface_symbol_id")?,
                kind: tag(&t, "kind", ImplKind::parse)?,
            };
            Ok(this.batch.borrow_mut().stage_implementation(row))
        });

        methods.add_method("insert_call_edge", |_, this, t: Table| {
            let row = NewCallEdge {
                caller_symbol_id: req_i64(&t, "caller_symbol_id")?,
                callee_symbol_id: req_i64(&t, "callee_symbol_id")?,
                file_id: opt_i64(&t, "file_id")?,
                line: u32_or(&t, "line", 0)?,
                col: u32_or(&t, "col", 0)?,
            };
            Ok(this.batch.borrow_mut().stage_call_edge(row))
        });

        methods.add_method("insert_reexport", |_, this, t: Table| {
            let row = NewReexport {
                file_id: req_i64(&t, "file_id")?,
                original_symbol_id: req_i64(&t, "original_symbol_id")?,
                exported_name: req_str(&t, "exported_name")?,
            };
            Ok(this.batch.borrow_mut().stage_reexport(row))
        });

        methods.add_method("insert_extension_binding", |_, this, t: Table| {
            let row = NewExtensionBinding {
                member_symbol_id: req_i64(&t, "member_symbol_id")?,
                extended_type_expr: req_str(&t, "extended_type_expr")?,
                extended_type_symbol_id: opt_i64(&t, "extended_type_symbol_id")?,
                kind: tag(&t, "kind", ExtensionKind::parse)?,
                constraints: opt_str(&t, "constraints")?,
                is_default_impl: bool_or(&t, "is_default_impl", false)?,
            };
            Ok(this.batch.borrow_mut().stage_extension_binding(row))
        });

        methods.add_method("insert_type_composition", |_, this, t: Table| {
            let row = NewTypeComposition {
                composite_symbol_id: req_i64(&t, "composite_symbol_id")?,
                component_symbol_id: req_i64(&t, "component_symbol_id")?,
                composition_kind: tag(&t, "composition_kind", CompositionKind::parse)?,
            };
            Ok(this.batch.borrow_mut().stage_type_composition(row))
        });

        // ---- resolve-phase reads ----

        methods.add_method("file_path", |_, this, file_id: i64| {
            let store = this.store()?;
            let file = store.borrow().file_by_id(file_id).map_err(ext_err)?;
            Ok(file.map(|f| f.path))
        });

        methods.add_method("symbol_by_id", |lua, this, id: i64| {
            let store = this.store()?;
            let sym = store.borrow().symbol_by_id(id).map_err(ext_err)?;
            sym.map(|s| symbol_table(lua, &s)).transpose()
        });

        methods.add_method("symbols_in_file", |lua, this, file_id: i64| {
            let store = this.store()?;
            let symbols = store.borrow().symbols_in_file(file_id).map_err(ext_err)?;
            symbols
                .iter()
                .map(|s| symbol_table(lua, s))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("symbols_named", |lua, this, name: String| {
            let store = this.store()?;
            let symbols = store.borrow().symbols_named(&name).map_err(ext_err)?;
            symbols
                .iter()
                .map(|s| symbol_table(lua, s))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("references_in_file", |lua, this, file_id: i64| {
            let store = this.store()?;
            let refs = store.borrow().references_in_file(file_id).map_err(ext_err)?;
            refs.iter()
                .map(|r| reference_table(lua, r))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("scopes_in_file", |lua, this, file_id: i64| {
            let store = this.store()?;
            let scopes = store.borrow().scopes_in_file(file_id).map_err(ext_err)?;
            scopes
                .iter()
                .map(|s| scope_table(lua, s))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("imports_of_file", |lua, this, file_id: i64| {
            let store = this.store()?;
            let imports = store.borrow().imports_of_file(file_id).map_err(ext_err)?;
            imports
                .iter()
                .map(|i| import_table(lua, i))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("type_members_of", |lua, this, symbol_id: i64| {
            let store = this.store()?;
            let members = store.borrow().type_members_of(symbol_id).map_err(ext_err)?;
            members
                .iter()
                .map(|m| member_table(lua, m))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("function_params_of", |lua, this, symbol_id: i64| {
            let store = this.store()?;
            let params = store
                .borrow()
                .function_params_of(symbol_id)
                .map_err(ext_err)?;
            params
                .iter()
                .map(|p| param_table(lua, p))
                .collect::<mlua::Result<Vec<_>>>()
        });

        methods.add_method("files_with_language", |lua, this, language: String| {
            let store = this.store()?;
            let files = store
                .borrow()
                .files_with_language(&language)
                .map_err(ext_err)?;
            files
                .iter()
                .map(|f| {
                    let t = lua.create_table()?;
                    t.set("id", f.id)?;
                    t.set("path", f.path.clone())?;
                    Ok(t)
                })
                .collect::<mlua::Result<Vec<_>>>()
        });

        // Module identifier of a file: extracted package symbol name, else
        // the file's canonical store path.
        methods.add_method("package_of_file", |_, this, file_id: i64| {
            let store = this.store()?;
            let store = store.borrow();
            if let Some(name) = store.module_source_of_file(file_id).map_err(ext_err)? {
                return Ok(Some(name));
            }
            Ok(store.file_by_id(file_id).map_err(ext_err)?.map(|f| f.path))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::file;

    fn lua_with_proxy(proxy: DbProxy) -> Lua {
        let lua = Lua::new();
        lua.globals().set("db", proxy).unwrap();
        lua
    }

    #[test]
    fn test_extraction_writes_stage_into_batch() {
        let batch = Rc::new(RefCell::new(RowBatch::new()));
        let lua = lua_with_proxy(DbProxy::for_extraction(Rc::clone(&batch)));

        lua.load(
            r#"
            local sym = db:insert_symbol({
                file_id = 1, name = "helper", kind = "function",
                visibility = "private",
                start_line = 2, start_col = 0, end_line = 2, end_col = 16,
            })
            assert(sym < 0)
            db:insert_function_param({
                symbol_id = sym, name = "count", ordinal = 0, type_expr = "int",
            })
            db:insert_reference({
                file_id = 1, name = "helper", context = "call",
                start_line = 4, start_col = 14, end_line = 4, end_col = 20,
            })
            "#,
        )
        .exec()
        .unwrap();

        let batch = batch.borrow();
        assert_eq!(batch.symbols.len(), 1);
        assert_eq!(batch.function_params.len(), 1);
        assert_eq!(batch.references.len(), 1);
        assert_eq!(batch.function_params[0].1.symbol_id, batch.symbols[0].0);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let batch = Rc::new(RefCell::new(RowBatch::new()));
        let lua = lua_with_proxy(DbProxy::for_extraction(batch));

        let result = lua
            .load(
                r#"
                db:insert_symbol({
                    file_id = 1, name = "x", kind = "blob",
                    start_line = 0, start_col = 0, end_line = 0, end_col = 1,
                })
                "#,
            )
            .exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_reads_unavailable_during_extraction() {
        let batch = Rc::new(RefCell::new(RowBatch::new()));
        let lua = lua_with_proxy(DbProxy::for_extraction(batch));
        assert!(lua.load("db:symbols_in_file(1)").exec().is_err());
    }

    #[test]
    fn test_resolution_reads() {
        let store = Store::open_in_memory().unwrap();
        let fid = file(&store, "pkg/a.go", "go");
        crate::store::test_support::symbol(
            &store,
            fid,
            "Greet",
            SymbolKind::Function,
            (0, 2),
        );
        let store = Rc::new(RefCell::new(store));
        let batch = Rc::new(RefCell::new(RowBatch::new()));
        let lua = lua_with_proxy(DbProxy::for_resolution(batch, store));
        lua.globals().set("fid", fid).unwrap();

        let (name, pkg): (String, String) = lua
            .load(
                r#"
                local syms = db:symbols_in_file(fid)
                return syms[1].name, db:package_of_file(fid)
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(name, "Greet");
        // No package symbol extracted, so the file path stands in.
        assert_eq!(pkg, "pkg/a.go");
    }
}
