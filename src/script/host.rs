//! Lua script host
//!
//! One host per worker. The host owns the Lua runtime and the parser
//! bridge, registers the stable global environment (`parse`, `node_text`,
//! `query`, `db`, `log`, `check_cancelled`), and wires `require` so
//! cross-script imports resolve against the active script filesystem,
//! embedded or on disk.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use mlua::{Lua, Table, Value, Variadic};

use super::assets::ScriptAssets;
use super::dbproxy::DbProxy;
use super::node::ScriptNode;
use crate::core::error::{Error, Result};
use crate::core::CancelToken;
use crate::parse::{query_matches, Language, ParserBridge};
use crate::store::{RowBatch, Store};

/// Script execution environment
pub struct ScriptHost {
    lua: Lua,
    assets: ScriptAssets,
    root: PathBuf,
}

impl ScriptHost {
    /// Build a host rooted at the indexed tree, with the given script
    /// filesystem and cancellation token.
    pub fn new(assets: ScriptAssets, root: PathBuf, cancel: CancelToken) -> Result<Self> {
        let lua = Lua::new();
        let bridge = Rc::new(RefCell::new(ParserBridge::new()));

        register_preloads(&lua, &assets)?;
        register_globals(&lua, &bridge, root.clone(), cancel)?;

        Ok(Self { lua, assets, root })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Run a language's extraction script against one file.
    ///
    /// All writes stage into `batch`; nothing reaches the store here.
    pub fn run_extract(
        &self,
        language: Language,
        file_path: &str,
        file_id: i64,
        batch: Rc<RefCell<RowBatch>>,
    ) -> Result<()> {
        let logical = ScriptAssets::extract_path(language);
        let code = self.assets.read(&logical)?;

        let globals = self.lua.globals();
        globals.set("db", DbProxy::for_extraction(batch))?;
        globals.set("file_path", file_path)?;
        globals.set("file_id", file_id)?;
        globals.set("language", language.as_str())?;
        globals.set("files_to_resolve", Value::Nil)?;

        self.exec(&code, &logical)
    }

    /// Run a language's resolution script once.
    ///
    /// `files` is that language's share of the blast radius, surfaced to
    /// the script through the `files_to_resolve()` callback. Reads hit the
    /// main store; writes stage into `batch`.
    pub fn run_resolve(
        &self,
        language: Language,
        files: Vec<(i64, String)>,
        store: Rc<RefCell<Store>>,
        batch: Rc<RefCell<RowBatch>>,
    ) -> Result<()> {
        let logical = ScriptAssets::resolve_path(language);
        let code = self.assets.read(&logical)?;

        let globals = self.lua.globals();
        globals.set("db", DbProxy::for_resolution(batch, store))?;
        globals.set("language", language.as_str())?;
        globals.set("file_path", Value::Nil)?;
        globals.set("file_id", Value::Nil)?;

        let files_cb = self.lua.create_function(move |lua, _: Variadic<Value>| {
            let out = lua.create_table()?;
            for (i, (id, path)) in files.iter().enumerate() {
                let entry = lua.create_table()?;
                entry.set("id", *id)?;
                entry.set("path", path.clone())?;
                out.set(i + 1, entry)?;
            }
            Ok(out)
        })?;
        globals.set("files_to_resolve", files_cb)?;

        self.exec(&code, &logical)
    }

    fn exec(&self, code: &str, logical: &str) -> Result<()> {
        self.lua
            .load(code)
            .set_name(logical)
            .exec()
            .map_err(|e| Error::Script {
                script: logical.to_string(),
                message: e.to_string(),
            })
    }
}

/// Register every script in the active filesystem under `package.preload`,
/// keyed by both slash and dot forms, so `require("lib/util")` works the
/// same for embedded and disk trees.
fn register_preloads(lua: &Lua, assets: &ScriptAssets) -> Result<()> {
    let package: Table = lua.globals().get("package")?;
    let preload: Table = package.get("preload")?;

    for path in assets.all_paths() {
        let code = assets.read(&path)?;
        let chunk_name = path.clone();
        let loader = lua.create_function(move |lua, _: Variadic<Value>| {
            lua.load(code.as_str())
                .set_name(chunk_name.as_str())
                .eval::<Value>()
        })?;
        let module = path.trim_end_matches(".lua").to_string();
        preload.set(module.replace('/', "."), loader.clone())?;
        preload.set(module, loader)?;
    }
    Ok(())
}

fn register_globals(
    lua: &Lua,
    bridge: &Rc<RefCell<ParserBridge>>,
    root: PathBuf,
    cancel: CancelToken,
) -> Result<()> {
    let globals = lua.globals();

    // parse(path, language) -> root node. The host captures the source
    // bytes on the tree handle for later node_text calls.
    let parse_bridge = Rc::clone(bridge);
    let parse = lua.create_function(move |_, (path, lang): (String, String)| {
        let language = Language::from_name(&lang).ok_or_else(|| {
            mlua::Error::external(Error::InvalidArgument {
                message: format!("unsupported language '{}'", lang),
            })
        })?;
        let candidate = PathBuf::from(&path);
        let abs = if candidate.is_absolute() {
            candidate
        } else {
            root.join(&candidate)
        };
        let handle = parse_bridge
            .borrow_mut()
            .parse_file(&abs, language)
            .map_err(mlua::Error::external)?;
        Ok(ScriptNode::root(handle))
    })?;
    globals.set("parse", parse)?;

    // node_text(node) -> source text
    let node_text = lua.create_function(|_, node: ScriptNode| Ok(node.text()))?;
    globals.set("node_text", node_text)?;

    // query(pattern, node) -> { {capture_name = node, ...}, ... }
    let query_bridge = Rc::clone(bridge);
    let query = lua.create_function(move |_, (pattern, node): (String, ScriptNode)| {
        let language = node.handle().language;
        let compiled = query_bridge
            .borrow_mut()
            .compiled_query(language, &pattern)
            .map_err(mlua::Error::external)?;

        let matches = query_matches(&compiled, node.node(), &node.handle().source);
        let names = compiled.capture_names();
        let mut out = Vec::with_capacity(matches.len());
        for captures in matches {
            let mut map = std::collections::HashMap::new();
            for (idx, captured) in captures {
                map.insert(names[idx].to_string(), node.sibling_of(captured));
            }
            out.push(map);
        }
        Ok(out)
    })?;
    globals.set("query", query)?;

    // log.info / log.warn / log.error forward into tracing
    let log = lua.create_table()?;
    log.set(
        "info",
        lua.create_function(|_, msg: String| {
            tracing::info!(target: "canopy::script", "{}", msg);
            Ok(())
        })?,
    )?;
    log.set(
        "warn",
        lua.create_function(|_, msg: String| {
            tracing::warn!(target: "canopy::script", "{}", msg);
            Ok(())
        })?,
    )?;
    log.set(
        "error",
        lua.create_function(|_, msg: String| {
            tracing::error!(target: "canopy::script", "{}", msg);
            Ok(())
        })?,
    )?;
    globals.set("log", log)?;

    // check_cancelled() errors out of the script; the engine treats the
    // failure as file-skipped, not fatal.
    let check = lua.create_function(move |_, ()| {
        if cancel.is_cancelled() {
            Err(mlua::Error::external(Error::Cancelled))
        } else {
            Ok(())
        }
    })?;
    globals.set("check_cancelled", check)?;

    Ok(())
}
