//! Lua node proxy over the CST
//!
//! Scripts traverse the tree through an opaque node value whose methods
//! mirror the tree-sitter node API. A node keeps its tree handle (tree +
//! source bytes) alive through a shared pointer, so slicing text and
//! walking parents never outlives the parse.

use std::rc::Rc;

use mlua::{FromLua, Lua, UserData, UserDataMethods, Value};
use tree_sitter::Node;

use crate::parse::TreeHandle;

/// An opaque CST node handed to scripts
#[derive(Clone)]
pub struct ScriptNode {
    handle: Rc<TreeHandle>,
    node: Node<'static>,
}

impl ScriptNode {
    /// Root node of a parsed tree
    pub fn root(handle: Rc<TreeHandle>) -> Self {
        let node = handle.tree.root_node();
        // Safety: the node borrows the TSTree allocation owned by `handle`,
        // which this value keeps alive; the Rust `Tree` wrapper moving does
        // not move the underlying allocation.
        let node = unsafe { std::mem::transmute::<Node<'_>, Node<'static>>(node) };
        Self { handle, node }
    }

    /// Wrap a node that belongs to the same tree as `self`
    pub fn sibling_of(&self, node: Node<'_>) -> Self {
        // Safety: same containment argument as `root`; callers only pass
        // nodes obtained from this value's own tree.
        let node = unsafe { std::mem::transmute::<Node<'_>, Node<'static>>(node) };
        Self {
            handle: Rc::clone(&self.handle),
            node,
        }
    }

    pub fn node(&self) -> Node<'static> {
        self.node
    }

    pub fn handle(&self) -> &Rc<TreeHandle> {
        &self.handle
    }

    /// Source text covered by this node
    pub fn text(&self) -> String {
        self.handle.node_text(self.node).to_string()
    }
}

impl<'lua> FromLua<'lua> for ScriptNode {
    fn from_lua(value: Value<'lua>, _lua: &'lua Lua) -> mlua::Result<Self> {
        match value {
            Value::UserData(ud) => Ok(ud.borrow::<Self>()?.clone()),
            other => Err(mlua::Error::FromLuaConversionError {
                from: other.type_name(),
                to: "ScriptNode",
                message: None,
            }),
        }
    }
}

fn point_table(lua: &mlua::Lua, point: tree_sitter::Point) -> mlua::Result<mlua::Table> {
    let t = lua.create_table()?;
    t.set("row", point.row as i64)?;
    t.set("col", point.column as i64)?;
    Ok(t)
}

impl UserData for ScriptNode {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        // `kind` and `type` are aliases; scripts ported from other hosts
        // use either name.
        methods.add_method("kind", |_, this, ()| Ok(this.node.kind().to_string()));
        methods.add_method("type", |_, this, ()| Ok(this.node.kind().to_string()));

        methods.add_method("is_named", |_, this, ()| Ok(this.node.is_named()));
        methods.add_method("has_error", |_, this, ()| Ok(this.node.has_error()));

        methods.add_method("child_count", |_, this, ()| Ok(this.node.child_count() as i64));
        methods.add_method("named_child_count", |_, this, ()| {
            Ok(this.node.named_child_count() as i64)
        });

        methods.add_method("child", |_, this, i: usize| {
            Ok(this.node.child(i).map(|n| this.sibling_of(n)))
        });
        methods.add_method("named_child", |_, this, i: usize| {
            Ok(this.node.named_child(i).map(|n| this.sibling_of(n)))
        });
        methods.add_method("child_by_field_name", |_, this, name: String| {
            Ok(this
                .node
                .child_by_field_name(name.as_bytes())
                .map(|n| this.sibling_of(n)))
        });

        methods.add_method("parent", |_, this, ()| {
            Ok(this.node.parent().map(|n| this.sibling_of(n)))
        });
        methods.add_method("next_sibling", |_, this, ()| {
            Ok(this.node.next_sibling().map(|n| this.sibling_of(n)))
        });
        methods.add_method("prev_sibling", |_, this, ()| {
            Ok(this.node.prev_sibling().map(|n| this.sibling_of(n)))
        });
        methods.add_method("next_named_sibling", |_, this, ()| {
            Ok(this.node.next_named_sibling().map(|n| this.sibling_of(n)))
        });

        methods.add_method("start_point", |lua, this, ()| {
            point_table(lua, this.node.start_position())
        });
        methods.add_method("end_point", |lua, this, ()| {
            point_table(lua, this.node.end_position())
        });
        methods.add_method("start_byte", |_, this, ()| Ok(this.node.start_byte() as i64));
        methods.add_method("end_byte", |_, this, ()| Ok(this.node.end_byte() as i64));

        methods.add_method("text", |_, this, ()| Ok(this.text()));
        methods.add_method("s_expr", |_, this, ()| Ok(this.node.to_sexp()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{Language, ParserBridge};
    use std::path::Path;

    fn parse_go(source: &str) -> ScriptNode {
        let mut bridge = ParserBridge::new();
        let handle = bridge
            .parse_source(source.as_bytes().to_vec(), Language::Go, Path::new("t.go"))
            .unwrap();
        ScriptNode::root(handle)
    }

    #[test]
    fn test_node_methods_via_lua() {
        let lua = mlua::Lua::new();
        let root = parse_go("package main\n\nfunc helper() {}\n");
        lua.globals().set("root", root).unwrap();

        let kind: String = lua.load("return root:kind()").eval().unwrap();
        assert_eq!(kind, "source_file");

        let fn_name: String = lua
            .load(
                r#"
                for i = 0, root:named_child_count() - 1 do
                    local child = root:named_child(i)
                    if child:kind() == "function_declaration" then
                        return child:child_by_field_name("name"):text()
                    end
                end
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(fn_name, "helper");
    }

    #[test]
    fn test_points_are_zero_based() {
        let lua = mlua::Lua::new();
        let root = parse_go("package main\nfunc f() {}\n");
        lua.globals().set("root", root).unwrap();

        let (row, col): (i64, i64) = lua
            .load(
                r#"
                local fn = root:named_child(1)
                local p = fn:start_point()
                return p.row, p.col
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((row, col), (1, 0));
    }

    #[test]
    fn test_parent_roundtrip() {
        let lua = mlua::Lua::new();
        let root = parse_go("package main\n");
        lua.globals().set("root", root).unwrap();

        let same: bool = lua
            .load("return root:named_child(0):parent():kind() == root:kind()")
            .eval()
            .unwrap();
        assert!(same);
    }
}
