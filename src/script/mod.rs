//! Script host: per-language Lua scripts over the CST and the store

pub mod assets;
pub mod dbproxy;
pub mod host;
pub mod node;

pub use assets::ScriptAssets;
pub use dbproxy::DbProxy;
pub use host::ScriptHost;
pub use node::ScriptNode;
