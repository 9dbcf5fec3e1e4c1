//! Script asset loading
//!
//! Per-language scripts live in a logical tree (`extract/<lang>.lua`,
//! `resolve/<lang>.lua`, `lib/*.lua`). The tree is embedded into the
//! binary at build time; `--scripts-dir` swaps in a disk directory, and
//! cross-script `require` resolves against whichever tree is active.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use walkdir::WalkDir;

use crate::core::error::{Error, Result};
use crate::parse::Language;

/// Embedded script tree, keyed by logical path
static EMBEDDED: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("lib/util.lua", include_str!("../../scripts/lib/util.lua"));
    m.insert(
        "lib/resolve_common.lua",
        include_str!("../../scripts/lib/resolve_common.lua"),
    );
    m.insert("extract/go.lua", include_str!("../../scripts/extract/go.lua"));
    m.insert(
        "extract/typescript.lua",
        include_str!("../../scripts/extract/typescript.lua"),
    );
    m.insert(
        "extract/javascript.lua",
        include_str!("../../scripts/extract/javascript.lua"),
    );
    m.insert(
        "extract/python.lua",
        include_str!("../../scripts/extract/python.lua"),
    );
    m.insert("extract/rust.lua", include_str!("../../scripts/extract/rust.lua"));
    m.insert("extract/c.lua", include_str!("../../scripts/extract/c.lua"));
    m.insert("extract/cpp.lua", include_str!("../../scripts/extract/cpp.lua"));
    m.insert("extract/java.lua", include_str!("../../scripts/extract/java.lua"));
    m.insert("extract/php.lua", include_str!("../../scripts/extract/php.lua"));
    m.insert("extract/ruby.lua", include_str!("../../scripts/extract/ruby.lua"));
    m.insert("resolve/go.lua", include_str!("../../scripts/resolve/go.lua"));
    m.insert(
        "resolve/typescript.lua",
        include_str!("../../scripts/resolve/typescript.lua"),
    );
    m.insert(
        "resolve/javascript.lua",
        include_str!("../../scripts/resolve/javascript.lua"),
    );
    m.insert(
        "resolve/python.lua",
        include_str!("../../scripts/resolve/python.lua"),
    );
    m.insert("resolve/rust.lua", include_str!("../../scripts/resolve/rust.lua"));
    m.insert("resolve/c.lua", include_str!("../../scripts/resolve/c.lua"));
    m.insert("resolve/cpp.lua", include_str!("../../scripts/resolve/cpp.lua"));
    m.insert("resolve/java.lua", include_str!("../../scripts/resolve/java.lua"));
    m.insert("resolve/php.lua", include_str!("../../scripts/resolve/php.lua"));
    m.insert("resolve/ruby.lua", include_str!("../../scripts/resolve/ruby.lua"));
    m
});

/// Where scripts are read from
#[derive(Debug, Clone)]
enum AssetSource {
    Embedded,
    Disk(PathBuf),
}

/// The active script filesystem
#[derive(Debug, Clone)]
pub struct ScriptAssets {
    source: AssetSource,
}

impl ScriptAssets {
    /// Scripts compiled into the binary
    pub fn embedded() -> Self {
        Self {
            source: AssetSource::Embedded,
        }
    }

    /// Scripts loaded from a disk directory (the `--scripts-dir` override)
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::NotFound {
                what: format!("scripts directory {}", dir.display()),
            });
        }
        Ok(Self {
            source: AssetSource::Disk(dir.to_path_buf()),
        })
    }

    /// Logical path of a language's extraction script
    pub fn extract_path(language: Language) -> String {
        format!("extract/{}.lua", language)
    }

    /// Logical path of a language's resolution script
    pub fn resolve_path(language: Language) -> String {
        format!("resolve/{}.lua", language)
    }

    /// Read a script by logical path
    pub fn read(&self, logical: &str) -> Result<String> {
        match &self.source {
            AssetSource::Embedded => EMBEDDED
                .get(logical)
                .map(|s| s.to_string())
                .ok_or_else(|| Error::NotFound {
                    what: format!("embedded script {}", logical),
                }),
            AssetSource::Disk(dir) => {
                let path = dir.join(logical);
                std::fs::read_to_string(&path).map_err(|_| Error::NotFound {
                    what: format!("script {}", path.display()),
                })
            }
        }
    }

    /// All logical script paths in the active tree
    pub fn all_paths(&self) -> Vec<String> {
        match &self.source {
            AssetSource::Embedded => {
                let mut paths: Vec<String> = EMBEDDED.keys().map(|k| k.to_string()).collect();
                paths.sort();
                paths
            }
            AssetSource::Disk(dir) => {
                let mut paths = Vec::new();
                for entry in WalkDir::new(dir).into_iter().flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e == "lua") {
                        if let Ok(rel) = path.strip_prefix(dir) {
                            paths.push(rel.to_string_lossy().replace('\\', "/"));
                        }
                    }
                }
                paths.sort();
                paths
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_covers_every_language() {
        let assets = ScriptAssets::embedded();
        for lang in crate::parse::ALL_LANGUAGES {
            assert!(
                assets.read(&ScriptAssets::extract_path(*lang)).is_ok(),
                "missing extract script for {}",
                lang
            );
            assert!(
                assets.read(&ScriptAssets::resolve_path(*lang)).is_ok(),
                "missing resolve script for {}",
                lang
            );
        }
    }

    #[test]
    fn test_missing_embedded_script() {
        let assets = ScriptAssets::embedded();
        assert!(assets.read("extract/cobol.lua").is_err());
    }

    #[test]
    fn test_disk_tree_override() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("extract")).unwrap();
        std::fs::write(temp.path().join("extract/go.lua"), "-- custom").unwrap();

        let assets = ScriptAssets::from_dir(temp.path()).unwrap();
        assert_eq!(assets.read("extract/go.lua").unwrap(), "-- custom");
        assert!(assets.read("extract/rust.lua").is_err());
        assert_eq!(assets.all_paths(), vec!["extract/go.lua".to_string()]);
    }
}
