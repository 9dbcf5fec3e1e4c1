//! Language detection and tree-sitter grammar loading

use std::path::Path;

/// Supported programming languages with tree-sitter grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    TypeScript,
    JavaScript,
    Python,
    Rust,
    C,
    Cpp,
    Java,
    Php,
    Ruby,
}

/// All supported languages, in display order
pub const ALL_LANGUAGES: &[Language] = &[
    Language::Go,
    Language::TypeScript,
    Language::JavaScript,
    Language::Python,
    Language::Rust,
    Language::C,
    Language::Cpp,
    Language::Java,
    Language::Php,
    Language::Ruby,
];

impl Language {
    /// Detect language from file path; unknown extensions return None
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;

        match ext.to_lowercase().as_str() {
            "go" => Some(Language::Go),
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "c" | "h" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "hpp" | "hh" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "php" => Some(Language::Php),
            "rb" => Some(Language::Ruby),
            _ => None,
        }
    }

    /// Parse a language name as used in the store and on the CLI
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "go" => Some(Language::Go),
            "typescript" => Some(Language::TypeScript),
            "javascript" => Some(Language::JavaScript),
            "python" => Some(Language::Python),
            "rust" => Some(Language::Rust),
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "php" => Some(Language::Php),
            "ruby" => Some(Language::Ruby),
            _ => None,
        }
    }

    /// Get the language name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Php => "php",
            Language::Ruby => "ruby",
        }
    }

    /// Get the tree-sitter grammar for this language
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_path(Path::new("main.go")), Some(Language::Go));
        assert_eq!(
            Language::from_path(Path::new("app.tsx")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            Language::from_path(Path::new("mod.mjs")),
            Some(Language::JavaScript)
        );
        assert_eq!(
            Language::from_path(Path::new("lib.rs")),
            Some(Language::Rust)
        );
        assert_eq!(Language::from_path(Path::new("hdr.hpp")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("hdr.h")), Some(Language::C));
        assert_eq!(
            Language::from_path(Path::new("script.rb")),
            Some(Language::Ruby)
        );
        assert_eq!(Language::from_path(Path::new("unknown.xyz")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_name_roundtrip() {
        for lang in ALL_LANGUAGES {
            assert_eq!(Language::from_name(lang.as_str()), Some(*lang));
        }
        assert_eq!(Language::from_name("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_name("cobol"), None);
    }
}
