//! CLI command definitions and handlers

pub mod index;
pub mod query;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Blue.on_default())
}

/// Scope-aware semantic code analysis over a relational index
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = styles())]
pub struct Cli {
    /// Path to the index database (default: .canopy/index.db under the repo root)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a directory tree
    Index(IndexArgs),

    /// Query the index
    Query(QueryArgs),
}

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory to index (defaults to the detected repo root)
    pub path: Option<PathBuf>,

    /// Re-extract files even when unchanged
    #[arg(long)]
    pub force: bool,

    /// Only index these languages (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Load extraction/resolution scripts from a directory instead of the
    /// embedded tree
    #[arg(long)]
    pub scripts_dir: Option<PathBuf>,

    /// Extract files in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for parallel extraction (default: CPU count)
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Arguments shared by all query subcommands
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Maximum results per page
    #[arg(long, global = true, default_value_t = 50)]
    pub limit: u32,

    /// Results to skip
    #[arg(long, global = true, default_value_t = 0)]
    pub offset: u32,

    /// Sort field (falls back to the query's default)
    #[arg(long, global = true)]
    pub sort: Option<String>,

    /// Sort order: asc or desc
    #[arg(long, global = true)]
    pub order: Option<String>,

    #[command(subcommand)]
    pub command: QueryCommand,
}

/// Either a position or an explicit symbol id
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// File path (with LINE and COL)
    pub file: Option<String>,
    /// 0-based line
    pub line: Option<u32>,
    /// 0-based column
    pub col: Option<u32>,

    /// Symbol id instead of a position
    #[arg(long, conflicts_with_all = ["file", "line", "col"])]
    pub symbol: Option<i64>,
}

/// Symbol discovery filters
#[derive(Args, Debug, Default)]
pub struct SymbolFilterArgs {
    /// Filter by kind (repeatable)
    #[arg(long = "kind")]
    pub kinds: Vec<String>,

    /// Filter by visibility
    #[arg(long)]
    pub visibility: Option<String>,

    /// Require a modifier token (repeatable, all required)
    #[arg(long = "modifier")]
    pub modifiers: Vec<String>,

    /// Restrict to a file path
    #[arg(long)]
    pub file: Option<String>,

    /// Restrict to children of a symbol id
    #[arg(long)]
    pub parent: Option<i64>,

    /// Restrict to files under a path prefix
    #[arg(long)]
    pub path_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Narrowest symbol at a position
    SymbolAt {
        file: String,
        line: u32,
        col: u32,
    },

    /// Definitions of the reference at a position
    Definition {
        file: String,
        line: u32,
        col: u32,
    },

    /// References resolved to a symbol
    References(TargetArgs),

    /// Call-graph edges into a symbol
    Callers(TargetArgs),

    /// Call-graph edges out of a symbol
    Callees(TargetArgs),

    /// Types implementing an interface
    Implementations(TargetArgs),

    /// List symbols with filters
    Symbols(SymbolFilterArgs),

    /// Glob search over symbol names (* is the wildcard)
    Search {
        glob: String,

        #[command(flatten)]
        filter: SymbolFilterArgs,
    },

    /// List indexed files
    Files {
        /// Restrict to paths under a prefix
        #[arg(long)]
        path_prefix: Option<String>,

        /// Restrict to a language
        #[arg(long)]
        language: Option<String>,
    },

    /// List packages (directories of indexed files)
    Packages {
        #[arg(long)]
        path_prefix: Option<String>,
    },

    /// Project-wide summary
    Summary {
        /// How many top-referenced symbols to include
        #[arg(long, default_value_t = 10)]
        top: u32,
    },

    /// Summary of one package
    PackageSummary { path: String },

    /// Imports of a file
    Deps { file: String },

    /// Files importing a source (exact or path-suffix match)
    Dependents { source: String },
}
