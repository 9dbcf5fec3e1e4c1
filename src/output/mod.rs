//! Output formatting: the JSON envelope and pipeable text

pub mod json;
pub mod text;

/// Output format selected on the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Stable JSON envelope
    Json,
    /// Tabular text for pipelines
    Text,
}
