//! Index command implementation

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::json;
use tracing::info;

use crate::cli::IndexArgs;
use crate::core::error::{Error, Result};
use crate::core::Project;
use crate::engine::{Engine, EngineOptions};
use crate::output::{json as json_out, OutputFormat};
use crate::parse::Language;
use crate::store::Store;

/// Run the index command. Returns the process exit code.
pub fn run(args: IndexArgs, db: Option<PathBuf>, format: OutputFormat) -> i32 {
    match run_inner(args, db, format) {
        Ok(code) => code,
        Err(e) => {
            match format {
                OutputFormat::Json => println!("{}", json_out::error_envelope("index", &e.to_string())),
                OutputFormat::Text => eprintln!("error: {}", e),
            }
            1
        }
    }
}

fn run_inner(args: IndexArgs, db: Option<PathBuf>, format: OutputFormat) -> Result<i32> {
    let project = match &args.path {
        Some(path) => Project::from_path(path)?,
        None => {
            let cwd = env::current_dir()?;
            Project::detect(&cwd)?
        }
    };
    info!(project = %project.name, root = %project.root.display(), "indexing");

    let languages = parse_language_filter(&args.languages)?;
    let options = EngineOptions {
        languages,
        scripts_dir: args.scripts_dir.clone(),
        force: args.force,
        parallel: args.parallel,
        workers: args.workers,
    };

    let db_path = db.unwrap_or_else(|| project.db_path());
    let store = Store::open(&db_path)?;
    let engine = Engine::new(store, project.root.clone(), options)?;

    let start = Instant::now();
    let report = engine.index_directory()?;
    let elapsed = start.elapsed();

    info!(
        indexed = report.indexed,
        unchanged = report.unchanged,
        failed = report.failed,
        resolved = report.resolved_files,
        elapsed_ms = elapsed.as_millis() as u64,
        "indexing complete"
    );

    match format {
        OutputFormat::Json => {
            let results = json!({
                "indexed": report.indexed,
                "unchanged": report.unchanged,
                "skipped": report.skipped,
                "failed": report.failed,
                "deleted": report.deleted,
                "resolved_files": report.resolved_files,
                "first_error": report.first_error,
                "elapsed_ms": elapsed.as_millis() as u64,
            });
            println!("{}", json_out::envelope("index", results));
        }
        OutputFormat::Text => {
            println!(
                "Indexed {} files ({} unchanged, {} failed) in {:.2}s; resolved {} files",
                report.indexed,
                report.unchanged,
                report.failed,
                elapsed.as_secs_f64(),
                report.resolved_files
            );
            if let Some(first_error) = &report.first_error {
                eprintln!("first error: {}", first_error);
            }
        }
    }

    // A run with failures still reports, but exits non-zero.
    Ok(if report.failed > 0 { 1 } else { 0 })
}

fn parse_language_filter(names: &[String]) -> Result<Option<HashSet<Language>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let mut out = HashSet::new();
    for name in names {
        let language = Language::from_name(name).ok_or_else(|| Error::InvalidArgument {
            message: format!("unknown language '{}'", name),
        })?;
        out.insert(language);
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_filter_parsing() {
        assert!(parse_language_filter(&[]).unwrap().is_none());

        let filter = parse_language_filter(&["go".to_string(), "rust".to_string()])
            .unwrap()
            .unwrap();
        assert!(filter.contains(&Language::Go));
        assert!(filter.contains(&Language::Rust));

        assert!(parse_language_filter(&["fortran".to_string()]).is_err());
    }
}
