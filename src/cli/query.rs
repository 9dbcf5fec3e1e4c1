//! Query command implementation
//!
//! Opens the store read-only, dispatches to the QueryBuilder, and renders
//! the result in the selected format. Empty results are not errors; an
//! unknown file or symbol id yields an empty list.

use std::env;
use std::path::PathBuf;

use crate::cli::{QueryArgs, QueryCommand, SymbolFilterArgs, TargetArgs};
use crate::core::error::{Error, Result};
use crate::core::Project;
use crate::output::{json as json_out, text, OutputFormat};
use crate::query::{Page, QueryBuilder, Sort, SortOrder, SymbolFilter};
use crate::store::records::SymbolKind;
use crate::store::Store;

/// Run a query subcommand. Returns the process exit code.
pub fn run(args: QueryArgs, db: Option<PathBuf>, format: OutputFormat) -> i32 {
    let command = command_name(&args.command);
    match run_inner(args, db, format) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", json_out::error_envelope(command, &e.to_string()))
                }
                OutputFormat::Text => eprintln!("error: {}", e),
            }
            1
        }
    }
}

fn command_name(command: &QueryCommand) -> &'static str {
    match command {
        QueryCommand::SymbolAt { .. } => "symbol-at",
        QueryCommand::Definition { .. } => "definition",
        QueryCommand::References(_) => "references",
        QueryCommand::Callers(_) => "callers",
        QueryCommand::Callees(_) => "callees",
        QueryCommand::Implementations(_) => "implementations",
        QueryCommand::Symbols(_) => "symbols",
        QueryCommand::Search { .. } => "search",
        QueryCommand::Files { .. } => "files",
        QueryCommand::Packages { .. } => "packages",
        QueryCommand::Summary { .. } => "summary",
        QueryCommand::PackageSummary { .. } => "package-summary",
        QueryCommand::Deps { .. } => "deps",
        QueryCommand::Dependents { .. } => "dependents",
    }
}

fn run_inner(args: QueryArgs, db: Option<PathBuf>, format: OutputFormat) -> Result<String> {
    let (db_path, root) = match db {
        Some(path) => (path, None),
        None => {
            let cwd = env::current_dir()?;
            let project = Project::detect(&cwd)?;
            (project.db_path(), Some(project.root))
        }
    };

    let store = Store::open_read_only(&db_path)?;
    let mut query = QueryBuilder::new(&store);
    if let Some(root) = root {
        query = query.with_root(root);
    }

    let command = command_name(&args.command);
    let page = Page::new(args.limit, args.offset);
    let sort = Sort {
        field: args.sort.clone(),
        order: args.order.as_deref().and_then(SortOrder::parse),
    };

    let output = match &args.command {
        QueryCommand::SymbolAt { file, line, col } => {
            let result = query.symbol_at(file, *line, *col)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &result)),
                OutputFormat::Text => match &result {
                    Some(symbol) => text::render_symbol(symbol),
                    None => "no results\n".to_string(),
                },
            }
        }

        QueryCommand::Definition { file, line, col } => {
            let locations = query.definition_at(file, *line, *col)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &locations)),
                OutputFormat::Text => text::render_locations(&locations),
            }
        }

        QueryCommand::References(target) => {
            let locations = match resolve_target(&query, target)? {
                Some(symbol_id) => query.references_to(symbol_id)?,
                None => Vec::new(),
            };
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &locations)),
                OutputFormat::Text => text::render_locations(&locations),
            }
        }

        QueryCommand::Implementations(target) => {
            let locations = match resolve_target(&query, target)? {
                Some(symbol_id) => query.implementations(symbol_id)?,
                None => Vec::new(),
            };
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &locations)),
                OutputFormat::Text => text::render_locations(&locations),
            }
        }

        QueryCommand::Callers(target) => {
            let edges = match resolve_target(&query, target)? {
                Some(symbol_id) => query.callers(symbol_id)?,
                None => Vec::new(),
            };
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &edges)),
                OutputFormat::Text => text::render_call_edges(&edges),
            }
        }

        QueryCommand::Callees(target) => {
            let edges = match resolve_target(&query, target)? {
                Some(symbol_id) => query.callees(symbol_id)?,
                None => Vec::new(),
            };
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &edges)),
                OutputFormat::Text => text::render_call_edges(&edges),
            }
        }

        QueryCommand::Symbols(filter_args) => {
            let filter = build_filter(&query, filter_args)?;
            let result = query.symbols(&filter, &sort, page)?;
            match format {
                OutputFormat::Json => json_line(json_out::paged_envelope(
                    command,
                    &result.items,
                    result.total_count,
                )),
                OutputFormat::Text => text::render_symbols(&result.items, result.total_count),
            }
        }

        QueryCommand::Search { glob, filter } => {
            let filter = build_filter(&query, filter)?;
            let result = query.search_symbols(glob, &filter, &sort, page)?;
            match format {
                OutputFormat::Json => json_line(json_out::paged_envelope(
                    command,
                    &result.items,
                    result.total_count,
                )),
                OutputFormat::Text => text::render_symbols(&result.items, result.total_count),
            }
        }

        QueryCommand::Files {
            path_prefix,
            language,
        } => {
            let result = query.files(path_prefix.as_deref(), language.as_deref(), &sort, page)?;
            match format {
                OutputFormat::Json => json_line(json_out::paged_envelope(
                    command,
                    &result.items,
                    result.total_count,
                )),
                OutputFormat::Text => text::render_files(&result.items, result.total_count),
            }
        }

        QueryCommand::Packages { path_prefix } => {
            let result = query.packages(path_prefix.as_deref(), &sort, page)?;
            match format {
                OutputFormat::Json => json_line(json_out::paged_envelope(
                    command,
                    &result.items,
                    result.total_count,
                )),
                OutputFormat::Text => text::render_packages(&result.items, result.total_count),
            }
        }

        QueryCommand::Summary { top } => {
            let summary = query.project_summary(*top)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &summary)),
                OutputFormat::Text => text::render_project_summary(&summary),
            }
        }

        QueryCommand::PackageSummary { path } => {
            let summary = query.package_summary(path)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &summary)),
                OutputFormat::Text => text::render_package_summary(&summary),
            }
        }

        QueryCommand::Deps { file } => {
            let imports = query.dependencies(file)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &imports)),
                OutputFormat::Text => text::render_imports(&imports),
            }
        }

        QueryCommand::Dependents { source } => {
            let imports = query.dependents(source)?;
            match format {
                OutputFormat::Json => json_line(json_out::envelope(command, &imports)),
                OutputFormat::Text => text::render_imports(&imports),
            }
        }
    };

    Ok(output)
}

fn json_line(s: String) -> String {
    format!("{}\n", s)
}

/// Resolve a `--symbol <id>` or `<file> <line> <col>` target to a symbol id.
/// Unknown positions resolve to None, which renders as empty results.
fn resolve_target(query: &QueryBuilder, target: &TargetArgs) -> Result<Option<i64>> {
    if let Some(symbol_id) = target.symbol {
        return Ok(Some(symbol_id));
    }
    match (&target.file, target.line, target.col) {
        (Some(file), Some(line), Some(col)) => {
            Ok(query.symbol_at(file, line, col)?.map(|s| s.id))
        }
        _ => Err(Error::InvalidArgument {
            message: "expected either --symbol <id> or <file> <line> <col>".to_string(),
        }),
    }
}

fn build_filter(query: &QueryBuilder, args: &SymbolFilterArgs) -> Result<SymbolFilter> {
    let mut kinds = Vec::new();
    for raw in &args.kinds {
        let kind = SymbolKind::parse(raw).ok_or_else(|| Error::InvalidArgument {
            message: format!("unknown symbol kind '{}'", raw),
        })?;
        kinds.push(kind);
    }

    // An unindexed --file filter matches nothing rather than everything.
    let file_id = match &args.file {
        Some(path) => Some(query.file_id_of(path)?.unwrap_or(-1)),
        None => None,
    };

    Ok(SymbolFilter {
        kinds,
        visibility: args.visibility.clone(),
        modifiers: args.modifiers.clone(),
        file_id,
        parent_id: args.parent,
        path_prefix: args.path_prefix.clone(),
    })
}
