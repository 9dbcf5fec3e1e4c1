//! Pipeable text output
//!
//! Positions render as `file:line:col`; lists render as aligned columns
//! with a trailing `Showing X of Y results` when paginated.

use crate::query::results::*;

/// Render a position as `file:line:col`
pub fn position(file: &str, line: u32, col: u32) -> String {
    format!("{}:{}:{}", file, line, col)
}

/// Align rows into padded columns
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut out = String::new();
    let render_row = |cells: &[String], widths: &[usize], out: &mut String| {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            if i + 1 == cells.len() {
                out.push_str(cell);
            } else {
                out.push_str(&format!("{:<width$}", cell, width = widths[i]));
            }
        }
        out.push('\n');
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    render_row(&header_cells, &widths, &mut out);
    for row in rows {
        render_row(row, &widths, &mut out);
    }
    out
}

/// Trailing pagination line when a page is smaller than the total
fn paging_footer(shown: usize, total: u64) -> String {
    if (shown as u64) < total {
        format!("Showing {} of {} results\n", shown, total)
    } else {
        String::new()
    }
}

pub fn render_locations(locations: &[Location]) -> String {
    if locations.is_empty() {
        return "no results\n".to_string();
    }
    let mut out = String::new();
    for loc in locations {
        out.push_str(&position(&loc.file, loc.start_line, loc.start_col));
        out.push('\n');
    }
    out
}

pub fn render_symbol(symbol: &SymbolResult) -> String {
    let file = symbol.file.as_deref().unwrap_or("<none>");
    format!(
        "{} {} {} {}\n",
        symbol.id,
        symbol.name,
        symbol.kind,
        position(file, symbol.start_line, symbol.start_col)
    )
}

pub fn render_symbols(symbols: &[SymbolResult], total: u64) -> String {
    if symbols.is_empty() {
        return "no results\n".to_string();
    }
    let rows: Vec<Vec<String>> = symbols
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.clone(),
                s.kind.clone(),
                s.visibility.clone().unwrap_or_default(),
                position(
                    s.file.as_deref().unwrap_or("<none>"),
                    s.start_line,
                    s.start_col,
                ),
                s.ref_count.to_string(),
            ]
        })
        .collect();
    let mut out = table(
        &["ID", "NAME", "KIND", "VISIBILITY", "POSITION", "REFS"],
        &rows,
    );
    out.push_str(&paging_footer(symbols.len(), total));
    out
}

pub fn render_call_edges(edges: &[CallEdgeResult]) -> String {
    if edges.is_empty() {
        return "no results\n".to_string();
    }
    let rows: Vec<Vec<String>> = edges
        .iter()
        .map(|e| {
            vec![
                format!("{} ({})", e.caller_name, e.caller_id),
                format!("{} ({})", e.callee_name, e.callee_id),
                position(e.file.as_deref().unwrap_or("<none>"), e.line, e.col),
            ]
        })
        .collect();
    table(&["CALLER", "CALLEE", "SITE"], &rows)
}

pub fn render_files(files: &[FileResult], total: u64) -> String {
    if files.is_empty() {
        return "no results\n".to_string();
    }
    let rows: Vec<Vec<String>> = files
        .iter()
        .map(|f| {
            vec![
                f.id.to_string(),
                f.path.clone(),
                f.language.clone(),
                f.last_indexed.clone(),
            ]
        })
        .collect();
    let mut out = table(&["ID", "PATH", "LANGUAGE", "INDEXED"], &rows);
    out.push_str(&paging_footer(files.len(), total));
    out
}

pub fn render_packages(packages: &[PackageResult], total: u64) -> String {
    if packages.is_empty() {
        return "no results\n".to_string();
    }
    let rows: Vec<Vec<String>> = packages
        .iter()
        .map(|p| vec![p.path.clone(), p.file_count.to_string()])
        .collect();
    let mut out = table(&["PACKAGE", "FILES"], &rows);
    out.push_str(&paging_footer(packages.len(), total));
    out
}

pub fn render_imports(imports: &[ImportResult]) -> String {
    if imports.is_empty() {
        return "no results\n".to_string();
    }
    let rows: Vec<Vec<String>> = imports
        .iter()
        .map(|i| {
            vec![
                i.file.clone(),
                i.source.clone(),
                i.kind.clone(),
                i.local_alias.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(&["FILE", "SOURCE", "KIND", "ALIAS"], &rows)
}

pub fn render_project_summary(summary: &ProjectSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} symbols across {} packages\n\n",
        summary.symbol_count, summary.package_count
    ));
    for (language, count) in &summary.files_by_language {
        out.push_str(&format!("{:<12} {} files\n", language, count));
    }
    if !summary.top_symbols.is_empty() {
        out.push_str("\nMost referenced:\n");
        for symbol in &summary.top_symbols {
            out.push_str(&format!(
                "  {:>5}  {} ({})\n",
                symbol.ref_count, symbol.name, symbol.kind
            ));
        }
    }
    out
}

pub fn render_package_summary(summary: &PackageSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} — {} files\n\n",
        summary.path, summary.file_count
    ));
    for (kind, count) in &summary.symbols_by_kind {
        out.push_str(&format!("{:<14} {}\n", kind, count));
    }
    if !summary.exported_symbols.is_empty() {
        out.push_str("\nExported:\n");
        for symbol in &summary.exported_symbols {
            out.push_str(&format!(
                "  {:>5}  {} ({})\n",
                symbol.ref_count, symbol.name, symbol.kind
            ));
        }
    }
    if !summary.dependencies.is_empty() {
        out.push_str("\nDepends on:\n");
        for dep in &summary.dependencies {
            out.push_str(&format!("  {}\n", dep));
        }
    }
    if !summary.dependents.is_empty() {
        out.push_str("\nImported by:\n");
        for dep in &summary.dependents {
            out.push_str(&format!("  {}\n", dep));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::Span;

    #[test]
    fn test_position_format() {
        assert_eq!(position("src/main.go", 3, 7), "src/main.go:3:7");
    }

    #[test]
    fn test_locations_render() {
        let locations = vec![Location::new(
            "a.go".to_string(),
            Span::new(1, 2, 1, 8),
            None,
        )];
        assert_eq!(render_locations(&locations), "a.go:1:2\n");
        assert_eq!(render_locations(&[]), "no results\n");
    }

    #[test]
    fn test_table_alignment_and_footer() {
        let symbols = vec![
            SymbolResult {
                id: 1,
                name: "short".to_string(),
                kind: "function".to_string(),
                visibility: Some("public".to_string()),
                modifiers: Vec::new(),
                file: Some("a.go".to_string()),
                start_line: 0,
                start_col: 0,
                end_line: 1,
                end_col: 0,
                ref_count: 3,
            },
            SymbolResult {
                id: 2,
                name: "much_longer_name".to_string(),
                kind: "struct".to_string(),
                visibility: None,
                modifiers: Vec::new(),
                file: Some("b.go".to_string()),
                start_line: 4,
                start_col: 2,
                end_line: 9,
                end_col: 0,
                ref_count: 0,
            },
        ];
        let out = render_symbols(&symbols, 10);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("ID"));
        // Both name cells start at the same column.
        let name_col = lines[1].find("short").unwrap();
        assert_eq!(lines[2].find("much_longer_name").unwrap(), name_col);
        assert_eq!(lines.last().unwrap(), &"Showing 2 of 10 results");
    }
}
