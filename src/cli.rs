//! Command handler functions for the covmap CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rusqlite::Connection;

use crate::config::Config;
use crate::db::{self, SqliteSink};
use crate::import::{self, ImportSummary};
use crate::inputs::discover_inputs;
use crate::kotlin;
use crate::locate::FileResolver;
use crate::parsers::jacoco;
use crate::scan::WildcardScanner;

/// Output style for commands that can emit JSON.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

fn summary_text(summary: &ImportSummary) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Imported coverage for {} file(s) from {} report(s)",
        summary.files_imported, summary.reports
    )
    .unwrap();
    if summary.reports_failed > 0 {
        writeln!(out, "Skipped reports:    {}", summary.reports_failed).unwrap();
    }
    if summary.reports_missing > 0 {
        writeln!(out, "Missing reports:    {}", summary.reports_missing).unwrap();
    }
    if summary.files_unresolved > 0 {
        writeln!(out, "Unresolved files:   {}", summary.files_unresolved).unwrap();
    }
    if summary.files_failed > 0 {
        writeln!(out, "Failed files:       {}", summary.files_failed).unwrap();
    }
    out
}

pub fn cmd_import(conn: &mut Connection, config: &Config) -> Result<String> {
    let mut sink = SqliteSink::new(conn);
    let summary = import::import_module(config, &mut sink)?;
    Ok(summary_text(&summary))
}

pub fn cmd_aggregate(conn: &mut Connection, config: &Config) -> Result<String> {
    let mut sink = SqliteSink::new(conn);
    let summary = import::import_aggregate(config, &mut sink)?;
    Ok(summary_text(&summary))
}

pub fn cmd_parse(report: &Path, format: Format) -> Result<String> {
    let parsed = jacoco::parse_file(report)
        .with_context(|| format!("Failed to parse {}", report.display()))?;

    if let Format::Json = format {
        let mut out = serde_json::to_string_pretty(&parsed)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    for file in &parsed.files {
        let covered = file
            .lines
            .iter()
            .filter(|l| l.covered_instructions > 0)
            .count();
        if let Some(group) = &file.group_name {
            write!(out, "[{}] ", group).unwrap();
        }
        writeln!(
            out,
            "{}  ({}/{} lines covered)",
            file.path(),
            covered,
            file.lines.len()
        )
        .unwrap();
    }
    writeln!(
        out,
        "{} file(s), {} line(s)",
        parsed.files.len(),
        parsed.line_count()
    )
    .unwrap();
    Ok(out)
}

pub fn cmd_locate(
    config: &Config,
    group: Option<&str>,
    package: &str,
    file: &str,
) -> Result<String> {
    let inputs = discover_inputs(config)?;
    let found = match group {
        Some(_) => FileResolver::for_project(inputs, config.project_index())
            .resolve(group, package, file)
            .map(|f| f.relative_path().to_string()),
        None => FileResolver::new(inputs)
            .resolve(None, package, file)
            .map(|f| f.relative_path().to_string()),
    };
    Ok(match found {
        Some(path) => format!("{}\n", path),
        None if package.is_empty() => format!("No source file found for {}\n", file),
        None => format!("No source file found for {}/{}\n", package, file),
    })
}

pub fn cmd_scan(base: &Path, patterns: &[String]) -> Result<String> {
    let mut out = String::new();
    let mut errors = Vec::new();
    for pattern in patterns {
        for path in WildcardScanner::new(pattern).scan(base, |e| errors.push(e)) {
            writeln!(out, "{}", path.display()).unwrap();
        }
    }
    for error in &errors {
        writeln!(out, "error: {}", error).unwrap();
    }
    Ok(out)
}

pub fn cmd_package(source: &Path) -> Result<String> {
    let text = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    Ok(match kotlin::extract_package(&text) {
        Some(package) => format!("{}\n", package),
        None => "(default package)\n".to_string(),
    })
}

pub fn cmd_files(conn: &Connection, sort_by_coverage: bool, format: Format) -> Result<String> {
    let mut files = db::get_files(conn)?;

    if sort_by_coverage {
        files.sort_by(|a, b| a.line_rate().total_cmp(&b.line_rate()));
    }

    if let Format::Json = format {
        let mut out = serde_json::to_string_pretty(&files)?;
        out.push('\n');
        return Ok(out);
    }

    if files.is_empty() {
        return Ok("No coverage in database.\n".to_string());
    }

    let mut out = String::new();
    writeln!(
        out,
        "{:<60} {:<16} {:>8} {:>8} {:>8}",
        "FILE", "MODULE", "LINES", "COVERED", "RATE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(104)).unwrap();

    for f in &files {
        writeln!(
            out,
            "{:<60} {:<16} {:>8} {:>8} {:>7.1}%",
            f.path,
            f.module,
            f.total_lines,
            f.covered_lines,
            f.line_rate() * 100.0
        )
        .unwrap();
    }

    Ok(out)
}

pub fn cmd_lines(conn: &Connection, source_file: &str) -> Result<String> {
    let lines = db::get_lines(conn, source_file)?;

    let mut out = String::new();
    writeln!(out, "{:>6}  {:>6}  {:>9}", "LINE", "HITS", "BRANCHES").unwrap();
    for line in &lines {
        let hits = line.hits.map(|h| h.to_string()).unwrap_or_default();
        let branches = match (line.branches_covered, line.branches_total) {
            (Some(covered), Some(total)) => format!("{}/{}", covered, total),
            _ => String::new(),
        };
        writeln!(out, "{:>6}  {:>6}  {:>9}", line.line_number, hits, branches).unwrap();
    }
    Ok(out)
}
