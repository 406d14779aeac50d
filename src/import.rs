//! Import of parsed reports into a coverage sink.
//!
//! Every failure below the report level is contained: a report that does not
//! parse is skipped, a file that cannot be resolved is skipped, and a file
//! the sink rejects is skipped. Only the summary tells the caller about them.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::inputs::{discover_inputs, InputFile};
use crate::locate::{FileResolver, LookupStrategy};
use crate::model::{LineMeasure, ParsedReport};
use crate::parsers::jacoco;
use crate::report_paths::ReportPathsProvider;

/// Receives per-line measures for every resolved file.
pub trait CoverageSink {
    fn save(&mut self, file: &InputFile, measures: &[LineMeasure]) -> Result<()>;
}

/// Sink that keeps everything in memory, in the order it was saved.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<(String, Vec<LineMeasure>)>,
}

impl CoverageSink for MemorySink {
    fn save(&mut self, file: &InputFile, measures: &[LineMeasure]) -> Result<()> {
        self.saved.push((file.relative_path().to_string(), measures.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Reports parsed successfully.
    pub reports: usize,
    /// Reports skipped because they could not be parsed.
    pub reports_failed: usize,
    /// Report paths that did not name a file.
    pub reports_missing: usize,
    pub files_imported: usize,
    pub files_unresolved: usize,
    pub files_failed: usize,
}

impl ImportSummary {
    fn absorb(&mut self, other: ImportSummary) {
        self.reports += other.reports;
        self.reports_failed += other.reports_failed;
        self.reports_missing += other.reports_missing;
        self.files_imported += other.files_imported;
        self.files_unresolved += other.files_unresolved;
        self.files_failed += other.files_failed;
    }
}

/// Forward an already parsed report.
pub fn import_parsed<S: LookupStrategy>(
    report: &ParsedReport,
    resolver: &FileResolver<S>,
    sink: &mut dyn CoverageSink,
) -> ImportSummary {
    let mut summary = ImportSummary {
        reports: 1,
        ..Default::default()
    };
    for file in &report.files {
        let group = file.group_name.as_deref();
        let Some(input) = resolver.resolve(group, &file.package_name, &file.file_name) else {
            debug!(group = group.unwrap_or(""), "File not found: {}", file.path());
            summary.files_unresolved += 1;
            continue;
        };
        match sink.save(input, &file.measures()) {
            Ok(()) => summary.files_imported += 1,
            Err(err) => {
                error!(file = %input, "Cannot import coverage information for file: {err}");
                summary.files_failed += 1;
            }
        }
    }
    summary
}

/// Parse `path` and forward it. A report that is missing or fails to parse
/// is logged and counted, never propagated.
pub fn import_report<S: LookupStrategy>(
    path: &Path,
    resolver: &FileResolver<S>,
    sink: &mut dyn CoverageSink,
) -> ImportSummary {
    if !path.is_file() {
        warn!("Report doesn't exist: '{}'", path.display());
        return ImportSummary {
            reports_missing: 1,
            ..Default::default()
        };
    }
    debug!("Reading report '{}'", path.display());
    match jacoco::parse_file(path) {
        Ok(report) => import_parsed(&report, resolver, sink),
        Err(err) => {
            error!(
                report = %path.display(),
                "Coverage report can't be loaded, report will be ignored: {err}"
            );
            ImportSummary {
                reports_failed: 1,
                ..Default::default()
            }
        }
    }
}

pub fn import_reports<S: LookupStrategy>(
    paths: &[PathBuf],
    resolver: &FileResolver<S>,
    sink: &mut dyn CoverageSink,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for path in paths {
        summary.absorb(import_report(path, resolver, sink));
    }
    summary
}

/// Per-module import: configured (or default) report paths, group labels
/// ignored.
pub fn import_module(config: &Config, sink: &mut dyn CoverageSink) -> Result<ImportSummary> {
    let paths = ReportPathsProvider::new(config).paths();
    if paths.is_empty() {
        info!("No report imported, no coverage information will be imported");
        return Ok(ImportSummary::default());
    }
    let resolver = FileResolver::new(discover_inputs(config)?);
    Ok(import_reports(&paths, &resolver, sink))
}

/// Aggregate import: the single aggregate report, with `<group>` names used
/// to pick between modules sharing a relative layout.
pub fn import_aggregate(config: &Config, sink: &mut dyn CoverageSink) -> Result<ImportSummary> {
    let Some(path) = ReportPathsProvider::new(config).aggregate_path() else {
        debug!("No aggregate report found, no coverage information will be imported");
        return Ok(ImportSummary::default());
    };
    info!("Importing aggregate report {}", path.display());
    let resolver = FileResolver::for_project(discover_inputs(config)?, config.project_index());
    Ok(import_report(&path, &resolver, sink))
}
