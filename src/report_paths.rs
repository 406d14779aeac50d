use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{Config, DEFAULT_REPORT_PATHS};
use crate::scan;

/// Locates the report files to import for a project.
pub struct ReportPathsProvider<'a> {
    config: &'a Config,
}

impl<'a> ReportPathsProvider<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Every file matched by the configured patterns, or the default
    /// locations that exist when nothing is configured. Deduplicated and
    /// sorted.
    ///
    /// A configured path without wildcards is kept even when it names no
    /// file, so the importer can report it as missing.
    pub fn paths(&self) -> Vec<PathBuf> {
        let base = self.config.base_dir();
        let mut found = BTreeSet::new();

        for pattern in &self.config.report_paths {
            let matches = scan::scan(&base, pattern);
            if !matches.is_empty() {
                found.extend(matches);
            } else if scan::is_wildcard(pattern) {
                info!(pattern = %pattern, "No coverage report matches the configured path");
            } else {
                found.insert(base.join(scan::to_unix_like_path(pattern)));
            }
        }

        if self.config.report_paths.is_empty() {
            found.extend(
                DEFAULT_REPORT_PATHS
                    .iter()
                    .map(|p| base.join(p))
                    .filter(|p| p.is_file()),
            );
        }

        debug!(count = found.len(), "Found coverage reports");
        found.into_iter().collect()
    }

    /// The aggregate report, if one is configured and exists.
    pub fn aggregate_path(&self) -> Option<PathBuf> {
        let Some(configured) = &self.config.aggregate_report_path else {
            debug!("No aggregate report path configured");
            return None;
        };
        let path = self.config.base_dir().join(configured);
        if path.is_file() {
            Some(path)
        } else {
            debug!(path = %path.display(), "Aggregate report does not exist");
            None
        }
    }
}
