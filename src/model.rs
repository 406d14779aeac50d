//! In-memory representation of a parsed JaCoCo report and of the per-line
//! measures handed to a coverage sink.

use serde::Serialize;

/// Counters of a single `<line>` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCoverage {
    pub number: u32,
    pub missed_instructions: u32,
    pub covered_instructions: u32,
    pub missed_branches: u32,
    pub covered_branches: u32,
}

impl LineCoverage {
    pub fn has_branches(&self) -> bool {
        self.missed_branches > 0 || self.covered_branches > 0
    }

    /// What a coverage sink records for this line.
    #[must_use]
    pub fn measure(&self) -> LineMeasure {
        if self.has_branches() {
            LineMeasure::Conditions {
                line: self.number,
                total: self.missed_branches + self.covered_branches,
                covered: self.covered_branches,
            }
        } else {
            LineMeasure::Hits {
                line: self.number,
                hits: u32::from(self.covered_instructions > 0),
            }
        }
    }
}

/// Coverage of one `<sourcefile>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceFileCoverage {
    /// Innermost enclosing `<group>`, present in aggregate reports.
    pub group_name: Option<String>,
    /// Slash-separated package path, e.g. `org/example`.
    pub package_name: String,
    pub file_name: String,
    pub lines: Vec<LineCoverage>,
}

impl SourceFileCoverage {
    pub fn new(group_name: Option<String>, package_name: String, file_name: String) -> Self {
        Self {
            group_name,
            package_name,
            file_name,
            lines: Vec::new(),
        }
    }

    /// `package/file`, or just the file name for the default package.
    pub fn path(&self) -> String {
        if self.package_name.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.package_name, self.file_name)
        }
    }

    pub fn measures(&self) -> Vec<LineMeasure> {
        self.lines.iter().map(LineCoverage::measure).collect()
    }
}

/// The complete result of parsing a single report, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedReport {
    pub files: Vec<SourceFileCoverage>,
}

impl ParsedReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_count(&self) -> usize {
        self.files.iter().map(|f| f.lines.len()).sum()
    }
}

/// Per-line record sent to a coverage sink. A line carries either a hit
/// count or branch counters, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LineMeasure {
    Hits { line: u32, hits: u32 },
    Conditions { line: u32, total: u32, covered: u32 },
}

impl LineMeasure {
    pub fn line(&self) -> u32 {
        match self {
            LineMeasure::Hits { line, .. } | LineMeasure::Conditions { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_prefers_branches() {
        let line = LineCoverage {
            number: 5,
            missed_branches: 1,
            covered_branches: 1,
            ..Default::default()
        };
        assert_eq!(
            line.measure(),
            LineMeasure::Conditions {
                line: 5,
                total: 2,
                covered: 1
            }
        );
    }

    #[test]
    fn test_measure_hits_is_binary() {
        let covered = LineCoverage {
            number: 6,
            covered_instructions: 2,
            ..Default::default()
        };
        assert_eq!(covered.measure(), LineMeasure::Hits { line: 6, hits: 1 });

        let missed = LineCoverage {
            number: 7,
            missed_instructions: 4,
            ..Default::default()
        };
        assert_eq!(missed.measure(), LineMeasure::Hits { line: 7, hits: 0 });
    }

    #[test]
    fn test_path_default_package() {
        let file = SourceFileCoverage::new(None, String::new(), "App.java".to_string());
        assert_eq!(file.path(), "App.java");

        let file = SourceFileCoverage::new(None, "org/example".to_string(), "App.java".to_string());
        assert_eq!(file.path(), "org/example/App.java");
    }
}
