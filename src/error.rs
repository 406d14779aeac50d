use std::path::PathBuf;

use thiserror::Error;

/// Structural problem found while streaming a coverage report.
///
/// Fatal for the report being parsed, never for the whole import run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error(
        "Invalid report: couldn't find the attribute '{attribute}' for a '{element}' at line {line}, column {column}"
    )]
    MissingAttribute {
        element: String,
        attribute: String,
        line: u64,
        column: u64,
    },

    #[error(
        "Invalid report: failed to parse integer from the attribute '{attribute}' (value '{value}') for a '{element}' at line {line}, column {column}"
    )]
    InvalidInteger {
        element: String,
        attribute: String,
        value: String,
        line: u64,
        column: u64,
    },

    #[error(
        "Invalid report: expected to find '{element}' within a '{parent}' at line {line}, column {column}"
    )]
    MissingParent {
        element: String,
        parent: String,
        line: u64,
        column: u64,
    },

    #[error(
        "Invalid report: '{element}' cannot be nested within a '{enclosing}' at line {line}, column {column}"
    )]
    UnexpectedNesting {
        element: String,
        enclosing: String,
        line: u64,
        column: u64,
    },
}

impl ReportError {
    /// Name of the element the error was raised for.
    pub fn element(&self) -> &str {
        match self {
            ReportError::MissingAttribute { element, .. }
            | ReportError::InvalidInteger { element, .. }
            | ReportError::MissingParent { element, .. }
            | ReportError::UnexpectedNesting { element, .. } => element,
        }
    }

    /// Name of the offending attribute, when the error is about one.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ReportError::MissingAttribute { attribute, .. }
            | ReportError::InvalidInteger { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    /// 1-based `(line, column)` of the element in the document.
    pub fn location(&self) -> (u64, u64) {
        match self {
            ReportError::MissingAttribute { line, column, .. }
            | ReportError::InvalidInteger { line, column, .. }
            | ReportError::MissingParent { line, column, .. }
            | ReportError::UnexpectedNesting { line, column, .. } => (*line, *column),
        }
    }
}

#[derive(Error, Debug)]
pub enum CovmapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("XML parse error at line {line}, column {column}: {source}")]
    Xml {
        source: quick_xml::Error,
        line: u64,
        column: u64,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Line {line} is out of range for '{}' ({lines} lines)", path.display())]
    LineOutOfRange {
        path: PathBuf,
        line: u32,
        lines: usize,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CovmapError>;
