//! Streaming parser for JaCoCo XML coverage reports.
//!
//! Only the line-level part of the report is read:
//!
//! ```text
//! <report name="...">
//!   <group name="module-a">              (aggregate reports only, may nest)
//!     <package name="org/example">
//!       <class .../>                     (ignored)
//!       <sourcefile name="Library.java">
//!         <line nr="5" mi="0" ci="3" mb="1" cb="1"/>
//!         <counter .../>                 (ignored)
//!       </sourcefile>
//!     </package>
//!   </group>
//! </report>
//! ```
//!
//! `nr` is mandatory on every `<line>`; `mi`/`ci`/`mb`/`cb` default to zero
//! when absent but must be integers when present. Any structural problem
//! aborts the parse of this report with a located `ReportError`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};

use super::{get_attr, xml_reader, LineTracker};
use crate::error::{CovmapError, ReportError, Result};
use crate::model::{LineCoverage, ParsedReport, SourceFileCoverage};

/// Parse the report at `path`, reading it incrementally.
pub fn parse_file(path: &Path) -> Result<ParsedReport> {
    parse_reader(File::open(path)?)
}

/// Parse JaCoCo XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<ParsedReport> {
    parse_reader(input)
}

/// Parse JaCoCo XML coverage data from any byte source.
pub fn parse_reader<R: Read>(input: R) -> Result<ParsedReport> {
    let mut xml = xml_reader(input);
    let mut buf = Vec::new();

    let mut report = ParsedReport::new();
    let mut seen_root = false;

    // Context: enclosing groups, current package, whether a sourcefile is open.
    let mut groups: Vec<String> = Vec::new();
    let mut current_package: Option<String> = None;
    let mut in_sourcefile = false;

    loop {
        let event = xml.read_event_into(&mut buf);
        let end_offset = xml.buffer_position();
        let self_closing = matches!(&event, Ok(Event::Empty(_)));
        let tracker = xml.get_mut().get_mut();
        match event {
            Err(e) => return Err(tracker.xml_err(e, end_offset)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                seen_root = true;
                // Point at the opening '<' rather than past the closing '>'.
                let tag_len = e.len() + if self_closing { 3 } else { 2 };
                let (line, column) = tracker.locate(end_offset.saturating_sub(tag_len));
                let at = Position { line, column };

                match e.name().as_ref() {
                    b"group" => {
                        if current_package.is_some() {
                            return Err(at.nesting("group", "package").into());
                        }
                        let name = required_attr(e, "group", "name", at)
                            .map_err(|err| wrap(err, tracker, end_offset))?;
                        if !self_closing {
                            groups.push(name);
                        }
                    }
                    b"package" => {
                        if current_package.is_some() {
                            return Err(at.nesting("package", "package").into());
                        }
                        let name = required_attr(e, "package", "name", at)
                            .map_err(|err| wrap(err, tracker, end_offset))?;
                        if !self_closing {
                            current_package = Some(name);
                        }
                    }
                    b"sourcefile" => {
                        let Some(package) = current_package.as_ref() else {
                            return Err(at.missing_parent("sourcefile", "package").into());
                        };
                        let name = required_attr(e, "sourcefile", "name", at)
                            .map_err(|err| wrap(err, tracker, end_offset))?;
                        if name.is_empty() {
                            return Err(at.missing_attr("sourcefile", "name").into());
                        }
                        report.files.push(SourceFileCoverage::new(
                            groups.last().cloned(),
                            package.clone(),
                            name,
                        ));
                        in_sourcefile = !self_closing;
                    }
                    b"line" => {
                        if !in_sourcefile {
                            return Err(at.missing_parent("line", "sourcefile").into());
                        }
                        let line =
                            parse_line(e, at).map_err(|err| wrap(err, tracker, end_offset))?;
                        if let Some(file) = report.files.last_mut() {
                            file.lines.push(line);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"group" => {
                    groups.pop();
                }
                b"package" => {
                    current_package = None;
                }
                b"sourcefile" => {
                    in_sourcefile = false;
                }
                _ => {}
            },
            // DOCTYPE declarations, processing instructions, comments and
            // text are irrelevant to the line model.
            Ok(_) => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(CovmapError::Other(
            "Invalid report: the document has no root element".to_string(),
        ));
    }

    Ok(report)
}

#[derive(Clone, Copy)]
struct Position {
    line: u64,
    column: u64,
}

impl Position {
    fn missing_attr(self, element: &str, attribute: &str) -> ReportError {
        ReportError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn invalid_int(self, element: &str, attribute: &str, value: String) -> ReportError {
        ReportError::InvalidInteger {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value,
            line: self.line,
            column: self.column,
        }
    }

    fn missing_parent(self, element: &str, parent: &str) -> ReportError {
        ReportError::MissingParent {
            element: element.to_string(),
            parent: parent.to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn nesting(self, element: &str, enclosing: &str) -> ReportError {
        ReportError::UnexpectedNesting {
            element: element.to_string(),
            enclosing: enclosing.to_string(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Attribute failures are either malformed XML or structural report errors.
enum AttrFailure {
    Xml(quick_xml::Error),
    Report(ReportError),
}

impl From<quick_xml::Error> for AttrFailure {
    fn from(e: quick_xml::Error) -> Self {
        AttrFailure::Xml(e)
    }
}

impl From<ReportError> for AttrFailure {
    fn from(e: ReportError) -> Self {
        AttrFailure::Report(e)
    }
}

fn wrap<R>(failure: AttrFailure, tracker: &mut LineTracker<R>, offset: usize) -> CovmapError {
    match failure {
        AttrFailure::Xml(e) => tracker.xml_err(e, offset),
        AttrFailure::Report(e) => e.into(),
    }
}

fn required_attr(
    e: &BytesStart,
    element: &str,
    attribute: &str,
    at: Position,
) -> std::result::Result<String, AttrFailure> {
    get_attr(e, attribute.as_bytes())?.ok_or_else(|| at.missing_attr(element, attribute).into())
}

fn int_attr(
    e: &BytesStart,
    attribute: &str,
    at: Position,
) -> std::result::Result<Option<u32>, AttrFailure> {
    match get_attr(e, attribute.as_bytes())? {
        None => Ok(None),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(at.invalid_int("line", attribute, value).into()),
        },
    }
}

fn parse_line(e: &BytesStart, at: Position) -> std::result::Result<LineCoverage, AttrFailure> {
    let number = int_attr(e, "nr", at)?.ok_or_else(|| at.missing_attr("line", "nr"))?;
    Ok(LineCoverage {
        number,
        missed_instructions: int_attr(e, "mi", at)?.unwrap_or(0),
        covered_instructions: int_attr(e, "ci", at)?.unwrap_or(0),
        missed_branches: int_attr(e, "mb", at)?.unwrap_or(0),
        covered_branches: int_attr(e, "cb", at)?.unwrap_or(0),
    })
}
