pub mod jacoco;

use std::collections::VecDeque;
use std::io::{self, BufReader, Read};

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::CovmapError;

/// Build a quick-xml reader configured the way every report parser expects:
/// whitespace-only text is dropped and namespaces are left unresolved.
pub(crate) fn xml_reader<R: Read>(input: R) -> Reader<BufReader<LineTracker<R>>> {
    let mut reader = Reader::from_reader(BufReader::new(LineTracker::new(input)));
    reader.trim_text(true);
    reader
}

/// Byte source that remembers where newlines were read, so byte offsets of
/// the parsed document translate into 1-based line/column in a single pass.
pub(crate) struct LineTracker<R> {
    inner: R,
    read: usize,
    newlines: VecDeque<usize>,
    line: u64,
    line_start: usize,
}

impl<R> LineTracker<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            read: 0,
            newlines: VecDeque::new(),
            line: 1,
            line_start: 0,
        }
    }

    /// Offsets must not decrease from one call to the next.
    pub(crate) fn locate(&mut self, offset: usize) -> (u64, u64) {
        while let Some(&newline) = self.newlines.front() {
            if newline >= offset {
                break;
            }
            self.newlines.pop_front();
            self.line += 1;
            self.line_start = newline + 1;
        }
        (self.line, offset.saturating_sub(self.line_start) as u64 + 1)
    }

    pub(crate) fn xml_err(&mut self, source: quick_xml::Error, offset: usize) -> CovmapError {
        let (line, column) = self.locate(offset);
        CovmapError::Xml {
            source,
            line,
            column,
        }
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let start = self.read;
        self.newlines.extend(
            buf[..n]
                .iter()
                .enumerate()
                .filter(|(_, &b)| b == b'\n')
                .map(|(i, _)| start + i),
        );
        self.read += n;
        Ok(n)
    }
}

/// Look up an attribute by name, unescaping its value.
pub(crate) fn get_attr(
    e: &BytesStart,
    name: &[u8],
) -> std::result::Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let mut tracker = LineTracker::new(&b"ab\ncd\n\nxyz"[..]);
        std::io::copy(&mut tracker, &mut std::io::sink()).unwrap();

        assert_eq!(tracker.locate(0), (1, 1));
        assert_eq!(tracker.locate(1), (1, 2));
        assert_eq!(tracker.locate(2), (1, 3));
        assert_eq!(tracker.locate(3), (2, 1));
        assert_eq!(tracker.locate(7), (4, 1));
        assert_eq!(tracker.locate(9), (4, 3));
    }

    #[test]
    fn test_locate_while_reading() {
        let mut tracker = LineTracker::new(&b"a\nb\nc"[..]);
        let mut chunk = [0u8; 2];

        assert_eq!(tracker.read(&mut chunk).unwrap(), 2);
        assert_eq!(tracker.locate(1), (1, 2));
        assert_eq!(tracker.read(&mut chunk).unwrap(), 2);
        assert_eq!(tracker.locate(2), (2, 1));
        assert_eq!(tracker.read(&mut chunk).unwrap(), 1);
        assert_eq!(tracker.locate(4), (3, 1));
    }
}
