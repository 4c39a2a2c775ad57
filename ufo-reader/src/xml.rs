//! Helpers shared by the plist and glif readers.

use std::fmt::Display;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Where in a source file something happened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from the start of the file
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
}

impl Position {
    pub(crate) fn locate(source: &[u8], offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = source[..offset].iter().filter(|b| **b == b'\n').count() + 1;
        Position { offset, line }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} (offset {})", self.line, self.offset)
    }
}

/// A quick-xml reader over an in-memory document that remembers where the
/// most recent event started.
pub(crate) struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
    source: &'a [u8],
    event_start: usize,
}

impl<'a> XmlReader<'a> {
    pub(crate) fn new(source: &'a [u8]) -> Self {
        XmlReader {
            reader: Reader::from_reader(source),
            source,
            event_start: 0,
        }
    }

    /// The position of the start of the last event returned.
    pub(crate) fn position(&self) -> Position {
        Position::locate(self.source, self.event_start)
    }

    pub(crate) fn read_event(&mut self) -> Result<Event<'a>, quick_xml::Error> {
        self.event_start = self.reader.buffer_position() as usize;
        self.reader.read_event()
    }

    /// Returns the next event that carries structure.
    ///
    /// Comments, processing instructions, the declaration, the doctype and
    /// whitespace-only text are skipped.
    pub(crate) fn next_significant(&mut self) -> Result<Event<'a>, quick_xml::Error> {
        loop {
            match self.read_event()? {
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => (),
                Event::Text(text) if is_whitespace(&text) => (),
                other => return Ok(other),
            }
        }
    }
}

pub(crate) fn is_whitespace(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}

pub(crate) fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// The unescaped attributes of one element.
#[derive(Debug, Default)]
pub(crate) struct Attributes(Vec<(Vec<u8>, String)>);

impl Attributes {
    pub(crate) fn read(start: &BytesStart) -> Result<Self, quick_xml::Error> {
        let mut out = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            out.push((attr.key.as_ref().to_vec(), value));
        }
        Ok(Attributes(out))
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key.as_bytes())
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_lines() {
        let src = b"a\nbb\nccc";
        assert_eq!(Position::locate(src, 0).line, 1);
        assert_eq!(Position::locate(src, 2).line, 2);
        assert_eq!(Position::locate(src, 7).line, 3);
        assert_eq!(Position::locate(src, 100).offset, src.len());
    }

    #[test]
    fn skip_insignificant() {
        let src = b"<?xml version=\"1.0\"?>\n<!-- hi -->\n  <a/>";
        let mut reader = XmlReader::new(src);
        match reader.next_significant().unwrap() {
            Event::Empty(start) => assert_eq!(element_name(&start), "a"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(reader.position().line, 3);
    }
}
