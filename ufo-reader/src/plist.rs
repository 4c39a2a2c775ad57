//! The XML property list dialect used by every `.plist` file in a package
//! and by the `<lib>` element of glyph files.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use data_encoding::BASE64;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::xml::{element_name, is_whitespace, Position, XmlReader};

/// A plist dictionary. Key order is preserved.
pub type Dictionary = IndexMap<String, Plist>;

/// An array of plist values
pub type Array = Vec<Plist>;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
"#;

/// An enum representing a property list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plist {
    Dictionary(Dictionary),
    Array(Array),
    String(String),
    Integer(i64),
    Real(OrderedFloat<f64>),
    Boolean(bool),
    Date(DateTime<Utc>),
    Data(Vec<u8>),
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum PlistError {
    #[error("XML error at {position}: {source}")]
    Xml {
        position: Position,
        #[source]
        source: quick_xml::Error,
    },
    #[error("document is not UTF-8 at {position}")]
    NotUtf8 { position: Position },
    #[error("unexpected element <{name}> at {position}")]
    UnexpectedElement { name: String, position: Position },
    #[error("unexpected text at {position}")]
    UnexpectedText { position: Position },
    #[error("unexpected end of document at {position}")]
    UnexpectedEof { position: Position },
    #[error("content after the end of the plist at {position}")]
    TrailingContent { position: Position },
    #[error("duplicate key '{key}' at {position}")]
    DuplicateKey { key: String, position: Position },
    #[error("key '{key}' has no value at {position}")]
    MissingValue { key: String, position: Position },
    #[error("invalid <{kind}> value '{value}' at {position}")]
    BadValue {
        kind: &'static str,
        value: String,
        position: Position,
    },
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{key}': expected {expected}, found {found}")]
    UnexpectedFieldType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl PlistError {
    /// Where in the source the problem was found, if it came from decoding.
    pub fn position(&self) -> Option<Position> {
        match self {
            PlistError::Xml { position, .. }
            | PlistError::NotUtf8 { position }
            | PlistError::UnexpectedElement { position, .. }
            | PlistError::UnexpectedText { position }
            | PlistError::UnexpectedEof { position }
            | PlistError::TrailingContent { position }
            | PlistError::DuplicateKey { position, .. }
            | PlistError::MissingValue { position, .. }
            | PlistError::BadValue { position, .. } => Some(*position),
            PlistError::UnexpectedType { .. } | PlistError::UnexpectedFieldType { .. } => None,
        }
    }
}

impl Plist {
    /// Decode a complete plist document.
    pub fn parse(bytes: &[u8]) -> Result<Plist, PlistError> {
        let mut reader = XmlReader::new(bytes);
        loop {
            match reader.next_significant().map_err(|e| xml_error(&reader, e))? {
                Event::Start(start) if start.name().as_ref() == b"plist" => break,
                Event::Start(start) | Event::Empty(start) => {
                    return Err(unexpected_element(&reader, &start))
                }
                Event::Eof => {
                    return Err(PlistError::UnexpectedEof {
                        position: reader.position(),
                    })
                }
                _ => {
                    return Err(PlistError::UnexpectedText {
                        position: reader.position(),
                    })
                }
            }
        }
        let value = match reader.next_significant().map_err(|e| xml_error(&reader, e))? {
            Event::Start(start) => read_value(&mut reader, &start, false)?,
            Event::Empty(start) => read_value(&mut reader, &start, true)?,
            Event::Eof => {
                return Err(PlistError::UnexpectedEof {
                    position: reader.position(),
                })
            }
            _ => {
                return Err(PlistError::UnexpectedText {
                    position: reader.position(),
                })
            }
        };
        match reader.next_significant().map_err(|e| xml_error(&reader, e))? {
            Event::End(end) if end.name().as_ref() == b"plist" => (),
            Event::Eof => {
                return Err(PlistError::UnexpectedEof {
                    position: reader.position(),
                })
            }
            _ => {
                return Err(PlistError::TrailingContent {
                    position: reader.position(),
                })
            }
        }
        match reader.next_significant().map_err(|e| xml_error(&reader, e))? {
            Event::Eof => Ok(value),
            _ => Err(PlistError::TrailingContent {
                position: reader.position(),
            }),
        }
    }

    /// Decode a document whose root value must be a dictionary.
    pub fn parse_dict(bytes: &[u8]) -> Result<Dictionary, PlistError> {
        Plist::parse(bytes)?.expect_dict()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plist::Array(..) => "array",
            Plist::Dictionary(..) => "dictionary",
            Plist::Real(..) => "real",
            Plist::Integer(..) => "integer",
            Plist::String(..) => "string",
            Plist::Boolean(..) => "boolean",
            Plist::Date(..) => "date",
            Plist::Data(..) => "data",
        }
    }

    pub fn get(&self, key: &str) -> Option<&Plist> {
        match self {
            Plist::Dictionary(d) => d.get(key),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Plist::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Plist]> {
        match self {
            Plist::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Plist::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Plist::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Plist::Integer(i) => Some(*i as f64),
            Plist::Real(f) => Some((*f).into_inner()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Plist::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn expect_dict(self) -> Result<Dictionary, PlistError> {
        match self {
            Plist::Dictionary(dict) => Ok(dict),
            other => Err(PlistError::UnexpectedType {
                expected: "dictionary",
                found: other.name(),
            }),
        }
    }

    pub fn expect_array(self) -> Result<Array, PlistError> {
        match self {
            Plist::Array(array) => Ok(array),
            other => Err(PlistError::UnexpectedType {
                expected: "array",
                found: other.name(),
            }),
        }
    }

    pub fn expect_string(self) -> Result<String, PlistError> {
        match self {
            Plist::String(string) => Ok(string),
            other => Err(PlistError::UnexpectedType {
                expected: "string",
                found: other.name(),
            }),
        }
    }

    /// Encode as a complete XML plist document.
    pub fn to_xml(&self) -> String {
        let mut s = String::from(HEADER);
        self.push_xml(&mut s, 0);
        s.push_str("</plist>\n");
        s
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    fn push_xml(&self, s: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        match self {
            Plist::Dictionary(dict) if dict.is_empty() => {
                let _ = writeln!(s, "{indent}<dict/>");
            }
            Plist::Dictionary(dict) => {
                let _ = writeln!(s, "{indent}<dict>");
                for (key, value) in dict {
                    let _ = writeln!(s, "{indent}\t<key>{}</key>", escape(key));
                    value.push_xml(s, depth + 1);
                }
                let _ = writeln!(s, "{indent}</dict>");
            }
            Plist::Array(array) if array.is_empty() => {
                let _ = writeln!(s, "{indent}<array/>");
            }
            Plist::Array(array) => {
                let _ = writeln!(s, "{indent}<array>");
                for value in array {
                    value.push_xml(s, depth + 1);
                }
                let _ = writeln!(s, "{indent}</array>");
            }
            Plist::String(string) => {
                let _ = writeln!(s, "{indent}<string>{}</string>", escape(string));
            }
            Plist::Integer(i) => {
                let _ = writeln!(s, "{indent}<integer>{i}</integer>");
            }
            // debug formatting keeps a trailing '.0' on integral values
            Plist::Real(f) => {
                let _ = writeln!(s, "{indent}<real>{:?}</real>", f.into_inner());
            }
            Plist::Boolean(true) => {
                let _ = writeln!(s, "{indent}<true/>");
            }
            Plist::Boolean(false) => {
                let _ = writeln!(s, "{indent}<false/>");
            }
            Plist::Date(date) => {
                let _ = writeln!(s, "{indent}<date>{}</date>", date.format(DATE_FORMAT));
            }
            Plist::Data(data) => {
                let _ = writeln!(s, "{indent}<data>{}</data>", BASE64.encode(data));
            }
        }
    }
}

fn escape(s: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::partial_escape(s)
}

fn xml_error(reader: &XmlReader, source: quick_xml::Error) -> PlistError {
    PlistError::Xml {
        position: reader.position(),
        source,
    }
}

fn unexpected_element(reader: &XmlReader, start: &BytesStart) -> PlistError {
    PlistError::UnexpectedElement {
        name: element_name(start),
        position: reader.position(),
    }
}

/// Read one value whose opening tag has just been consumed.
///
/// `empty` is true for self-closing tags. This is shared with the glif
/// reader, which hands over its reader when it reaches a `<lib>`.
pub(crate) fn read_value(
    reader: &mut XmlReader,
    start: &BytesStart,
    empty: bool,
) -> Result<Plist, PlistError> {
    let position = reader.position();
    let name = start.name();
    let value = match name.as_ref() {
        b"dict" if empty => Plist::Dictionary(Dictionary::new()),
        b"dict" => Plist::Dictionary(read_dict(reader)?),
        b"array" if empty => Plist::Array(Array::new()),
        b"array" => Plist::Array(read_array(reader)?),
        b"true" | b"false" => {
            if !empty {
                expect_end(reader, name.as_ref())?;
            }
            Plist::Boolean(name.as_ref() == b"true")
        }
        b"string" if empty => Plist::String(String::new()),
        b"string" => Plist::String(read_text(reader, b"string")?),
        b"data" if empty => Plist::Data(Vec::new()),
        b"data" => {
            let text = read_text(reader, b"data")?;
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let data = BASE64
                .decode(compact.as_bytes())
                .map_err(|_| PlistError::BadValue {
                    kind: "data",
                    value: text.clone(),
                    position,
                })?;
            Plist::Data(data)
        }
        b"integer" | b"real" | b"date" => {
            let text = if empty {
                String::new()
            } else {
                read_text(reader, name.as_ref())?
            };
            parse_scalar(name.as_ref(), &text, position)?
        }
        _ => return Err(unexpected_element(reader, start)),
    };
    Ok(value)
}

fn parse_scalar(kind: &[u8], text: &str, position: Position) -> Result<Plist, PlistError> {
    let trimmed = text.trim();
    let (kind, parsed) = match kind {
        b"integer" => {
            let parsed = match trimmed.strip_prefix("0x") {
                Some(hex) => i64::from_str_radix(hex, 16).ok(),
                None => trimmed.parse::<i64>().ok(),
            };
            ("integer", parsed.map(Plist::Integer))
        }
        b"real" => (
            "real",
            trimmed
                .parse::<f64>()
                .ok()
                .map(|f| Plist::Real(OrderedFloat(f))),
        ),
        _ => (
            "date",
            NaiveDateTime::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .map(|d| Plist::Date(d.and_utc())),
        ),
    };
    parsed.ok_or_else(|| PlistError::BadValue {
        kind,
        value: text.to_string(),
        position,
    })
}

fn read_dict(reader: &mut XmlReader) -> Result<Dictionary, PlistError> {
    let mut dict = Dictionary::new();
    loop {
        let event = reader.next_significant().map_err(|e| xml_error(reader, e))?;
        let key_position = reader.position();
        let key = match event {
            Event::End(end) if end.name().as_ref() == b"dict" => return Ok(dict),
            Event::Start(start) if start.name().as_ref() == b"key" => read_text(reader, b"key")?,
            Event::Empty(start) if start.name().as_ref() == b"key" => String::new(),
            Event::Start(start) | Event::Empty(start) => {
                return Err(unexpected_element(reader, &start))
            }
            Event::Eof => {
                return Err(PlistError::UnexpectedEof {
                    position: reader.position(),
                })
            }
            _ => {
                return Err(PlistError::UnexpectedText {
                    position: reader.position(),
                })
            }
        };
        let value = match reader.next_significant().map_err(|e| xml_error(reader, e))? {
            Event::Start(start) if start.name().as_ref() != b"key" => {
                read_value(reader, &start, false)?
            }
            Event::Empty(start) if start.name().as_ref() != b"key" => {
                read_value(reader, &start, true)?
            }
            _ => {
                return Err(PlistError::MissingValue {
                    key,
                    position: key_position,
                })
            }
        };
        if dict.contains_key(&key) {
            return Err(PlistError::DuplicateKey {
                key,
                position: key_position,
            });
        }
        dict.insert(key, value);
    }
}

fn read_array(reader: &mut XmlReader) -> Result<Array, PlistError> {
    let mut array = Array::new();
    loop {
        match reader.next_significant().map_err(|e| xml_error(reader, e))? {
            Event::End(end) if end.name().as_ref() == b"array" => return Ok(array),
            Event::Start(start) => array.push(read_value(reader, &start, false)?),
            Event::Empty(start) => array.push(read_value(reader, &start, true)?),
            Event::Eof => {
                return Err(PlistError::UnexpectedEof {
                    position: reader.position(),
                })
            }
            _ => {
                return Err(PlistError::UnexpectedText {
                    position: reader.position(),
                })
            }
        }
    }
}

/// Read character data up to the closing tag `end`, which must be the next
/// closing tag. Nested elements are an error.
pub(crate) fn read_text(reader: &mut XmlReader, end: &[u8]) -> Result<String, PlistError> {
    let mut buf = String::new();
    loop {
        match reader.read_event().map_err(|e| xml_error(reader, e))? {
            Event::Text(text) => buf.push_str(&text.unescape().map_err(|e| xml_error(reader, e))?),
            Event::CData(cdata) => {
                let text = std::str::from_utf8(&cdata).map_err(|_| PlistError::NotUtf8 {
                    position: reader.position(),
                })?;
                buf.push_str(text);
            }
            Event::End(e) if e.name().as_ref() == end => return Ok(buf),
            Event::Comment(_) | Event::PI(_) => (),
            Event::Start(start) | Event::Empty(start) => {
                return Err(unexpected_element(reader, &start))
            }
            Event::Eof => {
                return Err(PlistError::UnexpectedEof {
                    position: reader.position(),
                })
            }
            _ => {
                return Err(PlistError::UnexpectedText {
                    position: reader.position(),
                })
            }
        }
    }
}

fn expect_end(reader: &mut XmlReader, end: &[u8]) -> Result<(), PlistError> {
    match reader.read_event().map_err(|e| xml_error(reader, e))? {
        Event::End(e) if e.name().as_ref() == end => Ok(()),
        Event::Text(text) if is_whitespace(&text) => expect_end(reader, end),
        Event::Start(start) | Event::Empty(start) => Err(unexpected_element(reader, &start)),
        Event::Eof => Err(PlistError::UnexpectedEof {
            position: reader.position(),
        }),
        _ => Err(PlistError::UnexpectedText {
            position: reader.position(),
        }),
    }
}

impl From<String> for Plist {
    fn from(x: String) -> Plist {
        Plist::String(x)
    }
}

impl From<&str> for Plist {
    fn from(x: &str) -> Plist {
        Plist::String(x.to_string())
    }
}

impl From<i64> for Plist {
    fn from(x: i64) -> Plist {
        Plist::Integer(x)
    }
}

impl From<f64> for Plist {
    fn from(x: f64) -> Plist {
        Plist::Real(x.into())
    }
}

impl From<bool> for Plist {
    fn from(x: bool) -> Plist {
        Plist::Boolean(x)
    }
}

impl From<Vec<u8>> for Plist {
    fn from(x: Vec<u8>) -> Plist {
        Plist::Data(x)
    }
}

impl From<DateTime<Utc>> for Plist {
    fn from(x: DateTime<Utc>) -> Plist {
        Plist::Date(x)
    }
}

impl From<Vec<Plist>> for Plist {
    fn from(x: Vec<Plist>) -> Plist {
        Plist::Array(x)
    }
}

impl From<Dictionary> for Plist {
    fn from(x: Dictionary) -> Plist {
        Plist::Dictionary(x)
    }
}
