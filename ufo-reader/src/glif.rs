//! Parsing of the per-glyph XML dialect (`.glif` files).

use std::collections::HashSet;

use log::debug;
use quick_xml::events::{BytesStart, Event};

use crate::glyph::{
    AffineTransform, Anchor, Component, Contour, ContourPoint, GlifVersion, Glyph, Guideline,
    Image, Line, PointType, OBJECT_LIBS_KEY,
};
use crate::plist::{self, Dictionary, Plist, PlistError};
use crate::types::{Color, GlyphName, Identifier, InvalidColor, InvalidIdentifier};
use crate::xml::{element_name, Attributes, Position, XmlReader};

#[derive(Clone, Debug, thiserror::Error)]
#[error("{kind} at {position}")]
pub struct GlifError {
    pub kind: GlifErrorKind,
    pub position: Position,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum GlifErrorKind {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Plist(#[from] PlistError),
    #[error("missing <glyph> root element")]
    MissingRoot,
    #[error("unexpected element <{0}>")]
    UnexpectedElement(String),
    #[error("unexpected text")]
    UnexpectedText,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("content after </glyph>")]
    TrailingContent,
    #[error("<{0}> may only appear once")]
    DuplicateElement(&'static str),
    #[error("unsupported glif format '{0}'")]
    UnsupportedGlifVersion(String),
    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("empty glyph name")]
    EmptyName,
    #[error("glyph file is for '{found}', expected '{expected}'")]
    NameMismatch {
        expected: GlyphName,
        found: GlyphName,
    },
    #[error("invalid number '{0}'")]
    BadNumber(String),
    #[error("invalid hex value '{0}'")]
    BadHexValue(String),
    #[error("negative advance {0}")]
    NegativeAdvance(f32),
    #[error("unknown point type '{0}'")]
    UnknownPointType(String),
    #[error("invalid smooth value '{0}'")]
    BadSmooth(String),
    #[error("off-curve point marked smooth")]
    SmoothOffCurve,
    #[error("'move' point that is not first in its contour")]
    MisplacedMovePoint,
    #[error("open contour ends with an off-curve point")]
    TrailingOffCurves,
    #[error("guideline needs x, y, or x and y with an angle in 0..=360")]
    InvalidGuideline,
    #[error("component with an empty base glyph name")]
    EmptyComponentBase,
    #[error(transparent)]
    InvalidColor(#[from] InvalidColor),
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
    #[error("identifiers are not part of glif format 1")]
    IdentifierInFormat1,
    #[error("identifier '{0}' is used more than once")]
    DuplicateIdentifier(Identifier),
    #[error("<lib> must hold a single <dict>")]
    LibNotADict,
    #[error("'public.objectLibs' is not a dictionary")]
    BadObjectLibs,
}

/// Parse a single glif document.
///
/// Component bases are not checked against anything: that needs the whole
/// layer, and cycles are the consumer's problem.
pub fn parse_glyph(bytes: &[u8]) -> Result<Glyph, GlifError> {
    GlifParser::new(bytes, None).parse()
}

/// As [`parse_glyph`], for a file registered under `expected`.
pub(crate) fn parse_named_glyph(bytes: &[u8], expected: &GlyphName) -> Result<Glyph, GlifError> {
    GlifParser::new(bytes, Some(expected)).parse()
}

struct GlifParser<'a> {
    reader: XmlReader<'a>,
    expected: Option<&'a GlyphName>,
    glyph: Glyph,
    identifiers: HashSet<Identifier>,
    seen: HashSet<&'static str>,
}

impl<'a> GlifParser<'a> {
    fn new(bytes: &'a [u8], expected: Option<&'a GlyphName>) -> Self {
        GlifParser {
            reader: XmlReader::new(bytes),
            expected,
            glyph: Glyph::default(),
            identifiers: HashSet::new(),
            seen: HashSet::new(),
        }
    }

    fn error(&self, kind: impl Into<GlifErrorKind>) -> GlifError {
        GlifError {
            kind: kind.into(),
            position: self.reader.position(),
        }
    }

    fn next(&mut self) -> Result<Event<'a>, GlifError> {
        self.reader.next_significant().map_err(|e| self.error(e))
    }

    fn parse(mut self) -> Result<Glyph, GlifError> {
        let (root, empty) = loop {
            match self.next()? {
                Event::Start(start) if start.name().as_ref() == b"glyph" => break (start, false),
                Event::Empty(start) if start.name().as_ref() == b"glyph" => break (start, true),
                Event::Start(start) | Event::Empty(start) => {
                    return Err(self.error(GlifErrorKind::UnexpectedElement(element_name(&start))))
                }
                Event::Eof => return Err(self.error(GlifErrorKind::MissingRoot)),
                _ => return Err(self.error(GlifErrorKind::UnexpectedText)),
            }
        };
        self.read_root(&root)?;
        if !empty {
            self.read_children()?;
        }
        match self.next()? {
            Event::Eof => (),
            _ => return Err(self.error(GlifErrorKind::TrailingContent)),
        }
        self.finish()
    }

    fn read_root(&mut self, root: &BytesStart) -> Result<(), GlifError> {
        let attrs = self.attributes(root)?;
        let name = attrs
            .get("name")
            .ok_or_else(|| self.missing("glyph", "name"))?;
        if name.is_empty() {
            return Err(self.error(GlifErrorKind::EmptyName));
        }
        self.glyph.name = name.into();
        if let Some(expected) = self.expected {
            if self.glyph.name != *expected {
                return Err(self.error(GlifErrorKind::NameMismatch {
                    expected: expected.clone(),
                    found: self.glyph.name.clone(),
                }));
            }
        }
        self.glyph.format = match attrs.get("format").map(str::trim) {
            Some("1") => GlifVersion::V1,
            Some("2") => GlifVersion::V2,
            Some(other) => {
                return Err(self.error(GlifErrorKind::UnsupportedGlifVersion(other.into())))
            }
            None => return Err(self.missing("glyph", "format")),
        };
        Ok(())
    }

    fn read_children(&mut self) -> Result<(), GlifError> {
        loop {
            match self.next()? {
                Event::End(end) if end.name().as_ref() == b"glyph" => return Ok(()),
                Event::Start(start) => self.read_element(&start, false)?,
                Event::Empty(start) => self.read_element(&start, true)?,
                Event::Eof => return Err(self.error(GlifErrorKind::UnexpectedEof)),
                _ => return Err(self.error(GlifErrorKind::UnexpectedText)),
            }
        }
    }

    fn read_element(&mut self, start: &BytesStart, empty: bool) -> Result<(), GlifError> {
        let v2 = self.glyph.format == GlifVersion::V2;
        match start.name().as_ref() {
            b"advance" => {
                self.once("advance")?;
                let attrs = self.attributes(start)?;
                let width = self.number(&attrs, "width")?.unwrap_or(0.0);
                let height = self.number(&attrs, "height")?.unwrap_or(0.0);
                for value in [width, height] {
                    if value < 0.0 {
                        return Err(self.error(GlifErrorKind::NegativeAdvance(value)));
                    }
                }
                self.glyph.width = width;
                self.glyph.height = height;
                self.end_of(b"advance", empty)
            }
            b"unicode" => {
                let attrs = self.attributes(start)?;
                let hex = attrs.get("hex").ok_or_else(|| self.missing("unicode", "hex"))?;
                let codepoint = u32::from_str_radix(hex.trim(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(GlifErrorKind::BadHexValue(hex.into())))?;
                self.glyph.codepoints.push(codepoint);
                self.end_of(b"unicode", empty)
            }
            b"note" => {
                self.once("note")?;
                let text = if empty {
                    String::new()
                } else {
                    plist::read_text(&mut self.reader, b"note").map_err(|e| self.error(e))?
                };
                self.glyph.note = Some(normalize_note(&text));
                Ok(())
            }
            b"image" if v2 => {
                self.once("image")?;
                let attrs = self.attributes(start)?;
                let file_name = attrs
                    .get("fileName")
                    .ok_or_else(|| self.missing("image", "fileName"))?
                    .to_string();
                let transform = self.transform(&attrs)?;
                let color = self.color(&attrs)?;
                self.glyph.image = Some(Image {
                    file_name,
                    transform,
                    color,
                });
                self.end_of(b"image", empty)
            }
            b"guideline" if v2 => {
                let attrs = self.attributes(start)?;
                let line = Line::from_parts(
                    self.number(&attrs, "x")?,
                    self.number(&attrs, "y")?,
                    self.number(&attrs, "angle")?,
                )
                .ok_or_else(|| self.error(GlifErrorKind::InvalidGuideline))?;
                let guideline = Guideline {
                    line,
                    name: attrs.get("name").map(Into::into),
                    color: self.color(&attrs)?,
                    identifier: self.identifier(&attrs)?,
                };
                self.glyph.guidelines.push(guideline);
                self.end_of(b"guideline", empty)
            }
            b"anchor" if v2 => {
                let attrs = self.attributes(start)?;
                let anchor = Anchor {
                    name: attrs.get("name").map(Into::into),
                    x: self.required_number(&attrs, "anchor", "x")?,
                    y: self.required_number(&attrs, "anchor", "y")?,
                    color: self.color(&attrs)?,
                    identifier: self.identifier(&attrs)?,
                };
                self.glyph.anchors.push(anchor);
                self.end_of(b"anchor", empty)
            }
            b"outline" => {
                self.once("outline")?;
                if empty {
                    Ok(())
                } else {
                    self.read_outline()
                }
            }
            b"lib" => {
                self.once("lib")?;
                if !empty {
                    self.glyph.lib = self.read_lib()?;
                }
                Ok(())
            }
            _ => Err(self.error(GlifErrorKind::UnexpectedElement(element_name(start)))),
        }
    }

    fn read_outline(&mut self) -> Result<(), GlifError> {
        loop {
            match self.next()? {
                Event::End(end) if end.name().as_ref() == b"outline" => return Ok(()),
                Event::Start(start) if start.name().as_ref() == b"contour" => {
                    self.read_contour(&start, false)?
                }
                Event::Empty(start) if start.name().as_ref() == b"contour" => {
                    self.read_contour(&start, true)?
                }
                Event::Start(start) if start.name().as_ref() == b"component" => {
                    self.read_component(&start)?;
                    self.end_of(b"component", false)?;
                }
                Event::Empty(start) if start.name().as_ref() == b"component" => {
                    self.read_component(&start)?
                }
                Event::Start(start) | Event::Empty(start) => {
                    return Err(self.error(GlifErrorKind::UnexpectedElement(element_name(&start))))
                }
                Event::Eof => return Err(self.error(GlifErrorKind::UnexpectedEof)),
                _ => return Err(self.error(GlifErrorKind::UnexpectedText)),
            }
        }
    }

    fn read_contour(&mut self, start: &BytesStart, empty: bool) -> Result<(), GlifError> {
        let attrs = self.attributes(start)?;
        let mut contour = Contour {
            points: Vec::new(),
            identifier: self.identifier(&attrs)?,
        };
        if !empty {
            loop {
                match self.next()? {
                    Event::End(end) if end.name().as_ref() == b"contour" => break,
                    Event::Start(start) if start.name().as_ref() == b"point" => {
                        contour.points.push(self.read_point(&start)?);
                        self.end_of(b"point", false)?;
                    }
                    Event::Empty(start) if start.name().as_ref() == b"point" => {
                        contour.points.push(self.read_point(&start)?)
                    }
                    Event::Start(start) | Event::Empty(start) => {
                        return Err(
                            self.error(GlifErrorKind::UnexpectedElement(element_name(&start)))
                        )
                    }
                    Event::Eof => return Err(self.error(GlifErrorKind::UnexpectedEof)),
                    _ => return Err(self.error(GlifErrorKind::UnexpectedText)),
                }
            }
        }
        validate_contour(&contour).map_err(|kind| self.error(kind))?;

        // format 1 stored anchors as single named move points
        if self.glyph.format == GlifVersion::V1 {
            if let [point] = contour.points.as_slice() {
                if point.typ == PointType::Move && point.name.is_some() {
                    self.glyph.anchors.push(Anchor {
                        name: point.name.clone(),
                        x: point.x,
                        y: point.y,
                        color: None,
                        identifier: None,
                    });
                    return Ok(());
                }
            }
        }
        self.glyph.contours.push(contour);
        Ok(())
    }

    fn read_point(&mut self, start: &BytesStart) -> Result<ContourPoint, GlifError> {
        let attrs = self.attributes(start)?;
        let typ = match attrs.get("type") {
            None | Some("offcurve") => PointType::OffCurve,
            Some("move") => PointType::Move,
            Some("line") => PointType::Line,
            Some("curve") => PointType::Curve,
            Some("qcurve") => PointType::QCurve,
            Some(other) => return Err(self.error(GlifErrorKind::UnknownPointType(other.into()))),
        };
        let smooth = match attrs.get("smooth") {
            None | Some("no") => false,
            Some("yes") => true,
            Some(other) => return Err(self.error(GlifErrorKind::BadSmooth(other.into()))),
        };
        if smooth && typ == PointType::OffCurve {
            return Err(self.error(GlifErrorKind::SmoothOffCurve));
        }
        Ok(ContourPoint {
            x: self.required_number(&attrs, "point", "x")?,
            y: self.required_number(&attrs, "point", "y")?,
            typ,
            smooth,
            name: attrs.get("name").map(Into::into),
            identifier: self.identifier(&attrs)?,
        })
    }

    fn read_component(&mut self, start: &BytesStart) -> Result<(), GlifError> {
        let attrs = self.attributes(start)?;
        let base = attrs
            .get("base")
            .ok_or_else(|| self.missing("component", "base"))?;
        if base.is_empty() {
            return Err(self.error(GlifErrorKind::EmptyComponentBase));
        }
        let component = Component {
            base: base.into(),
            transform: self.transform(&attrs)?,
            identifier: self.identifier(&attrs)?,
        };
        self.glyph.components.push(component);
        Ok(())
    }

    fn read_lib(&mut self) -> Result<Dictionary, GlifError> {
        let lib = match self.next()? {
            Event::Start(start) if start.name().as_ref() == b"dict" => {
                plist::read_value(&mut self.reader, &start, false).map_err(|e| self.error(e))?
            }
            Event::Empty(start) if start.name().as_ref() == b"dict" => {
                plist::read_value(&mut self.reader, &start, true).map_err(|e| self.error(e))?
            }
            _ => return Err(self.error(GlifErrorKind::LibNotADict)),
        };
        self.end_of(b"lib", false)?;
        match lib {
            Plist::Dictionary(dict) => Ok(dict),
            _ => Err(self.error(GlifErrorKind::LibNotADict)),
        }
    }

    fn finish(mut self) -> Result<Glyph, GlifError> {
        match self.glyph.lib.get(OBJECT_LIBS_KEY) {
            None | Some(Plist::Dictionary(_)) => (),
            Some(_) => return Err(self.error(GlifErrorKind::BadObjectLibs)),
        }
        let pruned = self.glyph.prune_object_libs();
        if pruned > 0 {
            debug!(
                "dropped {pruned} object lib entries with unknown identifiers from '{}'",
                self.glyph.name
            );
        }
        Ok(self.glyph)
    }

    /// Consume the closing tag of an element that has no content.
    fn end_of(&mut self, name: &[u8], empty: bool) -> Result<(), GlifError> {
        if empty {
            return Ok(());
        }
        match self.next()? {
            Event::End(end) if end.name().as_ref() == name => Ok(()),
            Event::Start(start) | Event::Empty(start) => {
                Err(self.error(GlifErrorKind::UnexpectedElement(element_name(&start))))
            }
            Event::Eof => Err(self.error(GlifErrorKind::UnexpectedEof)),
            _ => Err(self.error(GlifErrorKind::UnexpectedText)),
        }
    }

    fn once(&mut self, element: &'static str) -> Result<(), GlifError> {
        if !self.seen.insert(element) {
            return Err(self.error(GlifErrorKind::DuplicateElement(element)));
        }
        Ok(())
    }

    fn attributes(&self, start: &BytesStart) -> Result<Attributes, GlifError> {
        Attributes::read(start).map_err(|e| self.error(e))
    }

    fn missing(&self, element: &'static str, attribute: &'static str) -> GlifError {
        self.error(GlifErrorKind::MissingAttribute { element, attribute })
    }

    fn number(&self, attrs: &Attributes, key: &str) -> Result<Option<f32>, GlifError> {
        attrs
            .get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| self.error(GlifErrorKind::BadNumber(raw.into())))
            })
            .transpose()
    }

    fn required_number(
        &self,
        attrs: &Attributes,
        element: &'static str,
        key: &'static str,
    ) -> Result<f32, GlifError> {
        self.number(attrs, key)?
            .ok_or_else(|| self.missing(element, key))
    }

    fn transform(&self, attrs: &Attributes) -> Result<AffineTransform, GlifError> {
        let identity = AffineTransform::IDENTITY;
        Ok(AffineTransform {
            x_scale: self.number(attrs, "xScale")?.unwrap_or(identity.x_scale),
            xy_scale: self.number(attrs, "xyScale")?.unwrap_or(identity.xy_scale),
            yx_scale: self.number(attrs, "yxScale")?.unwrap_or(identity.yx_scale),
            y_scale: self.number(attrs, "yScale")?.unwrap_or(identity.y_scale),
            x_offset: self.number(attrs, "xOffset")?.unwrap_or(identity.x_offset),
            y_offset: self.number(attrs, "yOffset")?.unwrap_or(identity.y_offset),
        })
    }

    fn color(&self, attrs: &Attributes) -> Result<Option<Color>, GlifError> {
        attrs
            .get("color")
            .map(|raw| raw.parse::<Color>().map_err(|e| self.error(e)))
            .transpose()
    }

    /// Validate an `identifier` attribute and check it is unique in the glyph.
    fn identifier(&mut self, attrs: &Attributes) -> Result<Option<Identifier>, GlifError> {
        let Some(raw) = attrs.get("identifier") else {
            return Ok(None);
        };
        if self.glyph.format == GlifVersion::V1 {
            return Err(self.error(GlifErrorKind::IdentifierInFormat1));
        }
        let identifier = Identifier::new(raw).map_err(|e| self.error(e))?;
        if !self.identifiers.insert(identifier.clone()) {
            return Err(self.error(GlifErrorKind::DuplicateIdentifier(identifier)));
        }
        Ok(Some(identifier))
    }
}

fn validate_contour(contour: &Contour) -> Result<(), GlifErrorKind> {
    if contour
        .points
        .iter()
        .skip(1)
        .any(|p| p.typ == PointType::Move)
    {
        return Err(GlifErrorKind::MisplacedMovePoint);
    }
    if !contour.is_closed()
        && contour
            .points
            .last()
            .is_some_and(|p| p.typ == PointType::OffCurve)
    {
        return Err(GlifErrorKind::TrailingOffCurves);
    }
    Ok(())
}

/// Notes are stored with surrounding indentation; keep only the text lines.
fn normalize_note(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    fn glif(body: &str) -> Vec<u8> {
        format!("{HEADER}\n<glyph name=\"a\" format=\"2\">\n{body}\n</glyph>\n").into_bytes()
    }

    fn parse_err(body: &str) -> GlifErrorKind {
        parse_glyph(&glif(body)).unwrap_err().kind
    }

    #[test]
    fn parse_full_glyph() {
        let bytes = glif(
            r#"
  <advance width="500" height="750.5"/>
  <unicode hex="0041"/>
  <unicode hex="0061"/>
  <note>
    first line
    second line
  </note>
  <image fileName="a.png" xScale="0.5" color="1,0,0,0.5"/>
  <guideline x="10" name="stem"/>
  <guideline y="20" color="0,0,1,1"/>
  <guideline x="1" y="2" angle="45" identifier="guide1"/>
  <anchor x="250" y="700" name="top" identifier="anchor1"/>
  <outline>
    <contour identifier="contour1">
      <point x="0" y="0" type="line" identifier="point1"/>
      <point x="0" y="700" type="line"/>
      <point x="500" y="700" type="line" smooth="yes" name="corner"/>
      <point x="500" y="0" type="line"/>
    </contour>
    <component base="acute" xOffset="100" yScale="-1" identifier="comp1"/>
  </outline>
  <lib>
    <dict>
      <key>com.example.flag</key>
      <true/>
    </dict>
  </lib>"#,
        );
        let glyph = parse_glyph(&bytes).unwrap();
        assert_eq!(glyph.name, "a");
        assert_eq!(glyph.format, GlifVersion::V2);
        assert_eq!((glyph.width, glyph.height), (500.0, 750.5));
        assert_eq!(glyph.codepoints, vec!['A', 'a']);
        assert_eq!(glyph.note.as_deref(), Some("first line\nsecond line"));

        let image = glyph.image.as_ref().unwrap();
        assert_eq!(image.file_name, "a.png");
        assert_eq!(image.transform.x_scale, 0.5);
        assert_eq!(image.color, Some(Color::new(1.0, 0.0, 0.0, 0.5).unwrap()));

        assert_eq!(glyph.guidelines.len(), 3);
        assert_eq!(glyph.guidelines[0].line, Line::Vertical(10.0));
        assert_eq!(glyph.guidelines[0].name.as_deref(), Some("stem"));
        assert_eq!(glyph.guidelines[1].line, Line::Horizontal(20.0));
        assert_eq!(glyph.guidelines[2].angle(), Some(45.0));

        assert_eq!(glyph.anchors.len(), 1);
        assert_eq!(glyph.anchors[0].name.as_deref(), Some("top"));

        assert_eq!(glyph.contours.len(), 1);
        let contour = &glyph.contours[0];
        assert!(contour.is_closed());
        assert_eq!(contour.points.len(), 4);
        assert!(contour.points[2].smooth);
        assert_eq!(contour.points[2].name.as_deref(), Some("corner"));

        let component = &glyph.components[0];
        assert_eq!(component.base, "acute");
        assert_eq!(
            component.transform.as_coeffs(),
            [1.0, 0.0, 0.0, -1.0, 100.0, 0.0]
        );

        assert_eq!(glyph.lib.get("com.example.flag"), Some(&Plist::Boolean(true)));
        assert_eq!(glyph.identifiers().count(), 5);
    }

    #[test]
    fn empty_glyph() {
        let glyph = parse_glyph(b"<glyph name=\"space\" format=\"2\"/>").unwrap();
        assert_eq!(glyph.name, "space");
        assert_eq!(glyph.width, 0.0);
        assert!(glyph.contours.is_empty());
    }

    #[test]
    fn open_contour() {
        let bytes = glif(
            r#"<outline><contour>
            <point x="0" y="0" type="move"/>
            <point x="10" y="10"/>
            <point x="20" y="10"/>
            <point x="30" y="0" type="curve"/>
            </contour></outline>"#,
        );
        let glyph = parse_glyph(&bytes).unwrap();
        assert!(!glyph.contours[0].is_closed());
        assert_eq!(glyph.contours[0].points[1].typ, PointType::OffCurve);
    }

    #[test]
    fn format_1_anchors() {
        let bytes = br#"<glyph name="a" format="1">
            <advance width="400"/>
            <outline>
                <contour><point x="200" y="600" type="move" name="top"/></contour>
                <contour>
                    <point x="0" y="0" type="line"/>
                    <point x="0" y="10" type="line"/>
                    <point x="10" y="10" type="line"/>
                </contour>
            </outline>
        </glyph>"#;
        let glyph = parse_glyph(bytes).unwrap();
        assert_eq!(glyph.format, GlifVersion::V1);
        assert_eq!(glyph.contours.len(), 1);
        assert_eq!(glyph.anchors.len(), 1);
        assert_eq!(glyph.anchors[0].name.as_deref(), Some("top"));
        assert_eq!((glyph.anchors[0].x, glyph.anchors[0].y), (200.0, 600.0));
    }

    #[rstest]
    #[case::contour(r#"<contour identifier="c1"><point x="0" y="0" type="line"/></contour>"#)]
    #[case::point(r#"<contour><point x="0" y="0" type="line" identifier="p1"/></contour>"#)]
    #[case::component(r#"<component base="b" identifier="c1"/>"#)]
    fn format_1_has_no_identifiers(#[case] outline: &str) {
        let bytes = format!(
            "<glyph name=\"a\" format=\"1\">\n<outline>\n{outline}\n</outline>\n</glyph>"
        );
        let err = parse_glyph(bytes.as_bytes()).unwrap_err();
        assert!(matches!(err.kind, GlifErrorKind::IdentifierInFormat1), "{err}");
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn angle_only_guideline() {
        let err = parse_glyph(&glif(r#"<guideline angle="45"/>"#)).unwrap_err();
        assert!(matches!(err.kind, GlifErrorKind::InvalidGuideline), "{err}");
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn object_libs_are_pruned() {
        let bytes = glif(
            r#"<anchor x="1" y="2" identifier="keep"/>
  <lib><dict>
    <key>public.objectLibs</key>
    <dict>
      <key>keep</key><dict><key>x</key><integer>1</integer></dict>
      <key>orphan</key><dict/>
    </dict>
  </dict></lib>"#,
        );
        let glyph = parse_glyph(&bytes).unwrap();
        let libs = glyph.object_libs().unwrap();
        assert_eq!(libs.keys().collect::<Vec<_>>(), vec!["keep"]);
    }

    #[test]
    fn object_libs_must_be_a_dict() {
        let kind = parse_err(
            "<lib><dict><key>public.objectLibs</key><string>no</string></dict></lib>",
        );
        assert!(matches!(kind, GlifErrorKind::BadObjectLibs), "{kind}");
    }

    #[test]
    fn lib_errors_keep_plist_detail() {
        let kind = parse_err("<lib><dict><key>a</key></dict></lib>");
        assert!(
            matches!(kind, GlifErrorKind::Plist(PlistError::MissingValue { .. })),
            "{kind}"
        );
    }

    #[rstest]
    #[case::negative_width(r#"<advance width="-1"/>"#)]
    #[case::negative_height(r#"<advance height="-0.5"/>"#)]
    fn negative_advance(#[case] body: &str) {
        assert!(matches!(parse_err(body), GlifErrorKind::NegativeAdvance(_)));
    }

    #[rstest]
    #[case::bad_type(r#"<outline><contour><point x="0" y="0" type="spline"/></contour></outline>"#)]
    fn unknown_point_type(#[case] body: &str) {
        assert!(matches!(parse_err(body), GlifErrorKind::UnknownPointType(_)));
    }

    #[rstest]
    #[case::angle_without_y(r#"<guideline x="1" angle="45"/>"#)]
    #[case::no_coordinates(r#"<guideline name="nothing"/>"#)]
    #[case::both_without_angle(r#"<guideline x="1" y="2"/>"#)]
    #[case::angle_out_of_range(r#"<guideline x="1" y="2" angle="361"/>"#)]
    fn invalid_guidelines(#[case] body: &str) {
        assert!(matches!(parse_err(body), GlifErrorKind::InvalidGuideline));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            parse_err(r#"<outline><contour><point x="0" y="0" type="line"/><point x="1" y="1" type="move"/></contour></outline>"#),
            GlifErrorKind::MisplacedMovePoint
        ));
        assert!(matches!(
            parse_err(r#"<outline><contour><point x="0" y="0" type="move"/><point x="1" y="1"/></contour></outline>"#),
            GlifErrorKind::TrailingOffCurves
        ));
        assert!(matches!(
            parse_err(r#"<outline><contour><point x="0" y="0" smooth="yes"/></contour></outline>"#),
            GlifErrorKind::SmoothOffCurve
        ));
        assert!(matches!(
            parse_err(r#"<outline><component base=""/></outline>"#),
            GlifErrorKind::EmptyComponentBase
        ));
        assert!(matches!(
            parse_err(r#"<outline><component xOffset="1"/></outline>"#),
            GlifErrorKind::MissingAttribute {
                element: "component",
                attribute: "base"
            }
        ));
        assert!(matches!(
            parse_err(r#"<advance width="1"/><advance width="2"/>"#),
            GlifErrorKind::DuplicateElement("advance")
        ));
        assert!(matches!(
            parse_err(r#"<unicode hex="zz"/>"#),
            GlifErrorKind::BadHexValue(_)
        ));
        assert!(matches!(
            parse_err(r#"<anchor x="one" y="2"/>"#),
            GlifErrorKind::BadNumber(_)
        ));
        assert!(matches!(
            parse_err(r#"<anchor x="1" y="2" color="red"/>"#),
            GlifErrorKind::InvalidColor(_)
        ));
        assert!(matches!(
            parse_err(r#"<wibble/>"#),
            GlifErrorKind::UnexpectedElement(_)
        ));
        assert!(matches!(
            parse_err(r#"<anchor x="1" y="2" identifier="x"/><guideline x="1" identifier="x"/>"#),
            GlifErrorKind::DuplicateIdentifier(_)
        ));
    }

    #[test]
    fn component_cycles_are_not_checked() {
        let glyph = parse_glyph(&glif(r#"<outline><component base="a"/></outline>"#)).unwrap();
        assert_eq!(glyph.components[0].base, "a");
    }

    #[test]
    fn root_errors() {
        assert!(matches!(
            parse_glyph(b"<notglyph/>").unwrap_err().kind,
            GlifErrorKind::UnexpectedElement(_)
        ));
        assert!(matches!(
            parse_glyph(b"<glyph name=\"a\" format=\"3\"/>").unwrap_err().kind,
            GlifErrorKind::UnsupportedGlifVersion(_)
        ));
        assert!(matches!(
            parse_glyph(b"<glyph name=\"a\" format=\"2\"/><glyph/>").unwrap_err().kind,
            GlifErrorKind::TrailingContent
        ));
        assert!(matches!(
            parse_glyph(b"").unwrap_err().kind,
            GlifErrorKind::MissingRoot
        ));
    }
}
