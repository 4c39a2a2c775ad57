//! `fontinfo.plist`: font-wide naming, versioning and metrics.
//!
//! The commonly used keys are decoded into typed fields. Everything else is
//! kept, undecoded, in [`FontInfo::other`].

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::glyph::{Guideline, Line};
use crate::layout::read_dict_file;
use crate::plist::{Dictionary, Plist, PlistError};
use crate::types::{Color, Identifier, InvalidColor, InvalidIdentifier};

/// A number that may be written as either `<integer>` or `<real>`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum IntegerOrFloat {
    Integer(i64),
    Float(f32),
}

impl IntegerOrFloat {
    pub fn as_f64(&self) -> f64 {
        match self {
            IntegerOrFloat::Integer(i) => *i as f64,
            IntegerOrFloat::Float(f) => *f as f64,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, IntegerOrFloat::Integer(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleMapStyle {
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

impl StyleMapStyle {
    fn parse(s: &str) -> Option<StyleMapStyle> {
        match s {
            "regular" => Some(StyleMapStyle::Regular),
            "italic" => Some(StyleMapStyle::Italic),
            "bold" => Some(StyleMapStyle::Bold),
            "bold italic" => Some(StyleMapStyle::BoldItalic),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum FontInfoError {
    #[error(transparent)]
    Plist(#[from] PlistError),
    #[error("'{key}' must not be negative")]
    Negative { key: &'static str },
    #[error("'{0}' is not a style map style")]
    InvalidStyleMapStyle(String),
    #[error("guideline {0} needs x, y, or x and y with an angle in 0..=360")]
    InvalidGuideline(usize),
    #[error(transparent)]
    InvalidColor(#[from] InvalidColor),
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
    #[error("guideline identifier '{0}' is used more than once")]
    DuplicateIdentifier(Identifier),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FontInfo {
    pub family_name: Option<String>,
    pub style_name: Option<String>,
    pub style_map_family_name: Option<String>,
    pub style_map_style_name: Option<StyleMapStyle>,
    pub year: Option<i64>,
    pub version_major: Option<i64>,
    pub version_minor: Option<u32>,
    pub copyright: Option<String>,
    pub trademark: Option<String>,
    pub note: Option<String>,

    pub units_per_em: Option<IntegerOrFloat>,
    pub descender: Option<IntegerOrFloat>,
    pub x_height: Option<IntegerOrFloat>,
    pub cap_height: Option<IntegerOrFloat>,
    pub ascender: Option<IntegerOrFloat>,
    pub italic_angle: Option<IntegerOrFloat>,
    pub guidelines: Vec<Guideline>,

    pub open_type_head_created: Option<String>,
    pub open_type_hhea_ascender: Option<i64>,
    pub open_type_hhea_descender: Option<i64>,
    pub open_type_hhea_line_gap: Option<i64>,
    pub open_type_name_designer: Option<String>,
    pub open_type_name_manufacturer: Option<String>,
    pub open_type_name_version: Option<String>,
    pub open_type_name_unique_id: Option<String>,
    pub open_type_name_preferred_family_name: Option<String>,
    pub open_type_name_preferred_subfamily_name: Option<String>,
    pub open_type_os2_vendor_id: Option<String>,
    pub open_type_os2_weight_class: Option<u32>,
    pub open_type_os2_width_class: Option<u32>,
    pub open_type_os2_selection: Option<Vec<u32>>,
    pub open_type_os2_type: Option<Vec<u32>>,
    pub open_type_os2_typo_ascender: Option<i64>,
    pub open_type_os2_typo_descender: Option<i64>,
    pub open_type_os2_typo_line_gap: Option<i64>,
    pub open_type_os2_win_ascent: Option<u32>,
    pub open_type_os2_win_descent: Option<u32>,

    pub postscript_font_name: Option<String>,
    pub postscript_full_name: Option<String>,
    pub postscript_weight_name: Option<String>,
    pub postscript_is_fixed_pitch: Option<bool>,
    pub postscript_underline_position: Option<IntegerOrFloat>,
    pub postscript_underline_thickness: Option<IntegerOrFloat>,
    pub postscript_blue_values: Option<Vec<IntegerOrFloat>>,
    pub postscript_other_blues: Option<Vec<IntegerOrFloat>>,
    pub postscript_stem_snap_h: Option<Vec<IntegerOrFloat>>,
    pub postscript_stem_snap_v: Option<Vec<IntegerOrFloat>>,

    /// Keys without a typed field, in file order
    pub other: Dictionary,
}

impl FontInfo {
    /// Read `fontinfo.plist`; a missing file is an empty `FontInfo`.
    pub(crate) fn read(path: &Path) -> Result<FontInfo, Error> {
        let Some(dict) = read_dict_file(path)? else {
            return Ok(FontInfo::default());
        };
        FontInfo::from_dict(dict).map_err(|e| match e {
            FontInfoError::Plist(e) => Error::plist(path, e),
            e => Error::FontInfo {
                path: path.to_path_buf(),
                source: e,
            },
        })
    }

    pub fn from_dict(dict: Dictionary) -> Result<FontInfo, FontInfoError> {
        let mut f = Fields(dict);
        let info = FontInfo {
            family_name: f.string("familyName")?,
            style_name: f.string("styleName")?,
            style_map_family_name: f.string("styleMapFamilyName")?,
            style_map_style_name: f
                .string("styleMapStyleName")?
                .map(|s| StyleMapStyle::parse(&s).ok_or(FontInfoError::InvalidStyleMapStyle(s)))
                .transpose()?,
            year: f.integer("year")?,
            version_major: f.integer("versionMajor")?,
            version_minor: f.non_negative("versionMinor")?,
            copyright: f.string("copyright")?,
            trademark: f.string("trademark")?,
            note: f.string("note")?,

            units_per_em: f.non_negative_number("unitsPerEm")?,
            descender: f.number("descender")?,
            x_height: f.number("xHeight")?,
            cap_height: f.number("capHeight")?,
            ascender: f.number("ascender")?,
            italic_angle: f.number("italicAngle")?,
            guidelines: f.guidelines("guidelines")?,

            open_type_head_created: f.string("openTypeHeadCreated")?,
            open_type_hhea_ascender: f.integer("openTypeHheaAscender")?,
            open_type_hhea_descender: f.integer("openTypeHheaDescender")?,
            open_type_hhea_line_gap: f.integer("openTypeHheaLineGap")?,
            open_type_name_designer: f.string("openTypeNameDesigner")?,
            open_type_name_manufacturer: f.string("openTypeNameManufacturer")?,
            open_type_name_version: f.string("openTypeNameVersion")?,
            open_type_name_unique_id: f.string("openTypeNameUniqueID")?,
            open_type_name_preferred_family_name: f.string("openTypeNamePreferredFamilyName")?,
            open_type_name_preferred_subfamily_name: f
                .string("openTypeNamePreferredSubfamilyName")?,
            open_type_os2_vendor_id: f.string("openTypeOS2VendorID")?,
            open_type_os2_weight_class: f.non_negative("openTypeOS2WeightClass")?,
            open_type_os2_width_class: f.non_negative("openTypeOS2WidthClass")?,
            open_type_os2_selection: f.bit_list("openTypeOS2Selection")?,
            open_type_os2_type: f.bit_list("openTypeOS2Type")?,
            open_type_os2_typo_ascender: f.integer("openTypeOS2TypoAscender")?,
            open_type_os2_typo_descender: f.integer("openTypeOS2TypoDescender")?,
            open_type_os2_typo_line_gap: f.integer("openTypeOS2TypoLineGap")?,
            open_type_os2_win_ascent: f.non_negative("openTypeOS2WinAscent")?,
            open_type_os2_win_descent: f.non_negative("openTypeOS2WinDescent")?,

            postscript_font_name: f.string("postscriptFontName")?,
            postscript_full_name: f.string("postscriptFullName")?,
            postscript_weight_name: f.string("postscriptWeightName")?,
            postscript_is_fixed_pitch: f.boolean("postscriptIsFixedPitch")?,
            postscript_underline_position: f.number("postscriptUnderlinePosition")?,
            postscript_underline_thickness: f.number("postscriptUnderlineThickness")?,
            postscript_blue_values: f.number_list("postscriptBlueValues")?,
            postscript_other_blues: f.number_list("postscriptOtherBlues")?,
            postscript_stem_snap_h: f.number_list("postscriptStemSnapH")?,
            postscript_stem_snap_v: f.number_list("postscriptStemSnapV")?,

            other: Dictionary::new(),
        };
        Ok(FontInfo {
            other: f.0,
            ..info
        })
    }
}

/// Takes typed values out of a dictionary, leaving the unknown keys behind.
struct Fields(Dictionary);

fn wrong_type(key: &str, expected: &'static str, found: &Plist) -> PlistError {
    PlistError::UnexpectedFieldType {
        key: key.to_string(),
        expected,
        found: found.name(),
    }
}

fn to_number(value: &Plist) -> Option<IntegerOrFloat> {
    match value {
        Plist::Integer(i) => Some(IntegerOrFloat::Integer(*i)),
        Plist::Real(f) => Some(IntegerOrFloat::Float(f.into_inner() as f32)),
        _ => None,
    }
}

impl Fields {
    fn string(&mut self, key: &str) -> Result<Option<String>, FontInfoError> {
        match self.0.shift_remove(key) {
            None => Ok(None),
            Some(Plist::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "string", &other).into()),
        }
    }

    fn boolean(&mut self, key: &str) -> Result<Option<bool>, FontInfoError> {
        match self.0.shift_remove(key) {
            None => Ok(None),
            Some(Plist::Boolean(b)) => Ok(Some(b)),
            Some(other) => Err(wrong_type(key, "boolean", &other).into()),
        }
    }

    fn integer(&mut self, key: &str) -> Result<Option<i64>, FontInfoError> {
        match self.0.shift_remove(key) {
            None => Ok(None),
            Some(Plist::Integer(i)) => Ok(Some(i)),
            Some(other) => Err(wrong_type(key, "integer", &other).into()),
        }
    }

    fn non_negative(&mut self, key: &'static str) -> Result<Option<u32>, FontInfoError> {
        self.integer(key)?
            .map(|i| u32::try_from(i).map_err(|_| FontInfoError::Negative { key }))
            .transpose()
    }

    fn number(&mut self, key: &str) -> Result<Option<IntegerOrFloat>, FontInfoError> {
        match self.0.shift_remove(key) {
            None => Ok(None),
            Some(value) => to_number(&value)
                .map(Some)
                .ok_or_else(|| wrong_type(key, "number", &value).into()),
        }
    }

    fn non_negative_number(
        &mut self,
        key: &'static str,
    ) -> Result<Option<IntegerOrFloat>, FontInfoError> {
        match self.number(key)? {
            Some(n) if n.as_f64() < 0.0 => Err(FontInfoError::Negative { key }),
            n => Ok(n),
        }
    }

    fn array(&mut self, key: &str) -> Result<Option<Vec<Plist>>, FontInfoError> {
        match self.0.shift_remove(key) {
            None => Ok(None),
            Some(Plist::Array(a)) => Ok(Some(a)),
            Some(other) => Err(wrong_type(key, "array", &other).into()),
        }
    }

    fn number_list(&mut self, key: &str) -> Result<Option<Vec<IntegerOrFloat>>, FontInfoError> {
        let Some(items) = self.array(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .map(|v| to_number(v).ok_or_else(|| wrong_type(key, "array of numbers", v).into()))
            .collect::<Result<Vec<_>, FontInfoError>>()
            .map(Some)
    }

    /// A list of bit numbers, as used by the OS/2 flag fields.
    fn bit_list(&mut self, key: &str) -> Result<Option<Vec<u32>>, FontInfoError> {
        let Some(items) = self.array(key)? else {
            return Ok(None);
        };
        items
            .iter()
            .map(|v| match v {
                Plist::Integer(i) if (0..32).contains(i) => Ok(*i as u32),
                _ => Err(wrong_type(key, "array of bit numbers", v).into()),
            })
            .collect::<Result<Vec<_>, FontInfoError>>()
            .map(Some)
    }

    fn guidelines(&mut self, key: &str) -> Result<Vec<Guideline>, FontInfoError> {
        let Some(items) = self.array(key)? else {
            return Ok(Vec::new());
        };
        let mut identifiers = HashSet::new();
        let mut guidelines = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let mut g = match item {
                Plist::Dictionary(dict) => Fields(dict),
                other => return Err(wrong_type(key, "array of dictionaries", &other).into()),
            };
            let x = g.number("x")?;
            let y = g.number("y")?;
            let angle = g.number("angle")?;
            let line = Line::from_parts(
                x.map(|v| v.as_f64() as f32),
                y.map(|v| v.as_f64() as f32),
                angle.map(|v| v.as_f64() as f32),
            )
            .ok_or(FontInfoError::InvalidGuideline(i))?;
            let color = g.string("color")?.map(|c| c.parse::<Color>()).transpose()?;
            let identifier = g
                .string("identifier")?
                .map(|id| Identifier::new(&id))
                .transpose()?;
            if let Some(id) = &identifier {
                if !identifiers.insert(id.clone()) {
                    return Err(FontInfoError::DuplicateIdentifier(id.clone()));
                }
            }
            guidelines.push(Guideline {
                line,
                name: g.string("name")?,
                color,
                identifier,
            });
        }
        Ok(guidelines)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout::tests::plist_doc;

    fn info(body: &str) -> Result<FontInfo, FontInfoError> {
        let dict = Plist::parse_dict(plist_doc(body).as_bytes()).unwrap();
        FontInfo::from_dict(dict)
    }

    #[test]
    fn typed_and_other_fields() {
        let info = info(
            r#"<dict>
            <key>familyName</key><string>Test Sans</string>
            <key>styleMapStyleName</key><string>bold italic</string>
            <key>unitsPerEm</key><integer>1000</integer>
            <key>xHeight</key><real>500.5</real>
            <key>italicAngle</key><integer>-12</integer>
            <key>versionMajor</key><integer>2</integer>
            <key>versionMinor</key><integer>7</integer>
            <key>openTypeOS2Selection</key><array><integer>7</integer></array>
            <key>postscriptBlueValues</key><array><integer>-10</integer><real>0.5</real></array>
            <key>postscriptIsFixedPitch</key><false/>
            <key>com.example.custom</key><string>kept</string>
            <key>openTypeNameRecords</key><array/>
            </dict>"#,
        )
        .unwrap();
        assert_eq!(info.family_name.as_deref(), Some("Test Sans"));
        assert_eq!(info.style_map_style_name, Some(StyleMapStyle::BoldItalic));
        assert_eq!(info.units_per_em, Some(IntegerOrFloat::Integer(1000)));
        assert_eq!(info.x_height, Some(IntegerOrFloat::Float(500.5)));
        assert_eq!(info.italic_angle.map(|a| a.as_f64()), Some(-12.0));
        assert_eq!((info.version_major, info.version_minor), (Some(2), Some(7)));
        assert_eq!(info.open_type_os2_selection, Some(vec![7]));
        assert_eq!(
            info.postscript_blue_values,
            Some(vec![IntegerOrFloat::Integer(-10), IntegerOrFloat::Float(0.5)])
        );
        assert_eq!(info.postscript_is_fixed_pitch, Some(false));
        assert_eq!(
            info.other.keys().collect::<Vec<_>>(),
            vec!["com.example.custom", "openTypeNameRecords"]
        );
    }

    #[test]
    fn guidelines() {
        let info = info(
            r#"<dict><key>guidelines</key><array>
            <dict><key>x</key><integer>10</integer><key>name</key><string>left</string></dict>
            <dict><key>x</key><integer>1</integer><key>y</key><integer>2</integer>
                  <key>angle</key><real>30</real><key>identifier</key><string>g2</string>
                  <key>color</key><string>0,0,0,1</string></dict>
            </array></dict>"#,
        )
        .unwrap();
        assert_eq!(info.guidelines.len(), 2);
        assert_eq!(info.guidelines[0].line, Line::Vertical(10.0));
        assert_eq!(info.guidelines[0].name.as_deref(), Some("left"));
        assert_eq!(info.guidelines[1].angle(), Some(30.0));
        assert_eq!(info.guidelines[1].identifier.as_ref().unwrap().as_str(), "g2");
    }

    #[test]
    fn angle_only_guideline() {
        let err = info(
            r#"<dict><key>guidelines</key><array>
            <dict><key>angle</key><integer>45</integer></dict>
            </array></dict>"#,
        )
        .unwrap_err();
        assert!(matches!(err, FontInfoError::InvalidGuideline(0)), "{err}");
    }

    #[test]
    fn wrong_kinds() {
        assert!(matches!(
            info("<dict><key>familyName</key><integer>1</integer></dict>"),
            Err(FontInfoError::Plist(PlistError::UnexpectedFieldType { .. }))
        ));
        assert!(matches!(
            info("<dict><key>unitsPerEm</key><string>1000</string></dict>"),
            Err(FontInfoError::Plist(PlistError::UnexpectedFieldType { .. }))
        ));
        assert!(matches!(
            info("<dict><key>unitsPerEm</key><integer>-1</integer></dict>"),
            Err(FontInfoError::Negative { key: "unitsPerEm" })
        ));
        assert!(matches!(
            info("<dict><key>styleMapStyleName</key><string>heavy</string></dict>"),
            Err(FontInfoError::InvalidStyleMapStyle(_))
        ));
        assert!(matches!(
            info("<dict><key>openTypeOS2Type</key><array><integer>40</integer></array></dict>"),
            Err(FontInfoError::Plist(_))
        ));
    }
}
