//! Comparing fonts whose numbers may have passed through different precisions.
//!
//! Geometry is kept as `f32`. Implementations that keep `f64` will disagree in
//! the last bits, so two values are considered equal when their relative
//! difference is at most [`REL_TOLERANCE`].

use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::Error;
use crate::fontinfo::{FontInfo, IntegerOrFloat};
use crate::font::Font;
use crate::glyph::{
    AffineTransform, Anchor, Component, Contour, ContourPoint, Glyph, Guideline, Image, Line,
};
use crate::groups::{Groups, Kerning};
use crate::layer::GlyphStore;
use crate::plist::{Dictionary, Plist};
use crate::types::{Color, Name};

pub const REL_TOLERANCE: f64 = 1e-7;

pub fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= REL_TOLERANCE * a.abs().max(b.abs())
}

/// The integer a number stands for, if it is one, else the float.
///
/// This is how coordinates are presented to consumers that distinguish the
/// two: `100.0` becomes `Integer(100)`.
pub fn canonical_number(value: f64) -> IntegerOrFloat {
    if (value - value.round()).abs() < f64::EPSILON && value.abs() < i64::MAX as f64 {
        IntegerOrFloat::Integer(value.round() as i64)
    } else {
        IntegerOrFloat::Float(value as f32)
    }
}

/// Equality with tolerance on every number.
pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f32 {
    fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(*self as f64, *other as f64)
    }
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(*self, *other)
    }
}

impl ApproxEq for IntegerOrFloat {
    fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(self.as_f64(), other.as_f64())
    }
}

impl<T: ApproxEq> ApproxEq for Option<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.approx_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ApproxEq> ApproxEq for [T] {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

impl<T: ApproxEq> ApproxEq for Vec<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.as_slice().approx_eq(other.as_slice())
    }
}

/// Keys must match exactly and in the same order.
impl<K: Eq + Hash, V: ApproxEq> ApproxEq for IndexMap<K, V> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|((ka, va), (kb, vb))| ka == kb && va.approx_eq(vb))
    }
}

impl ApproxEq for Plist {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Plist::Real(a), Plist::Real(b)) => approx_eq(a.into_inner(), b.into_inner()),
            (Plist::Array(a), Plist::Array(b)) => a.approx_eq(b),
            (Plist::Dictionary(a), Plist::Dictionary(b)) => a.approx_eq(b),
            (a, b) => a == b,
        }
    }
}

impl ApproxEq for Color {
    fn approx_eq(&self, other: &Self) -> bool {
        self.red.approx_eq(&other.red)
            && self.green.approx_eq(&other.green)
            && self.blue.approx_eq(&other.blue)
            && self.alpha.approx_eq(&other.alpha)
    }
}

impl ApproxEq for AffineTransform {
    fn approx_eq(&self, other: &Self) -> bool {
        self.as_coeffs().approx_eq(&other.as_coeffs())
    }
}

impl<const N: usize> ApproxEq for [f32; N] {
    fn approx_eq(&self, other: &Self) -> bool {
        self[..].approx_eq(&other[..])
    }
}

impl ApproxEq for Anchor {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.identifier == other.identifier
            && self.x.approx_eq(&other.x)
            && self.y.approx_eq(&other.y)
            && self.color.approx_eq(&other.color)
    }
}

impl ApproxEq for Component {
    fn approx_eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.identifier == other.identifier
            && self.transform.approx_eq(&other.transform)
    }
}

impl ApproxEq for ContourPoint {
    fn approx_eq(&self, other: &Self) -> bool {
        self.typ == other.typ
            && self.smooth == other.smooth
            && self.name == other.name
            && self.identifier == other.identifier
            && self.x.approx_eq(&other.x)
            && self.y.approx_eq(&other.y)
    }
}

impl ApproxEq for Contour {
    fn approx_eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.points.approx_eq(&other.points)
    }
}

impl ApproxEq for Line {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Line::Vertical(a), Line::Vertical(b)) | (Line::Horizontal(a), Line::Horizontal(b)) => {
                a.approx_eq(b)
            }
            (
                Line::Angle { x, y, degrees },
                Line::Angle {
                    x: x2,
                    y: y2,
                    degrees: degrees2,
                },
            ) => x.approx_eq(x2) && y.approx_eq(y2) && degrees.approx_eq(degrees2),
            _ => false,
        }
    }
}

impl ApproxEq for Guideline {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.identifier == other.identifier
            && self.line.approx_eq(&other.line)
            && self.color.approx_eq(&other.color)
    }
}

impl ApproxEq for Image {
    fn approx_eq(&self, other: &Self) -> bool {
        self.file_name == other.file_name
            && self.transform.approx_eq(&other.transform)
            && self.color.approx_eq(&other.color)
    }
}

impl ApproxEq for Glyph {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.format == other.format
            && self.codepoints == other.codepoints
            && self.note == other.note
            && self.width.approx_eq(&other.width)
            && self.height.approx_eq(&other.height)
            && self.image.approx_eq(&other.image)
            && self.guidelines.approx_eq(&other.guidelines)
            && self.anchors.approx_eq(&other.anchors)
            && self.components.approx_eq(&other.components)
            && self.contours.approx_eq(&other.contours)
            && self.lib.approx_eq(&other.lib)
    }
}

/// One fully read layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSnapshot {
    pub name: Name,
    pub color: Option<Color>,
    pub lib: Dictionary,
    pub glyphs: Vec<Glyph>,
}

impl ApproxEq for LayerSnapshot {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.color.approx_eq(&other.color)
            && self.lib.approx_eq(&other.lib)
            && self.glyphs.approx_eq(&other.glyphs)
    }
}

/// An owned copy of everything in a font, reading whatever is not loaded yet.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSnapshot {
    pub font_info: FontInfo,
    pub layers: Vec<LayerSnapshot>,
    pub default_layer: Name,
    pub lib: Dictionary,
    pub groups: Groups,
    pub kerning: Kerning,
    pub features: String,
    pub data: Vec<(String, Vec<u8>)>,
    pub images: Vec<(String, Vec<u8>)>,
}

impl FontSnapshot {
    pub fn capture(font: &Font) -> Result<FontSnapshot, Error> {
        let layers = font
            .layers
            .iter()
            .map(|layer| {
                let info = layer.info()?;
                let glyphs = layer
                    .iter()
                    .map(|(_, glyph)| glyph.map(|g| Glyph::clone(&g)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LayerSnapshot {
                    name: layer.name().clone(),
                    color: info.color,
                    lib: info.lib.clone(),
                    glyphs,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let files = |store: &crate::datastore::FileStore| {
            store
                .list_paths()
                .map(|path| Ok((path.to_string(), store.get(path)?.to_vec())))
                .collect::<Result<Vec<_>, Error>>()
        };
        Ok(FontSnapshot {
            font_info: font.font_info.clone(),
            layers,
            default_layer: font.default_layer().name().clone(),
            lib: font.lib.clone(),
            groups: font.groups.clone(),
            kerning: font.kerning.clone(),
            features: font.features.clone(),
            data: files(&font.data)?,
            images: files(&font.images)?,
        })
    }
}

impl ApproxEq for FontSnapshot {
    fn approx_eq(&self, other: &Self) -> bool {
        self.font_info == other.font_info
            && self.default_layer == other.default_layer
            && self.groups == other.groups
            && self.features == other.features
            && self.data == other.data
            && self.images == other.images
            && self.layers.approx_eq(&other.layers)
            && self.lib.approx_eq(&other.lib)
            && self.kerning.approx_eq(&other.kerning)
    }
}
