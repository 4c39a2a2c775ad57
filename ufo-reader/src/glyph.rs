//! The glyph object model.
//!
//! All geometry is stored as `f32`. See [`crate::compare`] for how values are
//! compared against implementations that keep doubles.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::plist::{Dictionary, Plist};
use crate::types::{Color, GlyphName, Identifier};

/// The glyph lib key holding per-element data keyed by identifier.
pub const OBJECT_LIBS_KEY: &str = "public.objectLibs";

/// The version of the glif dialect a glyph was read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlifVersion {
    V1,
    #[default]
    V2,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub name: GlyphName,
    pub format: GlifVersion,
    pub width: f32,
    pub height: f32,
    /// In file order; duplicates are kept.
    pub codepoints: Vec<char>,
    pub note: Option<String>,
    pub image: Option<Image>,
    pub guidelines: Vec<Guideline>,
    pub anchors: Vec<Anchor>,
    pub components: Vec<Component>,
    pub contours: Vec<Contour>,
    pub lib: Dictionary,
}

impl Glyph {
    pub fn new(name: impl Into<GlyphName>) -> Self {
        Glyph {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every identifier used by an element of this glyph.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.anchors
            .iter()
            .filter_map(|a| a.identifier.as_ref())
            .chain(self.guidelines.iter().filter_map(|g| g.identifier.as_ref()))
            .chain(self.components.iter().filter_map(|c| c.identifier.as_ref()))
            .chain(self.contours.iter().flat_map(|c| {
                c.identifier
                    .iter()
                    .chain(c.points.iter().filter_map(|p| p.identifier.as_ref()))
            }))
    }

    /// The per-element data stored under [`OBJECT_LIBS_KEY`], if any.
    pub fn object_libs(&self) -> Option<&Dictionary> {
        self.lib.get(OBJECT_LIBS_KEY).and_then(Plist::as_dict)
    }

    /// Drop object lib entries whose identifier is not used in this glyph.
    ///
    /// Returns the number of entries removed.
    pub fn prune_object_libs(&mut self) -> usize {
        let present: HashSet<&str> = self.identifiers().map(Identifier::as_str).collect();
        let Some(Plist::Dictionary(libs)) = self.lib.get(OBJECT_LIBS_KEY) else {
            return 0;
        };
        let stale: Vec<String> = libs
            .keys()
            .filter(|k| !present.contains(k.as_str()))
            .cloned()
            .collect();
        if stale.is_empty() {
            return 0;
        }
        if let Some(Plist::Dictionary(libs)) = self.lib.get_mut(OBJECT_LIBS_KEY) {
            libs.retain(|k, _| !stale.contains(k));
        }
        stale.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub color: Option<Color>,
    pub identifier: Option<Identifier>,
}

/// A reference to another glyph, placed with an affine transform.
///
/// The base glyph is referenced by name only; it is not resolved here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub base: GlyphName,
    pub transform: AffineTransform,
    pub identifier: Option<Identifier>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub x_scale: f32,
    pub xy_scale: f32,
    pub yx_scale: f32,
    pub y_scale: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        x_scale: 1.0,
        xy_scale: 0.0,
        yx_scale: 0.0,
        y_scale: 1.0,
        x_offset: 0.0,
        y_offset: 0.0,
    };

    /// The six values in `(xx, xy, yx, yy, dx, dy)` order.
    pub fn as_coeffs(&self) -> [f32; 6] {
        [
            self.x_scale,
            self.xy_scale,
            self.yx_scale,
            self.y_scale,
            self.x_offset,
            self.y_offset,
        ]
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.x_scale * x + self.yx_scale * y + self.x_offset,
            self.xy_scale * x + self.y_scale * y + self.y_offset,
        )
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<ContourPoint>,
    pub identifier: Option<Identifier>,
}

impl Contour {
    /// A contour is closed unless it starts with a `move` point.
    pub fn is_closed(&self) -> bool {
        self.points
            .first()
            .map_or(true, |p| p.typ != PointType::Move)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourPoint {
    pub x: f32,
    pub y: f32,
    pub typ: PointType,
    pub smooth: bool,
    pub name: Option<String>,
    pub identifier: Option<Identifier>,
}

impl ContourPoint {
    pub fn new(x: f32, y: f32, typ: PointType) -> Self {
        ContourPoint {
            x,
            y,
            typ,
            smooth: false,
            name: None,
            identifier: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointType {
    /// Starts an open contour; only valid as the first point.
    Move,
    Line,
    #[default]
    OffCurve,
    Curve,
    QCurve,
}

impl PointType {
    pub fn is_on_curve(&self) -> bool {
        !matches!(self, PointType::OffCurve)
    }

    /// The `type` attribute value, `None` for off-curve points.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            PointType::Move => Some("move"),
            PointType::Line => Some("line"),
            PointType::OffCurve => None,
            PointType::Curve => Some("curve"),
            PointType::QCurve => Some("qcurve"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    pub line: Line,
    pub name: Option<String>,
    pub color: Option<Color>,
    pub identifier: Option<Identifier>,
}

impl Guideline {
    pub fn x(&self) -> Option<f32> {
        match self.line {
            Line::Vertical(x) | Line::Angle { x, .. } => Some(x),
            Line::Horizontal(_) => None,
        }
    }

    pub fn y(&self) -> Option<f32> {
        match self.line {
            Line::Horizontal(y) | Line::Angle { y, .. } => Some(y),
            Line::Vertical(_) => None,
        }
    }

    pub fn angle(&self) -> Option<f32> {
        match self.line {
            Line::Angle { degrees, .. } => Some(degrees),
            _ => None,
        }
    }
}

/// The geometry of a guideline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Line {
    Vertical(f32),
    Horizontal(f32),
    Angle { x: f32, y: f32, degrees: f32 },
}

impl Line {
    /// Build a line from the optional `x`, `y` and `angle` attributes.
    ///
    /// Valid combinations are `x` alone, `y` alone, or all three with an
    /// angle in `0..=360`.
    pub fn from_parts(x: Option<f32>, y: Option<f32>, angle: Option<f32>) -> Option<Line> {
        match (x, y, angle) {
            (Some(x), None, None) => Some(Line::Vertical(x)),
            (None, Some(y), None) => Some(Line::Horizontal(y)),
            (Some(x), Some(y), Some(degrees)) if (0.0..=360.0).contains(&degrees) => {
                Some(Line::Angle { x, y, degrees })
            }
            _ => None,
        }
    }
}

/// A reference from a glyph to a file in the package's images store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub file_name: String,
    pub transform: AffineTransform,
    pub color: Option<Color>,
}
