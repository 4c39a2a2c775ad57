//! Lazy, memoizing reader for Unified Font Object (.ufo) source packages.
//!
//! Opening a package reads its layout and the small font-wide files. Glyphs,
//! layer info, data files and images are parsed on first access and then
//! shared; [`LoadPolicy::Eager`] reads them all up front instead.

mod cache;
pub mod compare;
mod datastore;
pub mod error;
mod font;
mod fontinfo;
mod glif;
mod glyph;
mod groups;
mod layer;
mod layout;
mod options;
pub mod plist;
mod types;
mod xml;

use std::path::Path;

pub use cache::{LazySlot, LoadStats};
pub use datastore::{DataStore, FileStore, ImageStore, StoreKind};
pub use error::Error;
pub use font::Font;
pub use fontinfo::{FontInfo, FontInfoError, IntegerOrFloat, StyleMapStyle};
pub use glif::{parse_glyph, GlifError, GlifErrorKind};
pub use glyph::{
    AffineTransform, Anchor, Component, Contour, ContourPoint, GlifVersion, Glyph, Guideline,
    Image, Line, PointType, OBJECT_LIBS_KEY,
};
pub use groups::{
    groups_from_dict, kerning_from_dict, Groups, Kerning, KerningPair, KERN1_PREFIX, KERN2_PREFIX,
};
pub use layer::{GlyphIter, GlyphStore, Layer, LayerInfo, LayerSet, MaterializationPolicy};
pub use layout::{FormatVersion, MetaInfo, DEFAULT_LAYER_NAME};
pub use options::{LoadFlags, LoadOptions, LoadPolicy};
pub use plist::{Dictionary, Plist, PlistError};
pub use types::{Color, GlyphName, Identifier, InvalidColor, InvalidIdentifier, Name};
pub use xml::Position;

/// Open the package at `path`, reading everything up front if `eager`.
pub fn load(path: impl AsRef<Path>, eager: bool) -> Result<Font, Error> {
    Font::open(path, LoadOptions::from(eager))
}
