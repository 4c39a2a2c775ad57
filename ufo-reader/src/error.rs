use std::{io, path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::fontinfo::FontInfoError;
use crate::glif::GlifError;
use crate::plist::PlistError;
use crate::types::{GlyphName, Name};

/// Anything that can go wrong opening a font or touching one of its parts.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("malformed plist '{path}': {source}")]
    Plist {
        path: PathBuf,
        #[source]
        source: PlistError,
    },
    #[error("unable to parse glyph file '{path}': {source}")]
    Glif {
        path: PathBuf,
        #[source]
        source: GlifError,
    },
    #[error("invalid font info in '{path}': {source}")]
    FontInfo {
        path: PathBuf,
        #[source]
        source: FontInfoError,
    },
    #[error("invalid groups in '{path}': {source}")]
    Groups {
        path: PathBuf,
        #[source]
        source: GroupsError,
    },
    #[error("invalid file '{path}': {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
    #[error("io failed for '{path}': '{source}'")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("no glyph '{glyph}' in layer '{layer}'")]
    GlyphNotFound { layer: Name, glyph: GlyphName },
    #[error("no layer named '{0}'")]
    LayerNotFound(Name),
    #[error("no file '{0}' in store")]
    DataNotFound(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn plist(path: impl Into<PathBuf>, source: PlistError) -> Self {
        Error::Plist {
            path: path.into(),
            source,
        }
    }
}

/// Structural problems with the package itself.
///
/// These are always discovered while opening and always abort the load.
#[derive(Clone, Debug, Error)]
pub enum LayoutError {
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
    #[error("missing format marker '{0}'")]
    MissingMetaInfo(PathBuf),
    #[error("unsupported format version {0}")]
    UnsupportedFormatVersion(i64),
    #[error("missing layer registry '{0}'")]
    MissingLayerContents(PathBuf),
    #[error("malformed registry '{path}': {reason}")]
    MalformedRegistry { path: PathBuf, reason: &'static str },
    #[error("layer name '{0}' is used more than once")]
    DuplicateLayerName(Name),
    #[error("layer directory '{0}' is used more than once")]
    DuplicateLayerDirectory(String),
    #[error("layer '{layer}' has an invalid directory name '{dir}'")]
    InvalidLayerDirectory { layer: Name, dir: String },
    #[error("missing layer directory '{0}'")]
    MissingLayerDirectory(PathBuf),
    #[error("no layer is stored in the default 'glyphs' directory")]
    MissingDefaultLayer,
    #[error("more than one layer is stored in the default 'glyphs' directory")]
    MultipleDefaultLayers,
    #[error("missing glyph registry '{0}'")]
    MissingGlyphRegistry(PathBuf),
    #[error("glyph '{glyph}' is declared more than once in layer '{layer}'")]
    DuplicateGlyphName { layer: Name, glyph: GlyphName },
    #[error("glyphs '{first}' and '{second}' in layer '{layer}' share the file '{file}'")]
    DuplicateGlyphFile {
        layer: Name,
        first: GlyphName,
        second: GlyphName,
        file: String,
    },
    #[error("glyph '{glyph}' in layer '{layer}' has an invalid file name '{file}'")]
    InvalidGlyphFileName {
        layer: Name,
        glyph: GlyphName,
        file: String,
    },
    #[error("glyph '{glyph}' in layer '{layer}' points to missing file '{path}'")]
    MissingGlyphFile {
        layer: Name,
        glyph: GlyphName,
        path: PathBuf,
    },
}

#[derive(Clone, Debug, Error)]
pub enum GroupsError {
    #[error("group '{group}' has a non-string member")]
    NonStringMember { group: Name },
    #[error("group '{0}' is not an array")]
    NotAnArray(Name),
    #[error("glyph '{glyph}' is in both '{first}' and '{second}'")]
    OverlappingKerningGroups {
        glyph: GlyphName,
        first: Name,
        second: Name,
    },
}

#[derive(Clone, Debug, Error)]
pub enum StoreError {
    #[error("image is not a PNG file")]
    InvalidImage,
}
