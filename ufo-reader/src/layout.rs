//! Discovering what a package contains and where, without reading content.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Error, LayoutError};
use crate::plist::{Dictionary, Plist, PlistError};
use crate::types::{GlyphName, Name};

pub const METAINFO_FILE: &str = "metainfo.plist";
pub const LAYER_CONTENTS_FILE: &str = "layercontents.plist";
pub const CONTENTS_FILE: &str = "contents.plist";
pub const LAYER_INFO_FILE: &str = "layerinfo.plist";
pub const FONTINFO_FILE: &str = "fontinfo.plist";
pub const GROUPS_FILE: &str = "groups.plist";
pub const KERNING_FILE: &str = "kerning.plist";
pub const LIB_FILE: &str = "lib.plist";
pub const FEATURES_FILE: &str = "features.fea";
pub const DATA_DIR: &str = "data";
pub const IMAGES_DIR: &str = "images";

/// The directory that holds the default layer.
pub const DEFAULT_GLYPHS_DIRNAME: &str = "glyphs";
/// The name given to the default layer of packages without a layer registry.
pub const DEFAULT_LAYER_NAME: &str = "public.default";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    V2,
    V3,
}

impl FormatVersion {
    pub fn as_i64(&self) -> i64 {
        match self {
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }
}

/// The contents of `metainfo.plist`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaInfo {
    pub creator: Option<String>,
    pub format_version: FormatVersion,
    pub format_version_minor: u32,
}

/// One declared layer and its glyph registry.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerEntry {
    pub name: Name,
    /// The directory name as written in the registry
    pub dir_name: String,
    pub path: PathBuf,
    /// Glyph name to glif path, in registry order
    pub glyphs: IndexMap<GlyphName, PathBuf>,
}

/// The validated shape of a package on disk.
#[derive(Clone, Debug)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub meta: MetaInfo,
    pub layers: Vec<LayerEntry>,
    pub default_layer_index: usize,
}

impl PackageLayout {
    pub fn open(root: impl AsRef<Path>) -> Result<PackageLayout, Error> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(LayoutError::NotADirectory(root.to_path_buf()).into());
        }
        let meta = read_meta_info(root)?;

        let declared = match meta.format_version {
            FormatVersion::V3 => read_layer_contents(root)?,
            FormatVersion::V2 => vec![(
                Name::new(DEFAULT_LAYER_NAME),
                DEFAULT_GLYPHS_DIRNAME.to_string(),
            )],
        };

        let default_layer_index = declared
            .iter()
            .position(|(_, dir)| dir == DEFAULT_GLYPHS_DIRNAME)
            .ok_or(LayoutError::MissingDefaultLayer)?;

        let layers = declared
            .into_iter()
            .map(|(name, dir_name)| read_layer_entry(root, name, dir_name))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "{}: format {}.{}, {} layer(s), {} glyph(s) in the default layer",
            root.display(),
            meta.format_version.as_i64(),
            meta.format_version_minor,
            layers.len(),
            layers[default_layer_index].glyphs.len()
        );
        Ok(PackageLayout {
            root: root.to_path_buf(),
            meta,
            layers,
            default_layer_index,
        })
    }

    pub fn default_layer(&self) -> &LayerEntry {
        &self.layers[self.default_layer_index]
    }
}

/// Read and decode a plist file, `None` if it does not exist.
pub(crate) fn read_plist_file(path: &Path) -> Result<Option<Plist>, Error> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    Plist::parse(&bytes)
        .map(Some)
        .map_err(|e| Error::plist(path, e))
}

/// As [`read_plist_file`], for files whose root must be a dictionary.
pub(crate) fn read_dict_file(path: &Path) -> Result<Option<Dictionary>, Error> {
    read_plist_file(path)?
        .map(|plist| plist.expect_dict().map_err(|e| Error::plist(path, e)))
        .transpose()
}

fn read_meta_info(root: &Path) -> Result<MetaInfo, Error> {
    let path = root.join(METAINFO_FILE);
    let mut dict = read_dict_file(&path)?.ok_or(LayoutError::MissingMetaInfo(path.clone()))?;

    let format_version = match dict.get("formatVersion") {
        Some(Plist::Integer(2)) => FormatVersion::V2,
        Some(Plist::Integer(3)) => FormatVersion::V3,
        Some(Plist::Integer(other)) => {
            return Err(LayoutError::UnsupportedFormatVersion(*other).into())
        }
        other => {
            return Err(Error::plist(
                &path,
                PlistError::UnexpectedFieldType {
                    key: "formatVersion".into(),
                    expected: "integer",
                    found: other.map_or("nothing", Plist::name),
                },
            ))
        }
    };
    let format_version_minor = match dict.get("formatVersionMinor") {
        None => 0,
        Some(Plist::Integer(minor)) if *minor >= 0 => *minor as u32,
        Some(other) => {
            return Err(Error::plist(
                &path,
                PlistError::UnexpectedFieldType {
                    key: "formatVersionMinor".into(),
                    expected: "non-negative integer",
                    found: other.name(),
                },
            ))
        }
    };
    let creator = match dict.shift_remove("creator") {
        None => None,
        Some(Plist::String(creator)) => Some(creator),
        Some(other) => {
            return Err(Error::plist(
                &path,
                PlistError::UnexpectedFieldType {
                    key: "creator".into(),
                    expected: "string",
                    found: other.name(),
                },
            ))
        }
    };
    Ok(MetaInfo {
        creator,
        format_version,
        format_version_minor,
    })
}

/// The ordered `(layer name, directory name)` pairs of a v3 package.
fn read_layer_contents(root: &Path) -> Result<Vec<(Name, String)>, Error> {
    let path = root.join(LAYER_CONTENTS_FILE);
    let registry = read_plist_file(&path)?
        .ok_or_else(|| LayoutError::MissingLayerContents(path.clone()))?;
    let malformed = |reason| LayoutError::MalformedRegistry {
        path: path.clone(),
        reason,
    };
    let Plist::Array(entries) = registry else {
        return Err(malformed("the root must be an array").into());
    };

    let mut names = HashSet::new();
    let mut dirs = HashSet::new();
    let mut layers = Vec::with_capacity(entries.len());
    for entry in entries {
        let [Plist::String(name), Plist::String(dir)] = entry.as_array().unwrap_or_default() else {
            return Err(malformed("each entry must be a pair of strings").into());
        };
        if !names.insert(name.clone()) {
            return Err(LayoutError::DuplicateLayerName(name.as_str().into()).into());
        }
        if !is_plain_file_name(dir) {
            return Err(LayoutError::InvalidLayerDirectory {
                layer: name.as_str().into(),
                dir: dir.clone(),
            }
            .into());
        }
        if !dirs.insert(dir.clone()) {
            if dir == DEFAULT_GLYPHS_DIRNAME {
                return Err(LayoutError::MultipleDefaultLayers.into());
            }
            return Err(LayoutError::DuplicateLayerDirectory(dir.clone()).into());
        }
        layers.push((Name::new(name), dir.clone()));
    }
    Ok(layers)
}

fn read_layer_entry(root: &Path, name: Name, dir_name: String) -> Result<LayerEntry, Error> {
    let path = root.join(&dir_name);
    if !path.is_dir() {
        return Err(LayoutError::MissingLayerDirectory(path).into());
    }
    let glyphs = read_glyph_registry(&path, &name)?;
    Ok(LayerEntry {
        name,
        dir_name,
        path,
        glyphs,
    })
}

/// Read `contents.plist`, checking every entry points at a distinct,
/// existing file.
fn read_glyph_registry(dir: &Path, layer: &Name) -> Result<IndexMap<GlyphName, PathBuf>, Error> {
    let path = dir.join(CONTENTS_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LayoutError::MissingGlyphRegistry(path).into())
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    let registry = match Plist::parse_dict(&bytes) {
        Ok(registry) => registry,
        Err(PlistError::DuplicateKey { key, .. }) => {
            return Err(LayoutError::DuplicateGlyphName {
                layer: layer.clone(),
                glyph: key.into(),
            }
            .into())
        }
        Err(e) => return Err(Error::plist(path, e)),
    };
    if registry.is_empty() {
        warn!("{:?} is empty", path);
    }

    // file names are compared the way a case-insensitive file system would
    let mut files: IndexMap<String, GlyphName> = IndexMap::with_capacity(registry.len());
    let mut glyphs = IndexMap::with_capacity(registry.len());
    for (glyph, file) in registry {
        let glyph = GlyphName::from(glyph);
        let Plist::String(file) = file else {
            return Err(LayoutError::MalformedRegistry {
                path,
                reason: "glyph file names must be strings",
            }
            .into());
        };
        if !is_plain_file_name(&file) {
            return Err(LayoutError::InvalidGlyphFileName {
                layer: layer.clone(),
                glyph,
                file,
            }
            .into());
        }
        if let Some(first) = files.get(&file.to_lowercase()) {
            return Err(LayoutError::DuplicateGlyphFile {
                layer: layer.clone(),
                first: first.clone(),
                second: glyph,
                file,
            }
            .into());
        }
        let glif = dir.join(&file);
        if !glif.is_file() {
            return Err(LayoutError::MissingGlyphFile {
                layer: layer.clone(),
                glyph,
                path: glif,
            }
            .into());
        }
        files.insert(file.to_lowercase(), glyph.clone());
        glyphs.insert(glyph, glif);
    }
    Ok(glyphs)
}

fn is_plain_file_name(file: &str) -> bool {
    !file.is_empty()
        && file != "."
        && file != ".."
        && !file.contains(['/', '\\'])
        && !Path::new(file).is_absolute()
}
