//! The root of the object graph.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::cache::LoadStats;
use crate::datastore::{DataStore, FileStore, ImageStore, StoreKind};
use crate::error::Error;
use crate::fontinfo::FontInfo;
use crate::glyph::Glyph;
use crate::groups::{read_groups, read_kerning, Groups, Kerning};
use crate::layer::{GlyphIter, GlyphStore, Layer, LayerSet, MaterializationPolicy};
use crate::layout::{
    read_dict_file, MetaInfo, PackageLayout, DATA_DIR, FEATURES_FILE, FONTINFO_FILE, GROUPS_FILE,
    IMAGES_DIR, KERNING_FILE, LIB_FILE,
};
use crate::options::{LoadFlags, LoadOptions};
use crate::plist::Dictionary;
use crate::types::GlyphName;

/// A font source package.
///
/// The small font-wide files are decoded while opening. Glyphs, layer info,
/// data files and images are read when first touched, or while opening when
/// the package is opened eagerly; either way the result is the same.
#[derive(Debug)]
pub struct Font {
    pub meta: MetaInfo,
    pub font_info: FontInfo,
    pub layers: LayerSet,
    pub lib: Dictionary,
    pub groups: Groups,
    pub kerning: Kerning,
    /// The feature file source, empty if there is none
    pub features: String,
    pub data: DataStore,
    pub images: ImageStore,
    path: PathBuf,
    options: LoadOptions,
    stats: Arc<LoadStats>,
}

impl Font {
    /// Open lazily with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Font, Error> {
        Font::open(path, LoadOptions::default())
    }

    pub fn open(path: impl AsRef<Path>, options: LoadOptions) -> Result<Font, Error> {
        let start = Instant::now();
        let layout = PackageLayout::open(path)?;
        let root = layout.root;
        let stats = Arc::new(LoadStats::default());

        let font_info = FontInfo::read(&root.join(FONTINFO_FILE))?;
        let lib = read_dict_file(&root.join(LIB_FILE))?.unwrap_or_default();
        let groups = read_groups(&root.join(GROUPS_FILE))?;
        let kerning = read_kerning(&root.join(KERNING_FILE))?;
        let features = read_features(&root.join(FEATURES_FILE))?;

        let layers = layout
            .layers
            .into_iter()
            .map(|entry| Layer::from_entry(entry, stats.clone()))
            .collect();
        let layers = LayerSet::new(layers, layout.default_layer_index);

        let data = open_store(&root, StoreKind::Data, options, &stats)?;
        let images = open_store(&root, StoreKind::Images, options, &stats)?;

        for layer in layers.iter() {
            options.policy.prepare(layer, options.flags)?;
        }
        if options.is_eager() {
            let parallel = options.flags.contains(LoadFlags::PARALLEL);
            data.preload(parallel)?;
            images.preload(parallel)?;
        }

        debug!(
            "opened {} ({:?}) in {:.1?}: {} layer(s), {} data file(s), {} image(s)",
            root.display(),
            options.policy,
            start.elapsed(),
            layers.len(),
            data.len(),
            images.len()
        );
        Ok(Font {
            meta: layout.meta,
            font_info,
            layers,
            lib,
            groups,
            kerning,
            features,
            data,
            images,
            path: root,
            options,
            stats,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// What has actually been read from disk so far.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn default_layer(&self) -> &Layer {
        self.layers.default_layer()
    }

    pub fn default_layer_mut(&mut self) -> &mut Layer {
        self.layers.default_layer_mut()
    }

    /// Shorthand for iterating the default layer.
    pub fn iter_glyphs(&self) -> GlyphIter<'_> {
        self.default_layer().iter()
    }
}

impl GlyphStore for Font {
    fn get_glyph(&self, name: &str) -> Result<Arc<Glyph>, Error> {
        self.default_layer().get_glyph(name)
    }

    fn glyph_count(&self) -> usize {
        self.default_layer().glyph_count()
    }

    fn contains(&self, name: &str) -> bool {
        self.default_layer().contains(name)
    }

    fn glyph_names(&self) -> Box<dyn Iterator<Item = &GlyphName> + '_> {
        self.default_layer().glyph_names()
    }

    fn iter(&self) -> GlyphIter<'_> {
        self.iter_glyphs()
    }
}

fn read_features(path: &Path) -> Result<String, Error> {
    match fs::read_to_string(path) {
        Ok(features) => Ok(features),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn open_store(
    root: &Path,
    kind: StoreKind,
    options: LoadOptions,
    stats: &Arc<LoadStats>,
) -> Result<FileStore, Error> {
    let (dir, skip) = match kind {
        StoreKind::Data => (root.join(DATA_DIR), LoadFlags::SKIP_DATA),
        StoreKind::Images => (root.join(IMAGES_DIR), LoadFlags::SKIP_IMAGES),
    };
    if options.flags.contains(skip) {
        return Ok(FileStore::empty(kind, dir, stats.clone()));
    }
    FileStore::open(kind, dir, stats.clone())
}
