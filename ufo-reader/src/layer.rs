//! Layers whose glyphs are parsed on first access.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::trace;
use rayon::prelude::*;

use crate::cache::{LazySlot, LoadStats};
use crate::error::Error;
use crate::glif;
use crate::glyph::Glyph;
use crate::layout::{read_dict_file, LayerEntry, LAYER_INFO_FILE};
use crate::options::{LoadFlags, LoadPolicy};
use crate::plist::{Dictionary, Plist, PlistError};
use crate::types::{Color, GlyphName, Name};

/// Read access to a collection of glyphs, whatever has been loaded so far.
pub trait GlyphStore {
    /// Fails with [`Error::GlyphNotFound`] for names not in the registry.
    fn get_glyph(&self, name: &str) -> Result<Arc<Glyph>, Error>;

    /// The number of registered glyphs; never reads a glyph.
    fn glyph_count(&self) -> usize;

    fn contains(&self, name: &str) -> bool;

    fn glyph_names(&self) -> Box<dyn Iterator<Item = &GlyphName> + '_>;

    /// Glyphs in registry order, each loaded as it is reached.
    fn iter(&self) -> GlyphIter<'_>;
}

/// Decides what is read while a package is being opened.
pub trait MaterializationPolicy {
    fn prepare(&self, layer: &Layer, flags: LoadFlags) -> Result<(), Error>;
}

impl MaterializationPolicy for LoadPolicy {
    fn prepare(&self, layer: &Layer, flags: LoadFlags) -> Result<(), Error> {
        match self {
            LoadPolicy::Lazy => Ok(()),
            LoadPolicy::Eager => {
                layer.info()?;
                if flags.contains(LoadFlags::PARALLEL) {
                    layer
                        .glyphs
                        .par_iter()
                        .try_for_each(|(name, slot)| layer.load(name, slot).map(|_| ()))
                } else {
                    layer
                        .glyphs
                        .iter()
                        .try_for_each(|(name, slot)| layer.load(name, slot).map(|_| ()))
                }
            }
        }
    }
}

/// The contents of `layerinfo.plist`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerInfo {
    pub color: Option<Color>,
    pub lib: Dictionary,
}

impl LayerInfo {
    fn from_dict(mut dict: Dictionary) -> Result<LayerInfo, PlistError> {
        let color = match dict.shift_remove("color") {
            None => None,
            Some(Plist::String(color)) => Some(color.parse::<Color>().map_err(|_| {
                PlistError::UnexpectedFieldType {
                    key: "color".into(),
                    expected: "color string",
                    found: "string",
                }
            })?),
            Some(other) => {
                return Err(PlistError::UnexpectedFieldType {
                    key: "color".into(),
                    expected: "string",
                    found: other.name(),
                })
            }
        };
        let lib = match dict.shift_remove("lib") {
            None => Dictionary::new(),
            Some(Plist::Dictionary(lib)) => lib,
            Some(other) => {
                return Err(PlistError::UnexpectedFieldType {
                    key: "lib".into(),
                    expected: "dictionary",
                    found: other.name(),
                })
            }
        };
        Ok(LayerInfo { color, lib })
    }
}

#[derive(Debug)]
struct GlyphSlot {
    /// `None` for glyphs added in memory, which are always loaded
    path: Option<PathBuf>,
    glyph: LazySlot<Glyph>,
}

/// A named, ordered set of glyphs.
#[derive(Debug)]
pub struct Layer {
    name: Name,
    dir_name: String,
    path: PathBuf,
    glyphs: IndexMap<GlyphName, GlyphSlot>,
    info: LazySlot<LayerInfo>,
    stats: Arc<LoadStats>,
}

impl Layer {
    pub(crate) fn from_entry(entry: LayerEntry, stats: Arc<LoadStats>) -> Layer {
        let glyphs = entry
            .glyphs
            .into_iter()
            .map(|(name, path)| {
                let slot = GlyphSlot {
                    path: Some(path),
                    glyph: LazySlot::new(),
                };
                (name, slot)
            })
            .collect();
        Layer {
            name: entry.name,
            dir_name: entry.dir_name,
            path: entry.path,
            glyphs,
            info: LazySlot::new(),
            stats,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The layer's color and lib, read on first call.
    pub fn info(&self) -> Result<Arc<LayerInfo>, Error> {
        self.info.get_or_try_init(|| {
            let path = self.path.join(LAYER_INFO_FILE);
            self.stats.layer_info_read();
            match read_dict_file(&path)? {
                Some(dict) => LayerInfo::from_dict(dict).map_err(|e| Error::plist(&path, e)),
                None => Ok(LayerInfo::default()),
            }
        })
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.glyphs
            .get(name)
            .is_some_and(|slot| slot.glyph.is_loaded())
    }

    pub fn loaded_count(&self) -> usize {
        self.glyphs
            .values()
            .filter(|slot| slot.glyph.is_loaded())
            .count()
    }

    /// Add or replace a glyph.
    ///
    /// A replaced glyph keeps its position; a new one goes last. The glyph is
    /// never read from disk afterwards.
    pub fn insert_glyph(&mut self, glyph: impl Into<Arc<Glyph>>) {
        let glyph = glyph.into();
        let slot = GlyphSlot {
            path: None,
            glyph: LazySlot::loaded(glyph.clone()),
        };
        self.glyphs.insert(glyph.name.clone(), slot);
    }

    /// Remove a glyph, keeping the order of the rest. Returns whether it was
    /// present.
    pub fn remove_glyph(&mut self, name: &str) -> bool {
        self.glyphs.shift_remove(name).is_some()
    }

    /// Mutable access to a glyph, loading it first if needed.
    ///
    /// Copies on write if the glyph is shared with earlier callers of
    /// [`GlyphStore::get_glyph`]; they keep seeing what they were given.
    pub fn get_glyph_mut(&mut self, name: &str) -> Result<&mut Glyph, Error> {
        let Some((_, key, slot)) = self.glyphs.get_full_mut(name) else {
            return Err(Error::GlyphNotFound {
                layer: self.name.clone(),
                glyph: name.into(),
            });
        };
        let glyph = match &slot.path {
            Some(path) => slot
                .glyph
                .get_mut_or_try_init(|| read_glyph(path, key, &self.stats))?,
            None => slot
                .glyph
                .get_mut()
                .ok_or_else(|| Error::GlyphNotFound {
                    layer: self.name.clone(),
                    glyph: key.clone(),
                })?,
        };
        Ok(Arc::make_mut(glyph))
    }

    fn load(&self, name: &GlyphName, slot: &GlyphSlot) -> Result<Arc<Glyph>, Error> {
        slot.glyph.get_or_try_init(|| match &slot.path {
            Some(path) => read_glyph(path, name, &self.stats),
            None => Err(self.not_found(name.as_str())),
        })
    }

    fn not_found(&self, name: &str) -> Error {
        Error::GlyphNotFound {
            layer: self.name.clone(),
            glyph: name.into(),
        }
    }
}

fn read_glyph(path: &Path, expected: &GlyphName, stats: &LoadStats) -> Result<Glyph, Error> {
    trace!("parsing {}", path.display());
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    stats.glyph_read();
    glif::parse_named_glyph(&bytes, expected).map_err(|source| Error::Glif {
        path: path.to_path_buf(),
        source,
    })
}

impl GlyphStore for Layer {
    fn get_glyph(&self, name: &str) -> Result<Arc<Glyph>, Error> {
        let Some((name, slot)) = self.glyphs.get_key_value(name) else {
            return Err(self.not_found(name));
        };
        self.load(name, slot)
    }

    fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    fn contains(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    fn glyph_names(&self) -> Box<dyn Iterator<Item = &GlyphName> + '_> {
        Box::new(self.glyphs.keys())
    }

    fn iter(&self) -> GlyphIter<'_> {
        GlyphIter {
            layer: self,
            slots: self.glyphs.iter(),
        }
    }
}

/// Iterator over the glyphs of a [`Layer`], see [`GlyphStore::iter`].
pub struct GlyphIter<'a> {
    layer: &'a Layer,
    slots: indexmap::map::Iter<'a, GlyphName, GlyphSlot>,
}

impl<'a> Iterator for GlyphIter<'a> {
    type Item = (&'a GlyphName, Result<Arc<Glyph>, Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let (name, slot) = self.slots.next()?;
        Some((name, self.layer.load(name, slot)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for GlyphIter<'_> {}

/// The layers of a font in registry order, one of which is the default.
#[derive(Debug)]
pub struct LayerSet {
    layers: Vec<Layer>,
    default_index: usize,
}

impl LayerSet {
    pub(crate) fn new(layers: Vec<Layer>, default_index: usize) -> LayerSet {
        LayerSet {
            layers,
            default_index,
        }
    }

    pub fn default_layer(&self) -> &Layer {
        &self.layers[self.default_index]
    }

    pub fn default_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.default_index]
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// As [`LayerSet::get`], but an unknown name is an error.
    pub fn layer(&self, name: &str) -> Result<&Layer, Error> {
        self.get(name)
            .ok_or_else(|| Error::LayerNotFound(name.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.layers.iter().map(|l| &l.name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::glif::GlifErrorKind;
    use crate::layout::tests::{plist_doc, square_glif, PackageBuilder};
    use crate::layout::PackageLayout;

    fn open_default_layer(builder: &PackageBuilder) -> Layer {
        let layout = PackageLayout::open(builder.root()).unwrap();
        let entry = layout.default_layer().clone();
        Layer::from_entry(entry, Arc::default())
    }

    fn simple_package() -> PackageBuilder {
        let builder = PackageBuilder::new(&[("public.default", "glyphs")]);
        builder.glyphs(
            "glyphs",
            &[
                ("A", square_glif("A")),
                ("B", square_glif("B")),
                ("C", square_glif("C")),
            ],
        );
        builder
    }

    #[test]
    fn count_reads_nothing() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        assert_eq!(layer.glyph_count(), 3);
        assert!(layer.contains("B"));
        assert!(!layer.contains("Z"));
        assert_eq!(
            layer.glyph_names().map(|n| n.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
        assert_eq!(layer.loaded_count(), 0);
        assert_eq!(layer.stats.glyph_files_read(), 0);
    }

    #[test]
    fn get_twice_reads_once() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        let first = layer.get_glyph("A").unwrap();
        let second = layer.get_glyph("A").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.contours[0].points.len(), 4);
        assert_eq!(layer.stats.glyph_files_read(), 1);
        assert!(layer.is_loaded("A"));
        assert!(!layer.is_loaded("B"));
    }

    #[test]
    fn unknown_glyph() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        match layer.get_glyph("nope") {
            Err(Error::GlyphNotFound { layer, glyph }) => {
                assert_eq!(layer, "public.default");
                assert_eq!(glyph, "nope");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn iteration_loads_as_it_goes() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        let mut iter = layer.iter();
        assert_eq!(iter.len(), 3);
        let (name, glyph) = iter.next().unwrap();
        assert_eq!(name, "A");
        assert_eq!(glyph.unwrap().name, "A");
        assert_eq!(layer.loaded_count(), 1);

        // a fresh iterator starts over and reuses what is loaded
        let names: Vec<_> = layer.iter().map(|(n, g)| (n.clone(), g.unwrap().width)).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(layer.loaded_count(), 3);
        assert_eq!(layer.stats.glyph_files_read(), 3);
    }

    #[test]
    fn concurrent_first_access() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        let threads = 8;
        let barrier = Barrier::new(threads);
        let glyphs: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let layer = &layer;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        layer.get_glyph("B").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(layer.stats.glyph_files_read(), 1);
        assert!(glyphs.iter().all(|g| Arc::ptr_eq(g, &glyphs[0])));
    }

    #[test]
    fn concurrent_first_access_to_malformed_glyph() {
        let builder = simple_package();
        // a long outline ahead of the bad advance keeps the first parse busy
        let points: String = (0..20_000)
            .map(|i| format!("<point x=\"{i}\" y=\"0\" type=\"line\"/>"))
            .collect();
        builder.write(
            "glyphs/B.glif",
            &format!(
                "<glyph name=\"B\" format=\"2\"><outline><contour>{points}</contour></outline>\
                 <advance width=\"-5\"/></glyph>"
            ),
        );
        let layer = open_default_layer(&builder);
        let threads = 8;
        let barrier = Barrier::new(threads);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let layer = &layer;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        layer.get_glyph("B")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(layer.stats.glyph_files_read(), 1);
        for result in results {
            assert!(
                matches!(
                    &result,
                    Err(Error::Glif { source, .. })
                        if matches!(source.kind, GlifErrorKind::NegativeAdvance(_))
                ),
                "{result:?}"
            );
        }
        assert!(!layer.is_loaded("B"));
    }

    #[test]
    fn malformed_glyph_is_scoped() {
        let builder = simple_package();
        builder.write("glyphs/B.glif", "<glyph name=\"B\" format=\"2\"><advance width=\"-5\"/></glyph>");
        let layer = open_default_layer(&builder);
        layer.get_glyph("A").unwrap();
        assert!(matches!(layer.get_glyph("B"), Err(Error::Glif { .. })));
        assert!(layer.get_glyph("C").is_ok());
        assert!(layer.is_loaded("A"));
        assert!(!layer.is_loaded("B"));

        // the failure is not cached
        assert!(layer.get_glyph("B").is_err());
        assert_eq!(layer.stats.glyph_files_read(), 4);
    }

    #[test]
    fn name_must_match_registry() {
        let builder = simple_package();
        builder.write("glyphs/B.glif", square_glif("b"));
        let layer = open_default_layer(&builder);
        match layer.get_glyph("B") {
            Err(Error::Glif { source, .. }) => {
                assert!(matches!(source.kind, GlifErrorKind::NameMismatch { .. }));
                assert_eq!(source.position.line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn eager_policy_loads_everything() {
        let builder = simple_package();
        for flags in [LoadFlags::empty(), LoadFlags::PARALLEL] {
            let layer = open_default_layer(&builder);
            LoadPolicy::Eager.prepare(&layer, flags).unwrap();
            assert_eq!(layer.loaded_count(), 3);
            assert_eq!(layer.stats.layer_info_files_read(), 1);
        }

        let layer = open_default_layer(&builder);
        LoadPolicy::Lazy.prepare(&layer, LoadFlags::PARALLEL).unwrap();
        assert_eq!(layer.loaded_count(), 0);
    }

    #[test]
    fn eager_policy_reports_errors() {
        let builder = simple_package();
        builder.write("glyphs/C.glif", "<glyph");
        let layer = open_default_layer(&builder);
        assert!(LoadPolicy::Eager.prepare(&layer, LoadFlags::PARALLEL).is_err());
    }

    #[test]
    fn mutation_keeps_bookkeeping() {
        let builder = simple_package();
        let mut layer = open_default_layer(&builder);
        let before = layer.get_glyph("A").unwrap();

        layer.get_glyph_mut("A").unwrap().width = 42.0;
        assert_eq!(before.width, 600.0);
        assert_eq!(layer.get_glyph("A").unwrap().width, 42.0);

        layer.get_glyph_mut("B").unwrap().codepoints.push('B');
        assert_eq!(layer.get_glyph("B").unwrap().codepoints, vec!['B']);

        let mut replacement = Glyph::new("C");
        replacement.width = 1.0;
        layer.insert_glyph(replacement);
        layer.insert_glyph(Glyph::new("D"));
        assert!(layer.remove_glyph("A"));
        assert!(!layer.remove_glyph("A"));

        assert_eq!(layer.glyph_count(), 3);
        let names: Vec<_> = layer.iter().map(|(n, g)| (n.to_string(), g.unwrap().width)).collect();
        assert_eq!(
            names,
            vec![
                ("B".to_string(), 600.0),
                ("C".to_string(), 1.0),
                ("D".to_string(), 0.0)
            ]
        );
        // A and B were read; C was replaced before it was ever loaded
        assert_eq!(layer.stats.glyph_files_read(), 2);
        assert!(matches!(layer.get_glyph("A"), Err(Error::GlyphNotFound { .. })));
    }

    #[test]
    fn layer_info() {
        let builder = simple_package();
        builder.write(
            "glyphs/layerinfo.plist",
            plist_doc(
                "<dict><key>color</key><string>1,0.75,0,0.7</string>\
                 <key>lib</key><dict><key>com.example.hidden</key><true/></dict></dict>",
            ),
        );
        let layer = open_default_layer(&builder);
        let info = layer.info().unwrap();
        assert_eq!(info.color, Some(Color::new(1.0, 0.75, 0.0, 0.7).unwrap()));
        assert_eq!(info.lib.get("com.example.hidden"), Some(&Plist::Boolean(true)));
        layer.info().unwrap();
        assert_eq!(layer.stats.layer_info_files_read(), 1);
    }

    #[test]
    fn bad_layer_info_color() {
        let builder = simple_package();
        builder.write(
            "glyphs/layerinfo.plist",
            plist_doc("<dict><key>color</key><string>purple</string></dict>"),
        );
        let layer = open_default_layer(&builder);
        assert!(matches!(layer.info(), Err(Error::Plist { .. })));
    }

    #[test]
    fn missing_layer_info_is_empty() {
        let builder = simple_package();
        let layer = open_default_layer(&builder);
        assert_eq!(*layer.info().unwrap(), LayerInfo::default());
    }
}
