//! How a package is opened.

use bitflags::bitflags;

/// When glyph and attachment content is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Read each glyph, layer info, data file and image on first access.
    #[default]
    Lazy,
    /// Read everything while opening.
    Eager,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LoadFlags: u32 {
        /// Spread eager preloading across the rayon thread pool
        const PARALLEL = 0b0001;
        /// Don't look inside `data/`; the store enumerates as empty
        const SKIP_DATA = 0b0010;
        /// Don't look inside `images/`; the store enumerates as empty
        const SKIP_IMAGES = 0b0100;
    }
}

impl Default for LoadFlags {
    fn default() -> Self {
        LoadFlags::PARALLEL
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub policy: LoadPolicy,
    pub flags: LoadFlags,
}

impl LoadOptions {
    pub fn lazy() -> Self {
        LoadOptions {
            policy: LoadPolicy::Lazy,
            ..Default::default()
        }
    }

    pub fn eager() -> Self {
        LoadOptions {
            policy: LoadPolicy::Eager,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_eager(&self) -> bool {
        self.policy == LoadPolicy::Eager
    }
}

impl From<bool> for LoadOptions {
    fn from(eager: bool) -> Self {
        if eager {
            LoadOptions::eager()
        } else {
            LoadOptions::lazy()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = LoadOptions::default();
        assert_eq!(options.policy, LoadPolicy::Lazy);
        assert!(options.flags.contains(LoadFlags::PARALLEL));
        assert!(LoadOptions::from(true).is_eager());
        assert!(!LoadOptions::from(false).is_eager());
    }

    #[test]
    fn flags_replace() {
        let options = LoadOptions::eager().with_flags(LoadFlags::SKIP_DATA | LoadFlags::SKIP_IMAGES);
        assert!(!options.flags.contains(LoadFlags::PARALLEL));
        assert!(options.flags.contains(LoadFlags::SKIP_IMAGES));
    }
}
