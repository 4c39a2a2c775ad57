//! Small shared value types: names, identifiers and colors.

use std::fmt::{Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

macro_rules! smol_str_newtype {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(SmolStr);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(SmolStr::new(s))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn into_inner(self) -> SmolStr {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value.into())
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.into())
            }
        }

        impl From<SmolStr> for $name {
            fn from(value: SmolStr) -> Self {
                $name(value)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        // lets maps keyed by this type be queried with a &str
        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    };
}

smol_str_newtype!(
    /// The name of a glyph, unique within a layer.
    GlyphName
);

smol_str_newtype!(
    /// The name of a layer, group, or kerning class.
    Name
);

/// A stable identifier for an element of a glyph or of the font.
///
/// Identifiers are at most 100 characters in the printable ASCII range.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier(SmolStr);

impl Identifier {
    pub const MAX_LEN: usize = 100;

    pub fn new(s: &str) -> Result<Self, InvalidIdentifier> {
        if s.is_empty()
            || s.len() > Self::MAX_LEN
            || !s.bytes().all(|b| (0x20..=0x7E).contains(&b))
        {
            return Err(InvalidIdentifier(s.into()));
        }
        Ok(Identifier(s.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier '{0}'")]
pub struct InvalidIdentifier(pub String);

/// An RGBA color with each channel in `0.0..=1.0`.
///
/// On disk this is a string of four comma-separated numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Result<Self, InvalidColor> {
        let color = Color {
            red,
            green,
            blue,
            alpha,
        };
        if [red, green, blue, alpha]
            .iter()
            .any(|c| !(0.0..=1.0).contains(c))
        {
            return Err(InvalidColor(color.to_rgba_string()));
        }
        Ok(color)
    }

    pub fn to_rgba_string(&self) -> String {
        format!("{},{},{},{}", self.red, self.green, self.blue, self.alpha)
    }
}

impl FromStr for Color {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || InvalidColor(s.to_string());
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<f32>().map_err(|_| bad()))
            .collect::<Result<Vec<_>, _>>()?;
        let [red, green, blue, alpha] = channels[..] else {
            return Err(bad());
        };
        Color::new(red, green, blue, alpha).map_err(|_| bad())
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rgba_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}'")]
pub struct InvalidColor(pub String);

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn parse_color() {
        let color: Color = "1,0.5, 0,0.25".parse().unwrap();
        assert_eq!(color, Color::new(1.0, 0.5, 0.0, 0.25).unwrap());
        assert_eq!(color.to_rgba_string(), "1,0.5,0,0.25");
    }

    #[test]
    fn reject_bad_colors() {
        assert!("1,0,0".parse::<Color>().is_err());
        assert!("1,0,0,0,0".parse::<Color>().is_err());
        assert!("1,0,0,1.5".parse::<Color>().is_err());
        assert!("red,0,0,1".parse::<Color>().is_err());
    }

    #[test]
    fn identifiers() {
        assert!(Identifier::new("abc123").is_ok());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("tab\there").is_err());
        assert!(Identifier::new(&"x".repeat(101)).is_err());
    }

    #[test]
    fn lookup_by_str() {
        let map = HashMap::from([(GlyphName::new("A"), 1)]);
        assert_eq!(map.get("A"), Some(&1));
    }
}
