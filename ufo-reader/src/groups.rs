//! `groups.plist` and `kerning.plist`.

use std::collections::HashMap;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, GroupsError};
use crate::layout::read_dict_file;
use crate::plist::{Dictionary, Plist, PlistError};
use crate::types::{GlyphName, Name};

pub const KERN1_PREFIX: &str = "public.kern1.";
pub const KERN2_PREFIX: &str = "public.kern2.";

/// Group name to members, both in file order.
pub type Groups = IndexMap<Name, IndexSet<GlyphName>>;

/// Kerning adjustments in file order.
pub type Kerning = IndexMap<KerningPair, f32>;

/// The two sides of a kerning adjustment; each is a glyph or group name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KerningPair {
    pub first: Name,
    pub second: Name,
}

impl KerningPair {
    pub fn new(first: impl Into<Name>, second: impl Into<Name>) -> Self {
        KerningPair {
            first: first.into(),
            second: second.into(),
        }
    }
}

pub(crate) fn read_groups(path: &Path) -> Result<Groups, Error> {
    let Some(dict) = read_dict_file(path)? else {
        return Ok(Groups::new());
    };
    groups_from_dict(dict).map_err(|source| Error::Groups {
        path: path.to_path_buf(),
        source,
    })
}

pub fn groups_from_dict(dict: Dictionary) -> Result<Groups, GroupsError> {
    let mut groups = Groups::with_capacity(dict.len());
    for (name, members) in dict {
        let name = Name::from(name);
        let Plist::Array(members) = members else {
            return Err(GroupsError::NotAnArray(name));
        };
        let mut set = IndexSet::with_capacity(members.len());
        for member in members {
            let Plist::String(member) = member else {
                return Err(GroupsError::NonStringMember { group: name });
            };
            if !set.insert(GlyphName::from(member)) {
                debug!("group '{name}' lists a glyph more than once, keeping the first");
            }
        }
        groups.insert(name, set);
    }
    check_kerning_groups(&groups)?;
    Ok(groups)
}

/// A glyph may be in at most one first-side and one second-side kerning group.
fn check_kerning_groups(groups: &Groups) -> Result<(), GroupsError> {
    for prefix in [KERN1_PREFIX, KERN2_PREFIX] {
        let mut seen: HashMap<&GlyphName, &Name> = HashMap::new();
        for (name, members) in groups.iter().filter(|(n, _)| n.as_str().starts_with(prefix)) {
            for glyph in members {
                if let Some(first) = seen.insert(glyph, name) {
                    return Err(GroupsError::OverlappingKerningGroups {
                        glyph: glyph.clone(),
                        first: first.clone(),
                        second: name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn read_kerning(path: &Path) -> Result<Kerning, Error> {
    let Some(dict) = read_dict_file(path)? else {
        return Ok(Kerning::new());
    };
    kerning_from_dict(dict).map_err(|e| Error::plist(path, e))
}

pub fn kerning_from_dict(dict: Dictionary) -> Result<Kerning, PlistError> {
    let mut kerning = Kerning::new();
    for (first, seconds) in dict {
        let seconds = match seconds {
            Plist::Dictionary(seconds) => seconds,
            other => {
                return Err(PlistError::UnexpectedFieldType {
                    key: first,
                    expected: "dictionary",
                    found: other.name(),
                })
            }
        };
        for (second, value) in seconds {
            let adjustment = match value {
                Plist::Integer(i) => i as f32,
                Plist::Real(f) => f.into_inner() as f32,
                other => {
                    return Err(PlistError::UnexpectedFieldType {
                        key: format!("{first} {second}"),
                        expected: "number",
                        found: other.name(),
                    })
                }
            };
            kerning.insert(KerningPair::new(first.as_str(), second), adjustment);
        }
    }
    Ok(kerning)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout::tests::plist_doc;

    fn dict(body: &str) -> Dictionary {
        Plist::parse_dict(plist_doc(body).as_bytes()).unwrap()
    }

    #[test]
    fn groups_keep_order() {
        let groups = groups_from_dict(dict(
            r#"<dict>
            <key>public.kern1.O</key><array><string>O</string><string>D</string></array>
            <key>public.kern2.O</key><array><string>O</string><string>C</string></array>
            <key>caps</key><array><string>B</string><string>A</string><string>B</string></array>
            </dict>"#,
        ))
        .unwrap();
        assert_eq!(
            groups.keys().map(Name::as_str).collect::<Vec<_>>(),
            vec!["public.kern1.O", "public.kern2.O", "caps"]
        );
        let caps: Vec<_> = groups["caps"].iter().map(GlyphName::as_str).collect();
        assert_eq!(caps, vec!["B", "A"]);
    }

    #[test]
    fn overlapping_kerning_groups() {
        let err = groups_from_dict(dict(
            r#"<dict>
            <key>public.kern1.O</key><array><string>O</string></array>
            <key>public.kern1.round</key><array><string>C</string><string>O</string></array>
            </dict>"#,
        ))
        .unwrap_err();
        match err {
            GroupsError::OverlappingKerningGroups {
                glyph,
                first,
                second,
            } => {
                assert_eq!(glyph, "O");
                assert_eq!(first, "public.kern1.O");
                assert_eq!(second, "public.kern1.round");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn bad_groups() {
        assert!(matches!(
            groups_from_dict(dict("<dict><key>g</key><string>A</string></dict>")),
            Err(GroupsError::NotAnArray(_))
        ));
        assert!(matches!(
            groups_from_dict(dict("<dict><key>g</key><array><integer>1</integer></array></dict>")),
            Err(GroupsError::NonStringMember { .. })
        ));
    }

    #[test]
    fn kerning_pairs() {
        let kerning = kerning_from_dict(dict(
            r#"<dict>
            <key>public.kern1.O</key>
            <dict><key>A</key><integer>-40</integer><key>V</key><real>-12.5</real></dict>
            <key>T</key>
            <dict><key>o</key><integer>-80</integer></dict>
            </dict>"#,
        ))
        .unwrap();
        assert_eq!(
            kerning.into_iter().collect::<Vec<_>>(),
            vec![
                (KerningPair::new("public.kern1.O", "A"), -40.0),
                (KerningPair::new("public.kern1.O", "V"), -12.5),
                (KerningPair::new("T", "o"), -80.0),
            ]
        );
    }

    #[test]
    fn kerning_values_are_numbers() {
        let err = kerning_from_dict(dict(
            "<dict><key>T</key><dict><key>o</key><string>-80</string></dict></dict>",
        ))
        .unwrap_err();
        assert!(
            matches!(&err, PlistError::UnexpectedFieldType { key, .. } if key == "T o"),
            "{err}"
        );
    }
}
