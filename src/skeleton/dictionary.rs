use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::games::Game;
use crate::error::{Result, RigError};
use crate::math::ToleranceProfile;

/// Which host-side name a bone is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// Side tokens moved to a `.L`/`.R` suffix so the host tool can mirror.
    #[default]
    Mirrored,
    /// The descriptor's alternate name, or the canonical name if it has none.
    Alternate,
}

/// Naming record for one skeleton bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDescriptor {
    /// Name used inside the source file
    pub canonical: String,
    /// Mirrored host-tool name
    pub host: String,
    /// Host name used in `NamingMode::Alternate`
    pub alternate: Option<String>,
    /// Canonical name of the parent; `None` for a root
    pub parent: Option<String>,
}

impl BoneDescriptor {
    pub fn new(canonical: &str, parent: Option<&str>) -> Self {
        BoneDescriptor {
            canonical: canonical.to_string(),
            host: mirrored_name(canonical),
            alternate: None,
            parent: parent.map(str::to_string),
        }
    }

    fn host_for(&self, mode: NamingMode) -> &str {
        match mode {
            NamingMode::Mirrored => &self.host,
            NamingMode::Alternate => self.alternate.as_deref().unwrap_or(&self.canonical),
        }
    }
}

/// Bone naming registry for one game.
///
/// Both lookup directions are total: a name the dictionary does not know is
/// returned unchanged, since files routinely reference nodes that are not
/// skeleton bones.
#[derive(Debug, Clone)]
pub struct SkeletonDictionary {
    name: String,
    descriptors: Vec<BoneDescriptor>,
    /// canonical → descriptor index
    by_canonical: HashMap<String, usize>,
    /// any host-side spelling (mirrored, alternate, canonical) → descriptor index
    by_host: HashMap<String, usize>,
    /// resolved parent links, index-based
    parents: Vec<Option<usize>>,
    mode: NamingMode,
    tolerance: ToleranceProfile,
}

impl SkeletonDictionary {
    pub fn new(
        name: &str,
        descriptors: Vec<BoneDescriptor>,
        tolerance: ToleranceProfile,
    ) -> Result<Self> {
        let mut by_canonical = HashMap::with_capacity(descriptors.len());
        for (i, d) in descriptors.iter().enumerate() {
            if by_canonical.insert(d.canonical.clone(), i).is_some() {
                return Err(RigError::DuplicateBoneName {
                    table: "canonical",
                    name: d.canonical.clone(),
                });
            }
        }

        // The reverse table must resolve the output of either naming mode.
        let mut by_host: HashMap<String, usize> = HashMap::with_capacity(descriptors.len() * 2);
        for (i, d) in descriptors.iter().enumerate() {
            let spellings = [
                Some(d.host.as_str()),
                Some(d.host_for(NamingMode::Alternate)),
                Some(d.canonical.as_str()),
            ];
            for name in spellings.into_iter().flatten() {
                match by_host.get(name) {
                    Some(&existing) if existing != i => {
                        return Err(RigError::DuplicateBoneName {
                            table: "host",
                            name: name.to_string(),
                        });
                    }
                    _ => {
                        by_host.insert(name.to_string(), i);
                    }
                }
            }
        }

        let parents = descriptors
            .iter()
            .map(|d| {
                d.parent
                    .as_deref()
                    .and_then(|p| by_canonical.get(p).copied())
            })
            .collect();

        Ok(SkeletonDictionary {
            name: name.to_string(),
            descriptors,
            by_canonical,
            by_host,
            parents,
            mode: NamingMode::default(),
            tolerance,
        })
    }

    /// Built-in dictionary for a supported game.
    pub fn for_game(game: Game) -> Result<Self> {
        let descriptors = game
            .bones()
            .iter()
            .map(|b| BoneDescriptor {
                canonical: b.canonical.to_string(),
                host: b
                    .host
                    .map(str::to_string)
                    .unwrap_or_else(|| mirrored_name(b.canonical)),
                alternate: b.alternate.map(str::to_string),
                parent: b.parent.map(str::to_string),
            })
            .collect();
        Self::new(game.display_name(), descriptors, game.tolerance())
    }

    /// Same dictionary with a different host naming mode. Only the
    /// canonical → host direction changes.
    pub fn with_mode(mut self, mode: NamingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> NamingMode {
        self.mode
    }

    pub fn tolerance(&self) -> ToleranceProfile {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &BoneDescriptor> {
        self.descriptors.iter()
    }

    /// Host-tool name for a canonical (source) name.
    pub fn host_name<'a>(&'a self, canonical: &'a str) -> &'a str {
        match self.by_canonical.get(canonical) {
            Some(&i) => self.descriptors[i].host_for(self.mode),
            None => canonical,
        }
    }

    /// Canonical (source) name for a host-tool name in either naming mode.
    pub fn canonical_name<'a>(&'a self, host: &'a str) -> &'a str {
        match self.by_host.get(host) {
            Some(&i) => &self.descriptors[i].canonical,
            None => host,
        }
    }

    pub fn descriptor(&self, canonical: &str) -> Option<&BoneDescriptor> {
        self.by_canonical
            .get(canonical)
            .map(|&i| &self.descriptors[i])
    }

    /// Canonical name of the parent bone, if it is itself in the dictionary.
    pub fn parent_of(&self, canonical: &str) -> Option<&str> {
        let i = *self.by_canonical.get(canonical)?;
        self.parents[i].map(|p| self.descriptors[p].canonical.as_str())
    }

    /// Whether `name`, in any spelling, is a skeleton bone.
    pub fn is_bone(&self, name: &str) -> bool {
        self.by_host.contains_key(name)
    }

    /// Load a custom dictionary from JSON.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let config: DictionaryConfig = serde_json::from_reader(reader)?;
        config.build()
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }
}

/// JSON form of a custom dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    pub name: String,
    #[serde(default)]
    pub tolerance: Option<ToleranceProfile>,
    pub bones: Vec<BoneEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneEntry {
    pub canonical: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub alternate: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl DictionaryConfig {
    pub fn build(self) -> Result<SkeletonDictionary> {
        let descriptors = self
            .bones
            .into_iter()
            .map(|b| BoneDescriptor {
                host: b.host.unwrap_or_else(|| mirrored_name(&b.canonical)),
                canonical: b.canonical,
                alternate: b.alternate,
                parent: b.parent,
            })
            .collect();
        SkeletonDictionary::new(
            &self.name,
            descriptors,
            self.tolerance.unwrap_or_default(),
        )
    }
}

/// Derive the mirrored host name: a standalone `L`/`R` word, or an `L`/`R`
/// prefix on an underscore-joined capitalized word (`LArm_Hand`), is removed
/// and the matching `.L`/`.R` suffix appended.
pub fn mirrored_name(canonical: &str) -> String {
    if canonical.ends_with(".L") || canonical.ends_with(".R") {
        return canonical.to_string();
    }

    let mut side: Option<&str> = None;
    let mut words: Vec<&str> = Vec::new();
    for word in canonical.split(' ') {
        if side.is_none() {
            if word == "L" || word == "R" {
                side = Some(word);
                continue;
            }
            if let Some((s, rest)) = split_side_prefix(word) {
                side = Some(s);
                words.push(rest);
                continue;
            }
        }
        words.push(word);
    }

    match side {
        Some(s) => format!("{}.{}", words.join(" "), s),
        None => canonical.to_string(),
    }
}

fn split_side_prefix(word: &str) -> Option<(&str, &str)> {
    let bytes = word.as_bytes();
    if bytes.len() < 3 || !word.contains('_') {
        return None;
    }
    if (bytes[0] == b'L' || bytes[0] == b'R') && bytes[1].is_ascii_uppercase() {
        Some((&word[..1], &word[1..]))
    } else {
        None
    }
}
