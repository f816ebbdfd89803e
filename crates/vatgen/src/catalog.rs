use crate::identity::{self, AnimTokenRule};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const GEO_SUBFOLDER: &str = "geo";
pub const TEX_SUBFOLDER: &str = "tex";
pub const DATA_SUBFOLDER: &str = "data";

pub const MESH_SUFFIX: &str = ".fbx";
pub const TEXTURE_SUFFIX: &str = ".exr";
pub const DATA_SUFFIX: &str = "_data.json";

/// character -> sorted, deduplicated animation names. Derived from the data
/// sidecar family only; rebuilt on every planning run.
pub type CharacterAnimationMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Mesh,
    Texture,
    Data,
}

/// One file discovered under the bake root, with its derived identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub path: PathBuf,
    pub kind: AssetKind,
    pub character: String,
    pub animation: Option<String>,
}

/// View over a bake root directory (`<root>/geo`, `<root>/tex`,
/// `<root>/data`). Scanning is read-only; every accessor re-reads the
/// filesystem so repeated runs observe the current state.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    root: PathBuf,
}

impl AssetCatalog {
    pub fn new(root: impl Into<PathBuf>) -> AssetCatalog {
        AssetCatalog { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_SUBFOLDER)
    }

    /// List files under `<root>/<subfolder>` whose name ends with `suffix`,
    /// sorted. An absent subfolder or zero matches is a normal intermediate
    /// project state: logged, empty result, never an error.
    pub fn scan(&self, subfolder: &str, suffix: &str) -> Vec<PathBuf> {
        let dir = self.root.join(subfolder);
        if !dir.is_dir() {
            warn!("Cannot find {}/ folder in {}", subfolder, self.root.display());
            return Vec::new();
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && entry.file_name().to_string_lossy().ends_with(suffix)
                    {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Failed to walk {}: {}", dir.display(), e),
            }
        }

        if files.is_empty() {
            warn!("Cannot find *{} files in {}", suffix, dir.display());
        }
        files.sort();
        files
    }

    pub fn mesh_files(&self) -> Vec<PathBuf> {
        self.scan(GEO_SUBFOLDER, MESH_SUFFIX)
    }

    pub fn texture_files(&self) -> Vec<PathBuf> {
        self.scan(TEX_SUBFOLDER, TEXTURE_SUFFIX)
    }

    pub fn data_files(&self) -> Vec<PathBuf> {
        self.scan(DATA_SUBFOLDER, DATA_SUFFIX)
    }

    /// All characters discoverable from the mesh family.
    pub fn mesh_characters(&self, rule: AnimTokenRule) -> BTreeSet<String> {
        self.mesh_files()
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .map(|name| identity::extract_character(name, rule))
            .collect()
    }

    /// Group the data sidecars into `character -> animations`. Stems that do
    /// not tokenize into enough segments are silently skipped; animation
    /// lists come out sorted and deduplicated for any scan order.
    pub fn character_animation_map(&self) -> CharacterAnimationMap {
        let mut map = CharacterAnimationMap::new();
        for path in self.data_files() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((character, animation)) = identity::split_data_stem(name) else {
                continue;
            };
            map.entry(character).or_default().push(animation);
        }
        for animations in map.values_mut() {
            animations.sort();
            animations.dedup();
        }
        map
    }

    /// Records for all three families, with per-family identity derivation.
    pub fn records(&self, rule: AnimTokenRule) -> Vec<AssetRecord> {
        let mut records = Vec::new();

        for path in self.mesh_files() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            records.push(AssetRecord {
                character: identity::extract_character(name, rule),
                animation: None,
                kind: AssetKind::Mesh,
                path,
            });
        }

        for path in self.texture_files() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let (character, animation) = match identity::parse_texture_stem(name, rule) {
                Some(id) => (id.character, Some(id.animation)),
                None => (identity::extract_character(name, rule), None),
            };
            records.push(AssetRecord {
                character,
                animation,
                kind: AssetKind::Texture,
                path,
            });
        }

        for path in self.data_files() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((character, animation)) = identity::split_data_stem(name) else {
                continue;
            };
            records.push(AssetRecord {
                character,
                animation: Some(animation),
                kind: AssetKind::Data,
                path,
            });
        }

        records
    }
}
