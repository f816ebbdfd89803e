use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod import;
pub mod memory;

pub use import::{ImportOptions, ImportTask, MeshImportOptions, TextureImportOptions};
pub use memory::MemoryStore;

/// Name of the property holding a material instance's parent reference.
pub const PARENT_PROPERTY: &str = "parent";

/// Property name under which a mesh exposes its material slot names.
pub const SLOT_NAMES_PROPERTY: &str = "slot_names";

/// Texture settings the import backend may silently ignore; callers
/// re-apply them through `set_property` after import.
pub const MIP_GENERATION_PROPERTY: &str = "mip_generation";
pub const TEXTURE_GROUP_PROPERTY: &str = "texture_group";
pub const COMPRESSION_PROPERTY: &str = "compression";
pub const SRGB_PROPERTY: &str = "srgb";

/// A `/`-separated location inside the asset store namespace,
/// e.g. `/Game/Crowd/VAT_Materials/Master`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    pub fn new(str: String) -> AssetPath {
        AssetPath(str)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The terminal segment of the path (the asset or folder name).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> Option<AssetPath> {
        let (parent, _) = self.0.rsplit_once('/')?;
        if parent.is_empty() {
            None
        } else {
            Some(AssetPath(parent.to_string()))
        }
    }

    pub fn join(&self, name: &str) -> AssetPath {
        AssetPath(format!("{}/{}", self.0.trim_end_matches('/'), name))
    }

    /// Whether this path lies strictly below the given root.
    pub fn is_under(&self, root: &AssetPath) -> bool {
        self.0
            .strip_prefix(root.0.trim_end_matches('/'))
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    }
}

impl From<String> for AssetPath {
    fn from(str: String) -> Self {
        AssetPath(str)
    }
}

impl From<&str> for AssetPath {
    fn from(str: &str) -> Self {
        AssetPath(str.to_string())
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    StaticMesh,
    Texture2D,
    MaterialInstance,
    Material,
    Template,
    Folder,
    Other,
}

/// A named property value on a store asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
    Ref(AssetPath),
    RefList(Vec<AssetPath>),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Asset not found: {0}")]
    NotFound(AssetPath),
    #[error("Asset already exists: {0}")]
    AlreadyExists(AssetPath),
    #[error("Asset {0} is not a {1:?}")]
    ClassMismatch(AssetPath, AssetClass),
    #[error("No property '{1}' on {0}")]
    NoSuchProperty(AssetPath, String),
    #[error("Material slot {1} out of range on {0}")]
    SlotOutOfRange(AssetPath, usize),
    #[error("Import failed for {0}")]
    ImportFailed(PathBuf),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Capability surface of the external asset store. The pipeline only ever
/// talks to the store through this trait; the real backend lives in the
/// hosting application.
pub trait AssetStore {
    fn exists(&self, path: &AssetPath) -> bool;

    /// Load-by-path, reduced to the classification the pipeline needs.
    fn class_of(&self, path: &AssetPath) -> Option<AssetClass>;

    /// Ensure a namespace folder exists. Idempotent.
    fn make_directory(&mut self, path: &AssetPath) -> Result<(), StoreError>;

    fn create_material_instance(
        &mut self,
        path: &AssetPath,
        parent: Option<&AssetPath>,
    ) -> Result<(), StoreError>;

    fn duplicate_asset(&mut self, source: &AssetPath, target: &AssetPath)
        -> Result<(), StoreError>;

    fn save_asset(&mut self, path: &AssetPath) -> Result<(), StoreError>;

    /// List asset paths under a root, sorted. Folders themselves are not
    /// listed. `recursive = false` restricts to direct children.
    fn list_assets(&self, root: &AssetPath, recursive: bool) -> Vec<AssetPath>;

    fn get_property(&self, path: &AssetPath, name: &str) -> Result<PropertyValue, StoreError>;

    fn set_property(
        &mut self,
        path: &AssetPath,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError>;

    fn set_texture_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        texture: &AssetPath,
    ) -> Result<(), StoreError>;

    fn set_scalar_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        value: f32,
    ) -> Result<(), StoreError>;

    fn set_switch_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        value: bool,
    ) -> Result<(), StoreError>;

    /// Assign a material instance onto a mesh's material slot by index.
    fn set_slot_material(
        &mut self,
        mesh: &AssetPath,
        slot: usize,
        instance: &AssetPath,
    ) -> Result<(), StoreError>;

    /// Submit a batch of import tasks. Individual task failures are logged
    /// by the backend and drop the task from the returned list; an `Err`
    /// means the batch as a whole was not accepted.
    fn submit_import_batch(&mut self, tasks: &[ImportTask]) -> Result<Vec<AssetPath>, StoreError>;

    fn parent_of(&self, path: &AssetPath) -> Result<Option<AssetPath>, StoreError> {
        match self.get_property(path, PARENT_PROPERTY) {
            Ok(PropertyValue::Ref(parent)) => Ok(Some(parent)),
            Ok(other) => Err(StoreError::Backend(format!(
                "Unexpected parent value on {}: {:?}",
                path, other
            ))),
            Err(StoreError::NoSuchProperty(_, _)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_parent(&mut self, path: &AssetPath, parent: &AssetPath) -> Result<(), StoreError> {
        self.set_property(path, PARENT_PROPERTY, PropertyValue::Ref(parent.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_name_and_parent() {
        let path = AssetPath::from("/Game/Crowd/MI_Guy_Wave");
        assert_eq!(path.name(), "MI_Guy_Wave");
        assert_eq!(path.parent(), Some(AssetPath::from("/Game/Crowd")));
        assert_eq!(AssetPath::from("Orphan").parent(), None);
    }

    #[test]
    fn path_join_and_is_under() {
        let root = AssetPath::from("/Game/Crowd");
        let child = root.join("VAT_Materials");
        assert_eq!(child.as_str(), "/Game/Crowd/VAT_Materials");
        assert!(child.is_under(&root));
        assert!(child.join("Master").is_under(&root));
        assert!(!root.is_under(&root));
        // A sibling with a shared name prefix is not under the root
        assert!(!AssetPath::from("/Game/Crowd2/X").is_under(&root));
    }
}
