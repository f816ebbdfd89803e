use crate::{
    AssetClass, AssetPath, AssetStore, ImportOptions, ImportTask, PropertyValue, StoreError,
    COMPRESSION_PROPERTY, MIP_GENERATION_PROPERTY, SLOT_NAMES_PROPERTY, TEXTURE_GROUP_PROPERTY,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSlot {
    pub name: String,
    pub assigned: Option<AssetPath>,
}

impl MaterialSlot {
    pub fn new(name: impl Into<String>) -> MaterialSlot {
        MaterialSlot {
            name: name.into(),
            assigned: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub class: AssetClass,
    pub source: Option<PathBuf>,
    /// Bumped every time an import overwrites this entry.
    pub revision: u32,
    pub saved: bool,
    pub properties: HashMap<String, PropertyValue>,
    pub texture_parameters: HashMap<String, AssetPath>,
    pub scalar_parameters: HashMap<String, f32>,
    pub switch_parameters: HashMap<String, bool>,
    pub slots: Vec<MaterialSlot>,
}

impl AssetEntry {
    pub fn new(class: AssetClass) -> AssetEntry {
        AssetEntry {
            class,
            source: None,
            revision: 1,
            saved: false,
            properties: HashMap::new(),
            texture_parameters: HashMap::new(),
            scalar_parameters: HashMap::new(),
            switch_parameters: HashMap::new(),
            slots: Vec::new(),
        }
    }
}

/// In-memory store backend. Used by tests and by the CLI's dry-run mode;
/// the real backend lives in the hosting application.
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: HashMap<AssetPath, AssetEntry>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            assets: HashMap::new(),
        }
    }

    /// Seed an asset directly, bypassing the import path. Test setup helper.
    pub fn insert(&mut self, path: impl Into<AssetPath>, class: AssetClass) -> &mut AssetEntry {
        let path = path.into();
        debug!("Registering asset: {} ({:?})", path, class);
        self.assets.entry(path).or_insert_with(|| AssetEntry::new(class))
    }

    pub fn entry(&self, path: &AssetPath) -> Option<&AssetEntry> {
        self.assets.get(path)
    }

    pub fn asset_count(&self) -> usize {
        self.assets
            .values()
            .filter(|e| e.class != AssetClass::Folder)
            .count()
    }

    fn entry_mut(&mut self, path: &AssetPath) -> Result<&mut AssetEntry, StoreError> {
        self.assets
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))
    }

    fn instance_mut(&mut self, path: &AssetPath) -> Result<&mut AssetEntry, StoreError> {
        let entry = self.entry_mut(path)?;
        if entry.class != AssetClass::MaterialInstance {
            return Err(StoreError::ClassMismatch(
                path.clone(),
                AssetClass::MaterialInstance,
            ));
        }
        Ok(entry)
    }

    fn apply_import(&mut self, task: &ImportTask) -> Result<(), StoreError> {
        let class = match &task.options {
            ImportOptions::Mesh(_) => AssetClass::StaticMesh,
            ImportOptions::Texture(_) => AssetClass::Texture2D,
        };

        let revision = match self.assets.get(&task.destination) {
            Some(_) if !task.replace_existing => {
                return Err(StoreError::AlreadyExists(task.destination.clone()));
            }
            Some(existing) => existing.revision + 1,
            None => 1,
        };

        let mut entry = AssetEntry::new(class);
        entry.source = Some(task.source.clone());
        entry.revision = revision;
        if let ImportOptions::Texture(options) = &task.options {
            entry.properties.insert(
                MIP_GENERATION_PROPERTY.to_string(),
                PropertyValue::Bool(options.mip_generation),
            );
            entry.properties.insert(
                TEXTURE_GROUP_PROPERTY.to_string(),
                PropertyValue::Text(format!("{:?}", options.texture_group)),
            );
            entry.properties.insert(
                COMPRESSION_PROPERTY.to_string(),
                PropertyValue::Text(format!("{:?}", options.compression)),
            );
        }

        debug!(
            "Imported {} -> {} (revision {})",
            task.source.display(),
            task.destination,
            revision
        );
        self.assets.insert(task.destination.clone(), entry);
        Ok(())
    }
}

impl AssetStore for MemoryStore {
    fn exists(&self, path: &AssetPath) -> bool {
        self.assets.contains_key(path)
    }

    fn class_of(&self, path: &AssetPath) -> Option<AssetClass> {
        self.assets.get(path).map(|e| e.class)
    }

    fn make_directory(&mut self, path: &AssetPath) -> Result<(), StoreError> {
        match self.assets.get(path) {
            Some(entry) if entry.class == AssetClass::Folder => Ok(()),
            Some(_) => Err(StoreError::AlreadyExists(path.clone())),
            None => {
                debug!("Created folder: {}", path);
                self.assets.insert(path.clone(), AssetEntry::new(AssetClass::Folder));
                Ok(())
            }
        }
    }

    fn create_material_instance(
        &mut self,
        path: &AssetPath,
        parent: Option<&AssetPath>,
    ) -> Result<(), StoreError> {
        if self.assets.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.clone()));
        }
        let mut entry = AssetEntry::new(AssetClass::MaterialInstance);
        if let Some(parent) = parent {
            entry.properties.insert(
                crate::PARENT_PROPERTY.to_string(),
                PropertyValue::Ref(parent.clone()),
            );
        }
        debug!("Created material instance: {}", path);
        self.assets.insert(path.clone(), entry);
        Ok(())
    }

    fn duplicate_asset(
        &mut self,
        source: &AssetPath,
        target: &AssetPath,
    ) -> Result<(), StoreError> {
        if self.assets.contains_key(target) {
            return Err(StoreError::AlreadyExists(target.clone()));
        }
        let mut entry = self
            .assets
            .get(source)
            .ok_or_else(|| StoreError::NotFound(source.clone()))?
            .clone();
        entry.revision = 1;
        entry.saved = false;
        debug!("Duplicated {} -> {}", source, target);
        self.assets.insert(target.clone(), entry);
        Ok(())
    }

    fn save_asset(&mut self, path: &AssetPath) -> Result<(), StoreError> {
        self.entry_mut(path)?.saved = true;
        Ok(())
    }

    fn list_assets(&self, root: &AssetPath, recursive: bool) -> Vec<AssetPath> {
        let mut paths: Vec<AssetPath> = self
            .assets
            .iter()
            .filter(|(path, entry)| {
                entry.class != AssetClass::Folder
                    && if recursive {
                        path.is_under(root)
                    } else {
                        path.parent().as_ref() == Some(root)
                    }
            })
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn get_property(&self, path: &AssetPath, name: &str) -> Result<PropertyValue, StoreError> {
        let entry = self
            .assets
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        if name == SLOT_NAMES_PROPERTY && !entry.slots.is_empty() {
            return Ok(PropertyValue::TextList(
                entry.slots.iter().map(|s| s.name.clone()).collect(),
            ));
        }
        entry
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchProperty(path.clone(), name.to_string()))
    }

    fn set_property(
        &mut self,
        path: &AssetPath,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        self.entry_mut(path)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    fn set_texture_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        texture: &AssetPath,
    ) -> Result<(), StoreError> {
        self.instance_mut(instance)?
            .texture_parameters
            .insert(name.to_string(), texture.clone());
        Ok(())
    }

    fn set_scalar_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        value: f32,
    ) -> Result<(), StoreError> {
        self.instance_mut(instance)?
            .scalar_parameters
            .insert(name.to_string(), value);
        Ok(())
    }

    fn set_switch_parameter(
        &mut self,
        instance: &AssetPath,
        name: &str,
        value: bool,
    ) -> Result<(), StoreError> {
        self.instance_mut(instance)?
            .switch_parameters
            .insert(name.to_string(), value);
        Ok(())
    }

    fn set_slot_material(
        &mut self,
        mesh: &AssetPath,
        slot: usize,
        instance: &AssetPath,
    ) -> Result<(), StoreError> {
        let instance = instance.clone();
        let entry = self.entry_mut(mesh)?;
        match entry.slots.get_mut(slot) {
            Some(material_slot) => {
                material_slot.assigned = Some(instance);
                Ok(())
            }
            None => Err(StoreError::SlotOutOfRange(mesh.clone(), slot)),
        }
    }

    fn submit_import_batch(&mut self, tasks: &[ImportTask]) -> Result<Vec<AssetPath>, StoreError> {
        let mut produced = Vec::new();
        for task in tasks {
            // A single failed task is dropped from the result, not fatal
            match self.apply_import(task) {
                Ok(()) => produced.push(task.destination.clone()),
                Err(e) => warn!("Import task {} failed: {}", task.source.display(), e),
            }
        }
        Ok(produced)
    }
}
