pub mod bounds;
pub mod catalog;
pub mod chain;
pub mod hierarchy;
pub mod identity;
pub mod import;
pub mod report;
pub mod select;

use crate::catalog::AssetCatalog;
use crate::identity::AnimTokenRule;
use crate::report::AssetReport;
use log::error;
use std::path::PathBuf;
use vat_store::{AssetPath, AssetStore};

/// Parameters of one pipeline invocation, shared by every operation so that
/// mesh import, texture import and chain building always agree on scope.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Bake root containing `geo/`, `tex/` and `data/`.
    pub source_root: PathBuf,
    /// Destination namespace for imported assets and chain instances.
    pub destination: AssetPath,
    /// Raw comma-separated character filter; empty means "all discoverable".
    pub character_filter: Option<String>,
    /// Parent of each character's first chain instance. Only chain building
    /// needs it.
    pub base_parent: Option<AssetPath>,
    pub token_rule: AnimTokenRule,
}

impl GenConfig {
    fn catalog(&self) -> AssetCatalog {
        AssetCatalog::new(&self.source_root)
    }

    fn characters(&self, catalog: &AssetCatalog) -> std::collections::BTreeSet<String> {
        select::resolve(self.character_filter.as_deref(), catalog, self.token_rule)
    }
}

/// Import the selected characters' mesh files. Empty result means nothing
/// can be assumed imported.
pub fn run_mesh_import(store: &mut dyn AssetStore, config: &GenConfig) -> Vec<AssetPath> {
    let catalog = config.catalog();
    let characters = config.characters(&catalog);
    import::import_meshes(store, &catalog, &config.destination, &characters, config.token_rule)
}

/// Import the selected characters' bake textures and enforce their settings.
pub fn run_texture_import(
    store: &mut dyn AssetStore,
    config: &GenConfig,
) -> (Vec<AssetPath>, Vec<AssetReport>) {
    let catalog = config.catalog();
    let characters = config.characters(&catalog);
    import::import_textures(store, &catalog, &config.destination, &characters, config.token_rule)
}

/// Build the material-instance chains for the selected characters.
pub fn run_chain_build(store: &mut dyn AssetStore, config: &GenConfig) -> Vec<AssetReport> {
    let Some(base_parent) = &config.base_parent else {
        error!("Chain building requires a base parent material");
        return Vec::new();
    };

    let catalog = config.catalog();
    let characters = config.characters(&catalog);
    let mut map = catalog.character_animation_map();
    map.retain(|character, _| characters.contains(character));

    chain::build_chains(store, &map, &config.destination, base_parent, &catalog.data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::fixture;
    use vat_store::{AssetClass, MemoryStore};

    fn config(root: PathBuf, filter: Option<&str>) -> GenConfig {
        GenConfig {
            source_root: root,
            destination: "/Game/VAT".into(),
            character_filter: filter.map(str::to_string),
            base_parent: Some("/Game/Base/BaseVAT".into()),
            token_rule: AnimTokenRule::default(),
        }
    }

    fn full_bake_root(test: &str) -> PathBuf {
        let root = fixture(
            test,
            &[
                ("geo", "SM_Guy.fbx"),
                ("tex", "T_Guy_Wave_pos.exr"),
                ("tex", "T_Guy_Wave_rot.exr"),
            ],
        );
        let data = root.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(
            data.join("Guy_Wave_data.json"),
            r#"[{"max_x":1,"min_x":0,"max_y":1,"min_y":0,"max_z":1,"min_z":0}]"#,
        )
        .unwrap();
        root
    }

    #[test]
    fn full_pipeline_populates_the_destination() {
        let root = full_bake_root("lib_full");
        let config = config(root, None);
        let mut store = MemoryStore::new();
        store.insert("/Game/Base/BaseVAT", AssetClass::Material);

        let meshes = run_mesh_import(&mut store, &config);
        let (textures, reports) = run_texture_import(&mut store, &config);
        let chains = run_chain_build(&mut store, &config);

        assert_eq!(meshes, vec![AssetPath::from("/Game/VAT/SM_Guy")]);
        assert_eq!(textures.len(), 2);
        assert!(reports.iter().all(|r| r.is_clean()));
        assert_eq!(chains.len(), 1);

        let instance = AssetPath::from("/Game/VAT/MI_VAT_Guy_Wave");
        assert_eq!(
            store.parent_of(&instance).unwrap(),
            Some(AssetPath::from("/Game/Base/BaseVAT"))
        );
        let entry = store.entry(&instance).unwrap();
        assert_eq!(entry.scalar_parameters.len(), 6);
        assert_eq!(entry.texture_parameters.len(), 2);
    }

    #[test]
    fn absent_character_filter_touches_nothing() {
        let root = full_bake_root("lib_absent");
        let config = config(root, Some("Nobody"));
        let mut store = MemoryStore::new();
        store.insert("/Game/Base/BaseVAT", AssetClass::Material);

        assert!(run_mesh_import(&mut store, &config).is_empty());
        let (textures, reports) = run_texture_import(&mut store, &config);
        assert!(textures.is_empty() && reports.is_empty());
        assert!(run_chain_build(&mut store, &config).is_empty());

        // Only the seeded base parent is present
        assert_eq!(store.asset_count(), 1);
    }

    #[test]
    fn chain_build_without_base_parent_is_refused() {
        let root = full_bake_root("lib_nobase");
        let mut config = config(root, None);
        config.base_parent = None;
        let mut store = MemoryStore::new();

        assert!(run_chain_build(&mut store, &config).is_empty());
        assert_eq!(store.asset_count(), 0);
    }
}
