use crate::bounds;
use crate::catalog::CharacterAnimationMap;
use crate::identity::{self, TextureRole};
use crate::report::{AssetReport, BindOutcome};
use log::{debug, error, info, warn};
use std::path::Path;
use vat_store::{AssetClass, AssetPath, AssetStore};

pub const POSITION_TEXTURE_PARAMETER: &str = "PositionTexture";
pub const ROTATION_TEXTURE_PARAMETER: &str = "RotationTexture";
pub const LEGACY_SUPPORT_PARAMETER: &str = "LegacySupport";

/// Build or update the material-instance chain for every character in the
/// map. Per character the topology is hub-and-spoke: the first animation's
/// instance is parented to `base_parent`, every later instance to that
/// first instance. Creation is idempotent; existing instances are updated
/// in place. Returns one report per processed instance.
pub fn build_chains(
    store: &mut dyn AssetStore,
    map: &CharacterAnimationMap,
    destination: &AssetPath,
    base_parent: &AssetPath,
    data_dir: &Path,
) -> Vec<AssetReport> {
    if map.is_empty() {
        error!("No character/animation pairs to build chains for");
        return Vec::new();
    }
    if !store.exists(base_parent) {
        error!("Base parent material {} does not exist", base_parent);
        return Vec::new();
    }

    let mut reports = Vec::new();
    for (character, animations) in map {
        // Invocation-scoped hub reference, re-derived on every run
        let mut first_instance: Option<AssetPath> = None;

        for animation in animations {
            let path = destination.join(&identity::instance_asset_name(character, animation));
            let is_first = first_instance.is_none();
            let parent = first_instance.clone().unwrap_or_else(|| base_parent.clone());

            if !ensure_instance(store, &path, &parent) {
                continue;
            }

            let mut report = AssetReport::new(path.clone());
            for role in [TextureRole::Position, TextureRole::Rotation] {
                bind_texture(store, &mut report, &path, destination, character, animation, role);
            }

            if is_first {
                let outcome = match store.set_switch_parameter(&path, LEGACY_SUPPORT_PARAMETER, true)
                {
                    Ok(()) => BindOutcome::Bound,
                    Err(e) => BindOutcome::Failed(e.to_string()),
                };
                report.record(LEGACY_SUPPORT_PARAMETER, outcome);
            }

            bind_bounds(store, &mut report, &path, data_dir, character, animation);

            if let Err(e) = store.save_asset(&path) {
                warn!("Failed to save {}: {}", path, e);
            }

            info!("Chain instance ready: {}", path);
            reports.push(report);
            if is_first {
                first_instance = Some(path);
            }
        }
    }
    reports
}

/// Create the instance with the given parent, or reparent an existing one
/// in place. Returns false when the path cannot be used.
fn ensure_instance(store: &mut dyn AssetStore, path: &AssetPath, parent: &AssetPath) -> bool {
    if store.exists(path) {
        if store.class_of(path) != Some(AssetClass::MaterialInstance) {
            warn!("{} exists but is not a material instance, skipping", path);
            return false;
        }
        debug!("Reusing existing instance {}", path);
        if let Err(e) = store.set_parent(path, parent) {
            warn!("Failed to reparent {}: {}", path, e);
        }
        return true;
    }

    match store.create_material_instance(path, Some(parent)) {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to create {}: {}", path, e);
            false
        }
    }
}

fn bind_texture(
    store: &mut dyn AssetStore,
    report: &mut AssetReport,
    path: &AssetPath,
    destination: &AssetPath,
    character: &str,
    animation: &str,
    role: TextureRole,
) {
    let parameter = match role {
        TextureRole::Position => POSITION_TEXTURE_PARAMETER,
        TextureRole::Rotation => ROTATION_TEXTURE_PARAMETER,
    };
    let texture = destination.join(&identity::texture_asset_name(character, animation, role));

    if !store.exists(&texture) {
        debug!("Texture {} not imported yet, skipping binding", texture);
        report.record(parameter, BindOutcome::Absent);
        return;
    }
    let outcome = match store.set_texture_parameter(path, parameter, &texture) {
        Ok(()) => BindOutcome::Bound,
        Err(e) => BindOutcome::Failed(e.to_string()),
    };
    report.record(parameter, outcome);
}

fn bind_bounds(
    store: &mut dyn AssetStore,
    report: &mut AssetReport,
    path: &AssetPath,
    data_dir: &Path,
    character: &str,
    animation: &str,
) {
    let sidecar = data_dir.join(identity::bounds_file_name(character, animation));
    let Some(bounds) = bounds::load(&sidecar) else {
        report.record("Bounds", BindOutcome::Absent);
        return;
    };

    for (parameter, value) in bounds.scalar_parameters() {
        let outcome = match store.set_scalar_parameter(path, parameter, value) {
            Ok(()) => BindOutcome::Bound,
            Err(e) => BindOutcome::Failed(e.to_string()),
        };
        report.record(parameter, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use vat_store::MemoryStore;

    fn scenario_map() -> CharacterAnimationMap {
        let mut map = CharacterAnimationMap::new();
        map.insert("A".to_string(), vec!["Angry".to_string(), "Clap".to_string()]);
        map.insert("B".to_string(), vec!["Wave".to_string()]);
        map
    }

    fn data_fixture(test: &str, sidecars: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vatgen_chain_{}_{}", test, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in sidecars {
            fs::write(dir.join(name), content).unwrap();
        }
        dir
    }

    fn store_with_base() -> (MemoryStore, AssetPath) {
        let mut store = MemoryStore::new();
        let base = AssetPath::from("/Game/Base/BaseVAT");
        store.insert(base.clone(), AssetClass::Material);
        (store, base)
    }

    #[test]
    fn hub_and_spoke_parenting() {
        let (mut store, base) = store_with_base();
        let data_dir = data_fixture("hub", &[]);
        let dest = AssetPath::from("/Game/VAT");

        let reports = build_chains(&mut store, &scenario_map(), &dest, &base, &data_dir);
        assert_eq!(reports.len(), 3);

        let angry = AssetPath::from("/Game/VAT/MI_VAT_A_Angry");
        let clap = AssetPath::from("/Game/VAT/MI_VAT_A_Clap");
        let wave = AssetPath::from("/Game/VAT/MI_VAT_B_Wave");

        assert_eq!(store.parent_of(&angry).unwrap(), Some(base.clone()));
        assert_eq!(store.parent_of(&clap).unwrap(), Some(angry.clone()));
        assert_eq!(store.parent_of(&wave).unwrap(), Some(base));

        // The legacy switch is enabled on first instances only
        assert_eq!(
            store.entry(&angry).unwrap().switch_parameters.get(LEGACY_SUPPORT_PARAMETER),
            Some(&true)
        );
        assert_eq!(
            store.entry(&wave).unwrap().switch_parameters.get(LEGACY_SUPPORT_PARAMETER),
            Some(&true)
        );
        assert!(store
            .entry(&clap)
            .unwrap()
            .switch_parameters
            .get(LEGACY_SUPPORT_PARAMETER)
            .is_none());
    }

    #[test]
    fn texture_bindings_skip_missing_textures() {
        let (mut store, base) = store_with_base();
        let dest = AssetPath::from("/Game/VAT");
        store.insert("/Game/VAT/T_A_Angry_pos", AssetClass::Texture2D);
        let data_dir = data_fixture("textures", &[]);

        let reports = build_chains(&mut store, &scenario_map(), &dest, &base, &data_dir);

        let angry = &reports[0];
        assert_eq!(angry.outcome(POSITION_TEXTURE_PARAMETER), Some(&BindOutcome::Bound));
        assert_eq!(angry.outcome(ROTATION_TEXTURE_PARAMETER), Some(&BindOutcome::Absent));
        assert!(angry.is_clean());

        let entry = store.entry(&"/Game/VAT/MI_VAT_A_Angry".into()).unwrap();
        assert_eq!(
            entry.texture_parameters.get(POSITION_TEXTURE_PARAMETER),
            Some(&AssetPath::from("/Game/VAT/T_A_Angry_pos"))
        );
    }

    #[test]
    fn bounds_bind_all_six_scalars() {
        let (mut store, base) = store_with_base();
        let dest = AssetPath::from("/Game/VAT");
        let data_dir = data_fixture(
            "bounds",
            &[(
                "A_Angry_data.json",
                r#"[{"max_x":1.0,"min_x":-1.0,"max_y":2.0,"min_y":-2.0,"max_z":3.0,"min_z":-3.0}]"#,
            )],
        );

        let reports = build_chains(&mut store, &scenario_map(), &dest, &base, &data_dir);

        let entry = store.entry(&"/Game/VAT/MI_VAT_A_Angry".into()).unwrap();
        assert_eq!(entry.scalar_parameters.get("MaxZ"), Some(&3.0));
        assert_eq!(entry.scalar_parameters.get("MinX"), Some(&-1.0));
        assert_eq!(entry.scalar_parameters.len(), 6);

        // The other instances had no sidecar
        assert_eq!(reports[1].outcome("Bounds"), Some(&BindOutcome::Absent));
    }

    #[test]
    fn existing_instances_are_updated_in_place() {
        let (mut store, base) = store_with_base();
        let dest = AssetPath::from("/Game/VAT");
        let stale = AssetPath::from("/Game/Other/Stale");
        store.insert(stale.clone(), AssetClass::Material);
        store
            .create_material_instance(&"/Game/VAT/MI_VAT_A_Angry".into(), Some(&stale))
            .unwrap();
        let data_dir = data_fixture("update", &[]);

        build_chains(&mut store, &scenario_map(), &dest, &base, &data_dir);

        assert_eq!(
            store.parent_of(&"/Game/VAT/MI_VAT_A_Angry".into()).unwrap(),
            Some(base)
        );
        // 1 base + 1 stale parent + 3 chain instances, nothing recreated
        assert_eq!(store.asset_count(), 5);
    }

    #[test]
    fn missing_base_parent_leaves_the_store_untouched() {
        let mut store = MemoryStore::new();
        let data_dir = data_fixture("nobase", &[]);

        let reports = build_chains(
            &mut store,
            &scenario_map(),
            &"/Game/VAT".into(),
            &"/Game/Base/Missing".into(),
            &data_dir,
        );

        assert!(reports.is_empty());
        assert_eq!(store.asset_count(), 0);
    }
}
