use crate::catalog::{AssetCatalog, AssetKind};
use crate::identity::{self, AnimTokenRule};
use crate::report::{AssetReport, BindOutcome};
use log::{error, info, warn};
use std::collections::BTreeSet;
use vat_store::{
    AssetPath, AssetStore, ImportTask, PropertyValue, TextureImportOptions,
    COMPRESSION_PROPERTY, MIP_GENERATION_PROPERTY, SRGB_PROPERTY, TEXTURE_GROUP_PROPERTY,
};

/// Import every mesh file belonging to a selected character. Returns the
/// destination paths the store accepted; an empty result means nothing can
/// be assumed imported.
pub fn import_meshes(
    store: &mut dyn AssetStore,
    catalog: &AssetCatalog,
    destination: &AssetPath,
    characters: &BTreeSet<String>,
    rule: AnimTokenRule,
) -> Vec<AssetPath> {
    let mut tasks = Vec::new();
    for record in catalog.records(rule) {
        if record.kind != AssetKind::Mesh || !characters.contains(&record.character) {
            continue;
        }
        let Some(stem) = record.path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        info!("Import task: {}", record.path.display());
        tasks.push(ImportTask::mesh(
            record.path.clone(),
            destination.join(stem),
        ));
    }

    if tasks.is_empty() {
        error!("No mesh file matches the selected characters");
        return Vec::new();
    }

    submit(store, tasks)
}

/// Import the position/rotation texture files of the selected characters
/// under their canonical `T_<character>_<animation>_{pos,rot}` names, then
/// run the mandatory settings-enforcement pass on each produced asset.
pub fn import_textures(
    store: &mut dyn AssetStore,
    catalog: &AssetCatalog,
    destination: &AssetPath,
    characters: &BTreeSet<String>,
    rule: AnimTokenRule,
) -> (Vec<AssetPath>, Vec<AssetReport>) {
    let mut tasks = Vec::new();
    for path in catalog.texture_files() {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(id) = identity::parse_texture_stem(name, rule) else {
            warn!("Texture {} does not follow the naming convention", name);
            continue;
        };
        if !characters.contains(&id.character) {
            continue;
        }
        let target = identity::texture_asset_name(&id.character, &id.animation, id.role);
        info!("Import task: {} -> {}", path.display(), target);
        tasks.push(ImportTask::texture(path, destination.join(&target)));
    }

    if tasks.is_empty() {
        error!("No texture file matches the selected characters");
        return (Vec::new(), Vec::new());
    }

    let produced = submit(store, tasks);

    // The import backend may silently ignore texture settings, so they are
    // re-applied per asset here. A failed asset is reported, never fatal.
    let reports = produced
        .iter()
        .map(|asset| enforce_texture_settings(store, asset))
        .collect();

    (produced, reports)
}

/// Re-apply the texture import settings plus the sRGB switch directly on an
/// imported asset.
pub fn enforce_texture_settings(store: &mut dyn AssetStore, asset: &AssetPath) -> AssetReport {
    let options = TextureImportOptions::default();
    let mut report = AssetReport::new(asset.clone());

    let settings = [
        (
            MIP_GENERATION_PROPERTY,
            PropertyValue::Bool(options.mip_generation),
        ),
        (
            TEXTURE_GROUP_PROPERTY,
            PropertyValue::Text(format!("{:?}", options.texture_group)),
        ),
        (
            COMPRESSION_PROPERTY,
            PropertyValue::Text(format!("{:?}", options.compression)),
        ),
        (SRGB_PROPERTY, PropertyValue::Bool(false)),
    ];

    for (name, value) in settings {
        match store.set_property(asset, name, value) {
            Ok(()) => report.record(name, BindOutcome::Bound),
            Err(e) => report.record(name, BindOutcome::Failed(e.to_string())),
        }
    }
    report
}

/// One blocking batch submission. A batch-level store failure degrades to
/// an empty result so callers assume nothing was imported.
fn submit(store: &mut dyn AssetStore, tasks: Vec<ImportTask>) -> Vec<AssetPath> {
    match store.submit_import_batch(&tasks) {
        Ok(produced) => {
            info!("Finished importing {} of {} tasks", produced.len(), tasks.len());
            produced
        }
        Err(e) => {
            error!("Import batch failed: {}", e);
            Vec::new()
        }
    }
}
