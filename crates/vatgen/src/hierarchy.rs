use anyhow::Context;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use vat_store::{
    AssetClass, AssetPath, AssetStore, PropertyValue, StoreError, SLOT_NAMES_PROPERTY,
};

pub const VAT_MATERIALS_FOLDER: &str = "VAT_Materials";
pub const MASTER_FOLDER: &str = "Master";

/// Template property referencing the mesh whose slots drive the synthesis.
pub const MESH_PROPERTY: &str = "mesh";
/// The two ordered reference lists attached to the template for runtime
/// material swapping.
pub const ORIGINAL_INSTANCES_PROPERTY: &str = "OriginalMaterialInstances";
pub const VAT_INSTANCES_PROPERTY: &str = "VatMaterialInstances";

/// One resolved material slot: the slot name and the unique original
/// instance asset it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBinding {
    pub slot: String,
    pub original: AssetPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    pub original: AssetPath,
    pub duplicate: AssetPath,
}

/// State of one synthesis invocation. Owns the duplicated-ancestor memo and
/// the duplicate graph; dropped when the run ends, so a re-run re-derives
/// everything from current store state.
#[derive(Debug)]
pub struct SynthesisRun {
    variant: String,
    vat_folder: AssetPath,
    master_folder: AssetPath,
    /// original base material -> its duplicate, shared across all slots
    duplicated_base_materials: HashMap<AssetPath, AssetPath>,
    /// every instance duplicated this run, slot instances and intermediate
    /// parents alike
    duplicated: Vec<DuplicatePair>,
}

impl SynthesisRun {
    pub fn new(variant: impl Into<String>, vat_folder: AssetPath) -> SynthesisRun {
        let master_folder = vat_folder.join(MASTER_FOLDER);
        SynthesisRun {
            variant: variant.into(),
            vat_folder,
            master_folder,
            duplicated_base_materials: HashMap::new(),
            duplicated: Vec::new(),
        }
    }

    pub fn vat_folder(&self) -> &AssetPath {
        &self.vat_folder
    }

    pub fn master_folder(&self) -> &AssetPath {
        &self.master_folder
    }

    pub fn duplicated(&self) -> &[DuplicatePair] {
        &self.duplicated
    }

    fn duplicate_name(&self, original_name: &str) -> String {
        format!("{}_VAT_{}", original_name, self.variant)
    }

    fn record(&mut self, original: &AssetPath, duplicate: &AssetPath) {
        let pair = DuplicatePair {
            original: original.clone(),
            duplicate: duplicate.clone(),
        };
        if !self.duplicated.contains(&pair) {
            self.duplicated.push(pair);
        }
    }
}

/// Derive the variant name from a template asset name the way the original
/// tooling does: drop the `BP_` prefix and any `VAT` token, trim
/// underscores.
pub fn variant_name_from_template(name: &str) -> String {
    name.replace("BP_", "")
        .replace("VAT", "")
        .trim_matches('_')
        .to_string()
}

/// Resolve material slots to original instance assets through one recursive
/// listing. A slot resolves only when exactly one listed asset carries its
/// name; ambiguous slots are rejected outright rather than matched
/// first-wins.
pub fn resolve_slots(
    store: &dyn AssetStore,
    search_root: &AssetPath,
    slots: &[String],
) -> Vec<SlotBinding> {
    let listing = store.list_assets(search_root, true);

    let mut bindings = Vec::new();
    for slot in slots {
        debug!("Processing material slot: {}", slot);
        let candidates: Vec<&AssetPath> =
            listing.iter().filter(|path| path.name() == slot).collect();

        let original = match candidates.as_slice() {
            [] => {
                warn!("Material instance not found for slot: {}", slot);
                continue;
            }
            [single] => (*single).clone(),
            many => {
                warn!(
                    "Slot {} is ambiguous: {} assets carry its name, rejecting",
                    slot,
                    many.len()
                );
                continue;
            }
        };

        if store.class_of(&original) != Some(AssetClass::MaterialInstance) {
            warn!("Asset {} is not a valid material instance for slot {}", original, slot);
            continue;
        }
        bindings.push(SlotBinding {
            slot: slot.clone(),
            original,
        });
    }
    bindings
}

/// Duplicate one slot's instance into the VAT folder and walk its parent
/// chain, duplicating every ancestor into the Master folder. A genuine base
/// material is duplicated at most once per run; the walk stops there, or at
/// an absent parent.
pub fn duplicate_slot_instance(
    store: &mut dyn AssetStore,
    run: &mut SynthesisRun,
    binding: &SlotBinding,
) -> anyhow::Result<()> {
    let duplicate = run.vat_folder.join(&run.duplicate_name(binding.original.name()));
    duplicate_once(store, &binding.original, &duplicate)
        .with_context(|| format!("Failed to duplicate slot instance {}", binding.original))?;
    run.record(&binding.original, &duplicate);

    let mut current = store.parent_of(&binding.original)?;
    while let Some(parent) = current {
        let target = run.master_folder.join(&run.duplicate_name(parent.name()));
        match store.class_of(&parent) {
            Some(AssetClass::Material) => {
                if !run.duplicated_base_materials.contains_key(&parent) {
                    duplicate_once(store, &parent, &target)
                        .with_context(|| format!("Failed to duplicate base material {}", parent))?;
                    run.duplicated_base_materials.insert(parent, target);
                }
                break;
            }
            _ => {
                duplicate_once(store, &parent, &target)
                    .with_context(|| format!("Failed to duplicate parent {}", parent))?;
                run.record(&parent, &target);
                current = store.parent_of(&parent)?;
            }
        }
    }
    Ok(())
}

/// Second pass over the run's duplicate graph: rewire every duplicated
/// instance's parent pointer from the original ancestor to the
/// corresponding duplicate in the Master folder.
pub fn relink_duplicates(store: &mut dyn AssetStore, run: &SynthesisRun) {
    for pair in &run.duplicated {
        if store.class_of(&pair.duplicate) != Some(AssetClass::MaterialInstance) {
            debug!("Skipping non-instance duplicate {}", pair.duplicate);
            continue;
        }

        let original_parent = match store.parent_of(&pair.original) {
            Ok(Some(parent)) => parent,
            Ok(None) => {
                warn!("Material instance {} has no parent material", pair.original);
                continue;
            }
            Err(e) => {
                warn!("Failed to read parent of {}: {}", pair.original, e);
                continue;
            }
        };

        let expected = run.duplicate_name(original_parent.name());
        if pair.duplicate.name() == expected {
            warn!(
                "Skipping {}: parent duplicate would be the instance itself",
                pair.duplicate
            );
            continue;
        }

        let target = run.master_folder.join(&expected);
        if !store.exists(&target) {
            warn!("Duplicate parent {} not found at {}", expected, target);
            continue;
        }

        match store.set_parent(&pair.duplicate, &target) {
            Ok(()) => {
                debug!(
                    "Relinked {}: {} -> {}",
                    pair.duplicate,
                    original_parent.name(),
                    expected
                );
                if let Err(e) = store.save_asset(&pair.duplicate) {
                    warn!("Failed to save {}: {}", pair.duplicate, e);
                }
            }
            Err(e) => warn!("Failed to set parent on {}: {}", pair.duplicate, e),
        }
    }
}

/// Final pass: pair each resolved slot's original with its duplicate (by
/// `<original-name>_VAT_` prefix, VAT folder only) and attach the two
/// equal-length ordered lists to the template.
pub fn map_to_template(
    store: &mut dyn AssetStore,
    run: &SynthesisRun,
    template: &AssetPath,
    bindings: &[SlotBinding],
) -> Result<(), StoreError> {
    let mut originals = Vec::new();
    let mut duplicates = Vec::new();

    for binding in bindings {
        let prefix = format!("{}_VAT_", binding.original.name());
        let found = run.duplicated.iter().find(|pair| {
            pair.duplicate.parent().as_ref() == Some(&run.vat_folder)
                && pair.duplicate.name().starts_with(&prefix)
        });
        match found {
            Some(pair) => {
                originals.push(binding.original.clone());
                duplicates.push(pair.duplicate.clone());
            }
            None => warn!("No duplicate produced for slot {}", binding.slot),
        }
    }

    info!("Assigning {} material instance pairs to {}", originals.len(), template);
    store.set_property(
        template,
        ORIGINAL_INSTANCES_PROPERTY,
        PropertyValue::RefList(originals),
    )?;
    store.set_property(
        template,
        VAT_INSTANCES_PROPERTY,
        PropertyValue::RefList(duplicates),
    )?;
    store.save_asset(template)
}

/// Assign this run's duplicated slot instances onto a mesh's material slots
/// positionally. Returns the number of slots assigned.
pub fn assign_to_mesh_slots(
    store: &mut dyn AssetStore,
    mesh: &AssetPath,
    duplicates: &[AssetPath],
) -> usize {
    let slot_count = match store.get_property(mesh, SLOT_NAMES_PROPERTY) {
        Ok(PropertyValue::TextList(names)) => names.len(),
        _ => {
            warn!("No material slots found on {}", mesh);
            return 0;
        }
    };

    let mut assigned = 0;
    for (index, duplicate) in duplicates.iter().enumerate() {
        if index >= slot_count {
            warn!("{} does not fit in slot {}, skipping", duplicate, index);
            continue;
        }
        match store.set_slot_material(mesh, index, duplicate) {
            Ok(()) => {
                info!("Assigned {} to material slot {}", duplicate, index);
                assigned += 1;
            }
            Err(e) => warn!("Failed to assign slot {}: {}", index, e),
        }
    }
    assigned
}

/// Full synthesis over a template asset: resolve its mesh's slots, build
/// the duplicate hierarchy, relink it, and attach the slot mapping. Soft
/// failure contract: `false` means nothing usable was produced.
pub fn synthesize(
    store: &mut dyn AssetStore,
    template: &AssetPath,
    search_root: &AssetPath,
    variant: Option<&str>,
) -> bool {
    if store.class_of(template) != Some(AssetClass::Template) {
        warn!("Selected asset {} is not a template", template);
        return false;
    }

    let variant = match variant {
        Some(variant) => variant.to_string(),
        None => variant_name_from_template(template.name()),
    };
    if variant.is_empty() {
        warn!("Cannot derive a variant name from {}", template);
        return false;
    }
    info!("VAT variant name: {}", variant);

    let mesh = match store.get_property(template, MESH_PROPERTY) {
        Ok(PropertyValue::Ref(mesh)) => mesh,
        _ => {
            warn!("No mesh reference on template {}", template);
            return false;
        }
    };
    let slots = match store.get_property(&mesh, SLOT_NAMES_PROPERTY) {
        Ok(PropertyValue::TextList(slots)) if !slots.is_empty() => slots,
        _ => {
            warn!("No material slots on mesh {}", mesh);
            return false;
        }
    };

    // The VAT folder lives next to the template's own folder
    let vat_folder = match template.parent().and_then(|dir| dir.parent()) {
        Some(parent_directory) => parent_directory.join(VAT_MATERIALS_FOLDER),
        None => {
            warn!("Template {} has no parent directory", template);
            return false;
        }
    };

    let mut run = SynthesisRun::new(variant, vat_folder);
    if let Err(e) = store.make_directory(run.vat_folder()) {
        error!("Failed to create {}: {}", run.vat_folder(), e);
        return false;
    }
    if let Err(e) = store.make_directory(run.master_folder()) {
        error!("Failed to create {}: {}", run.master_folder(), e);
        return false;
    }

    let bindings = resolve_slots(store, search_root, &slots);
    if bindings.is_empty() {
        warn!("No material slot resolved to an instance, nothing to do");
        return false;
    }

    for binding in &bindings {
        if let Err(e) = duplicate_slot_instance(store, &mut run, binding) {
            error!("{:#}", e);
        }
    }

    relink_duplicates(store, &run);

    if let Err(e) = map_to_template(store, &run, template, &bindings) {
        error!("Failed to attach instance lists to {}: {}", template, e);
        return false;
    }
    true
}

fn duplicate_once(
    store: &mut dyn AssetStore,
    source: &AssetPath,
    target: &AssetPath,
) -> Result<(), StoreError> {
    if store.exists(target) {
        debug!("Duplicate already exists at: {}", target);
        return Ok(());
    }
    store.duplicate_asset(source, target)?;
    info!("Duplicated {} to {}", source, target);
    store.save_asset(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vat_store::MemoryStore;

    const SEARCH_ROOT: &str = "/Game";

    /// Template in /Game/Crowd/BP, mesh with the given slots, instances
    /// parented per `parents`.
    fn seed(
        store: &mut MemoryStore,
        slots: &[&str],
        parents: &[(&str, &str)],
        base_materials: &[&str],
    ) -> (AssetPath, AssetPath) {
        let template = AssetPath::from("/Game/Crowd/BP/BP_GuyVAT");
        let mesh = AssetPath::from("/Game/Crowd/Mesh/SM_Guy");

        store.insert(template.clone(), AssetClass::Template).properties.insert(
            MESH_PROPERTY.to_string(),
            PropertyValue::Ref(mesh.clone()),
        );
        store.insert(mesh.clone(), AssetClass::StaticMesh).slots = slots
            .iter()
            .map(|name| vat_store::memory::MaterialSlot::new(*name))
            .collect();

        for path in base_materials {
            store.insert(*path, AssetClass::Material);
        }
        for (path, parent) in parents {
            store
                .create_material_instance(&AssetPath::from(*path), Some(&AssetPath::from(*parent)))
                .unwrap();
        }
        (template, mesh)
    }

    #[test]
    fn variant_name_derivation() {
        assert_eq!(variant_name_from_template("BP_CrowdVAT"), "Crowd");
        assert_eq!(variant_name_from_template("BP_VAT_Guy"), "Guy");
        assert_eq!(variant_name_from_template("Plain"), "Plain");
    }

    #[test]
    fn shared_base_material_is_duplicated_once() {
        let mut store = MemoryStore::new();
        let (template, _) = seed(
            &mut store,
            &["MI_Guy_Body", "MI_Guy_Hair"],
            &[
                ("/Game/Lib/MI_Guy_Body", "/Game/Lib/M_Base"),
                ("/Game/Lib/MI_Guy_Hair", "/Game/Lib/M_Base"),
            ],
            &["/Game/Lib/M_Base"],
        );

        assert!(synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));

        // Two slots share one ancestor: the master folder holds one asset,
        // not one per slot
        let master = AssetPath::from("/Game/Crowd/VAT_Materials/Master");
        assert_eq!(
            store.list_assets(&master, true),
            vec![master.join("M_Base_VAT_Guy")]
        );
    }

    #[test]
    fn intermediate_parents_are_walked_and_relinked() {
        let mut store = MemoryStore::new();
        let (template, _) = seed(
            &mut store,
            &["MI_Guy_Body", "MI_Guy_Hair"],
            &[
                ("/Game/Lib/MI_Guy_Body", "/Game/Lib/MI_Shared"),
                ("/Game/Lib/MI_Guy_Hair", "/Game/Lib/MI_Shared"),
                ("/Game/Lib/MI_Shared", "/Game/Lib/M_Base"),
            ],
            &["/Game/Lib/M_Base"],
        );

        assert!(synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));

        let vat = AssetPath::from("/Game/Crowd/VAT_Materials");
        let master = vat.join("Master");

        // Distinct ancestors: the shared intermediate and the base
        assert_eq!(store.list_assets(&master, true).len(), 2);

        // Slot duplicates point at the duplicated intermediate, which in
        // turn points at the duplicated base
        let body = vat.join("MI_Guy_Body_VAT_Guy");
        let shared = master.join("MI_Shared_VAT_Guy");
        assert_eq!(store.parent_of(&body).unwrap(), Some(shared.clone()));
        assert_eq!(
            store.parent_of(&shared).unwrap(),
            Some(master.join("M_Base_VAT_Guy"))
        );
    }

    #[test]
    fn self_parent_relink_is_rejected() {
        let mut store = MemoryStore::new();
        // Instance and parent share the name "X", so the expected duplicate
        // parent name collides with the duplicate's own name
        store.insert("/Game/Other/X", AssetClass::Material);
        store
            .create_material_instance(&"/Game/Lib/X".into(), Some(&"/Game/Other/X".into()))
            .unwrap();

        let mut run = SynthesisRun::new("Guy", "/Game/Crowd/VAT_Materials".into());
        let binding = SlotBinding {
            slot: "X".to_string(),
            original: "/Game/Lib/X".into(),
        };
        duplicate_slot_instance(&mut store, &mut run, &binding).unwrap();
        relink_duplicates(&mut store, &run);

        let duplicate = AssetPath::from("/Game/Crowd/VAT_Materials/X_VAT_Guy");
        assert!(store.exists(&duplicate));
        // The parent pointer still references the original, no cycle
        assert_eq!(
            store.parent_of(&duplicate).unwrap(),
            Some(AssetPath::from("/Game/Other/X"))
        );
    }

    #[test]
    fn ambiguous_slots_are_rejected() {
        let mut store = MemoryStore::new();
        let (template, _) = seed(
            &mut store,
            &["MI_Guy_Body"],
            &[
                ("/Game/Lib/MI_Guy_Body", "/Game/Lib/M_Base"),
                ("/Game/Dup/MI_Guy_Body", "/Game/Lib/M_Base"),
            ],
            &["/Game/Lib/M_Base"],
        );

        let bindings = resolve_slots(
            &store,
            &SEARCH_ROOT.into(),
            &["MI_Guy_Body".to_string()],
        );
        assert!(bindings.is_empty());
        assert!(!synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));
    }

    #[test]
    fn template_receives_equal_length_ordered_lists() {
        let mut store = MemoryStore::new();
        let (template, _) = seed(
            &mut store,
            &["MI_Guy_Body", "MI_Guy_Hair"],
            &[
                ("/Game/Lib/MI_Guy_Body", "/Game/Lib/M_Base"),
                ("/Game/Lib/MI_Guy_Hair", "/Game/Lib/M_Base"),
            ],
            &["/Game/Lib/M_Base"],
        );

        assert!(synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));

        let originals = store
            .get_property(&template, ORIGINAL_INSTANCES_PROPERTY)
            .unwrap();
        let duplicates = store.get_property(&template, VAT_INSTANCES_PROPERTY).unwrap();
        let vat = AssetPath::from("/Game/Crowd/VAT_Materials");

        assert_eq!(
            originals,
            PropertyValue::RefList(vec![
                "/Game/Lib/MI_Guy_Body".into(),
                "/Game/Lib/MI_Guy_Hair".into(),
            ])
        );
        assert_eq!(
            duplicates,
            PropertyValue::RefList(vec![
                vat.join("MI_Guy_Body_VAT_Guy"),
                vat.join("MI_Guy_Hair_VAT_Guy"),
            ])
        );
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut store = MemoryStore::new();
        let (template, _) = seed(
            &mut store,
            &["MI_Guy_Body"],
            &[("/Game/Lib/MI_Guy_Body", "/Game/Lib/M_Base")],
            &["/Game/Lib/M_Base"],
        );

        assert!(synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));
        let count = store.asset_count();
        assert!(synthesize(&mut store, &template, &SEARCH_ROOT.into(), None));
        assert_eq!(store.asset_count(), count);
    }

    #[test]
    fn duplicates_assign_onto_mesh_slots_positionally() {
        let mut store = MemoryStore::new();
        let (_, mesh) = seed(
            &mut store,
            &["MI_Guy_Body"],
            &[("/Game/Lib/MI_Guy_Body", "/Game/Lib/M_Base")],
            &["/Game/Lib/M_Base"],
        );
        store.insert("/Game/X/MI_A", AssetClass::MaterialInstance);
        store.insert("/Game/X/MI_B", AssetClass::MaterialInstance);

        let assigned = assign_to_mesh_slots(
            &mut store,
            &mesh,
            &["/Game/X/MI_A".into(), "/Game/X/MI_B".into()],
        );

        assert_eq!(assigned, 1);
        assert_eq!(
            store.entry(&mesh).unwrap().slots[0].assigned,
            Some(AssetPath::from("/Game/X/MI_A"))
        );
    }
}
