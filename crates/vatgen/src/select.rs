use crate::catalog::AssetCatalog;
use crate::identity::AnimTokenRule;
use log::{debug, info};
use std::collections::BTreeSet;

/// Resolve the set of characters one invocation operates on. A non-empty
/// raw filter is authoritative: comma-separated, whitespace-trimmed, and
/// deliberately not validated against the catalog (an unknown name just
/// filters everything out downstream). An empty filter falls back to every
/// character discoverable from the mesh family. All downstream operations
/// use this one resolution, so imports and instance creation always agree
/// on scope.
pub fn resolve(
    raw: Option<&str>,
    catalog: &AssetCatalog,
    rule: AnimTokenRule,
) -> BTreeSet<String> {
    let explicit: BTreeSet<String> = raw
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    if explicit.is_empty() {
        let discovered = catalog.mesh_characters(rule);
        debug!("No character filter given, using {} discovered", discovered.len());
        discovered
    } else {
        info!("Character filter: {:?}", explicit);
        explicit
    }
}
