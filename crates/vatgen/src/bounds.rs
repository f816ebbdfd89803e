use log::{debug, error};
use serde::Deserialize;
use std::path::Path;

/// Six scalar extents for one baked animation, as written by the bake
/// exporter: a one-element JSON list wrapping the record.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundsData {
    pub max_x: f32,
    pub min_x: f32,
    pub max_y: f32,
    pub min_y: f32,
    pub max_z: f32,
    pub min_z: f32,
}

impl BoundsData {
    /// The scalar parameter name and value pairs in binding order.
    pub fn scalar_parameters(&self) -> [(&'static str, f32); 6] {
        [
            ("MaxX", self.max_x),
            ("MinX", self.min_x),
            ("MaxY", self.max_y),
            ("MinY", self.min_y),
            ("MaxZ", self.max_z),
            ("MinZ", self.min_z),
        ]
    }
}

/// Read a bounds sidecar. A missing file is a normal project state and
/// yields `None` quietly; a malformed file or a list of the wrong length is
/// logged as an error but still yields `None` so the caller's pass keeps
/// going.
pub fn load(path: &Path) -> Option<BoundsData> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No bounds file at {}", path.display());
            return None;
        }
        Err(e) => {
            error!("Failed to read bounds file {}: {}", path.display(), e);
            return None;
        }
    };

    let records: Vec<BoundsData> = match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to parse bounds file {}: {}", path.display(), e);
            return None;
        }
    };

    if records.len() != 1 {
        error!(
            "Bounds file {} holds {} records, expected exactly one",
            path.display(),
            records.len()
        );
        return None;
    }
    Some(records[0])
}
