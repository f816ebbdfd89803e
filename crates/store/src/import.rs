use crate::AssetPath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One pending import of a source file into the store namespace.
/// `destination` is the full target path including the asset name, so
/// re-submitting the same task overwrites rather than duplicates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImportTask {
    pub source: PathBuf,
    pub destination: AssetPath,
    pub replace_existing: bool,
    pub automated: bool,
    pub options: ImportOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ImportOptions {
    Mesh(MeshImportOptions),
    Texture(TextureImportOptions),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MeshImportOptions {
    pub skeletal: bool,
    pub import_materials: bool,
    pub import_textures: bool,
    pub combined_normals_tangents: bool,
    pub build_nanite: bool,
    pub remove_degenerates: bool,
    pub auto_collision: bool,
    pub import_lods: bool,
}

impl Default for MeshImportOptions {
    fn default() -> Self {
        MeshImportOptions {
            skeletal: false,
            import_materials: false,
            import_textures: false,
            combined_normals_tangents: true,
            build_nanite: false,
            remove_degenerates: false,
            auto_collision: false,
            import_lods: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureGroup {
    World,
    SixteenBitLinear,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureCompression {
    Default,
    Hdr,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TextureImportOptions {
    pub mip_generation: bool,
    pub texture_group: TextureGroup,
    pub compression: TextureCompression,
}

impl Default for TextureImportOptions {
    fn default() -> Self {
        TextureImportOptions {
            mip_generation: false,
            texture_group: TextureGroup::SixteenBitLinear,
            compression: TextureCompression::Hdr,
        }
    }
}

impl ImportTask {
    pub fn mesh(source: PathBuf, destination: AssetPath) -> ImportTask {
        ImportTask {
            source,
            destination,
            replace_existing: true,
            automated: true,
            options: ImportOptions::Mesh(MeshImportOptions::default()),
        }
    }

    pub fn texture(source: PathBuf, destination: AssetPath) -> ImportTask {
        ImportTask {
            source,
            destination,
            replace_existing: true,
            automated: true,
            options: ImportOptions::Texture(TextureImportOptions::default()),
        }
    }
}
