//! The subset of the glTF 2.0 JSON document the loader understands.
//!
//! Every top-level array is optional in the document and defaults to empty;
//! missing entries are reported when something actually references them.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::AssetError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: Option<usize>,
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub uri: Option<String>,
    pub byte_length: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Primitive {
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Texture {
    pub source: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub name: Option<String>,
    pub uri: Option<String>,
}

impl Manifest {
    pub fn parse(bytes: &[u8], source: &str) -> Result<Self, AssetError> {
        serde_json::from_slice(bytes).map_err(|err| AssetError::ManifestParseFailed {
            source_name: source.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor, AssetError> {
        self.accessors
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "accessor", index })
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferView, AssetError> {
        self.buffer_views
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "bufferView", index })
    }

    pub fn buffer(&self, index: usize) -> Result<&Buffer, AssetError> {
        self.buffers
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "buffer", index })
    }

    pub fn material(&self, index: usize) -> Result<&Material, AssetError> {
        self.materials
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "material", index })
    }

    pub fn texture(&self, index: usize) -> Result<&Texture, AssetError> {
        self.textures
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "texture", index })
    }

    pub fn image(&self, index: usize) -> Result<&Image, AssetError> {
        self.images
            .get(index)
            .ok_or(AssetError::InvalidReference { kind: "image", index })
    }

    /// Resolves the bufferView an accessor reads from.
    pub fn view_for(
        &self,
        accessor: &Accessor,
        accessor_index: usize,
    ) -> Result<&BufferView, AssetError> {
        let view_index = accessor.buffer_view.ok_or(AssetError::InvalidReference {
            kind: "bufferView of accessor",
            index: accessor_index,
        })?;
        self.buffer_view(view_index)
    }
}
