pub mod decode;
pub mod drawable;
pub mod manifest;
pub mod primitives;
pub mod resolver;
pub mod texture;

#[cfg(test)]
mod tests;

pub use drawable::{Bounds, Drawable, IndexData, IndexElementWidth, VertexBuffers};
pub use resolver::{ByteSource, DetachedResolver, FileResolver, HttpResolver, VirtualFileSet};
pub use texture::TextureImage;

use crate::render::GraphicsBackend;
use decode::{ComponentType, ElementType, TypedView};
use manifest::{Accessor, BufferView, Manifest, Primitive};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to fetch glTF manifest {source_name}: {reason}")]
    ManifestFetchFailed { source_name: String, reason: String },
    #[error("failed to parse glTF manifest {source_name}: {reason}")]
    ManifestParseFailed { source_name: String, reason: String },
    #[error("glTF manifest contains no meshes")]
    NoMeshes,
    #[error("first glTF mesh contains no primitives")]
    NoPrimitives,
    #[error("primitive is missing required attributes: {}", .missing.join(", "))]
    MissingRequiredAttributes { missing: Vec<&'static str> },
    #[error("unsupported accessor type {accessor_type}")]
    UnsupportedAccessorType { accessor_type: String },
    #[error("unsupported accessor component type {component_type}")]
    UnsupportedComponentType { component_type: u32 },
    #[error("unsupported {attribute} format: component type {component_type}, type {accessor_type}")]
    UnsupportedAttributeFormat {
        attribute: &'static str,
        component_type: u32,
        accessor_type: String,
    },
    #[error("{attribute} has {actual} elements, POSITION has {expected}")]
    AttributeCountMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("buffer {buffer} has no external uri; embedded buffers are unsupported")]
    EmbeddedBufferUnsupported { buffer: usize },
    #[error("image {image} has no external uri; embedded images are unsupported")]
    EmbeddedImageUnsupported { image: String },
    #[error("resource not found: {path} (known paths: {})", .known.join(", "))]
    ResourceNotFound { path: String, known: Vec<String> },
    #[error("failed to read {path}: {source}")]
    ResourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {path}: {source}")]
    TextureDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("accessor range {offset}+{length} exceeds buffer of {available} bytes")]
    AccessorOutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },
    #[error("invalid {kind} reference {index}")]
    InvalidReference { kind: &'static str, index: usize },
    #[error("index {max_index} does not fit a 16-bit index buffer")]
    IndexRangeExceeds16Bit { max_index: u32 },
    #[error("index {max_index} points past the {vertex_count} vertices of POSITION")]
    IndexOutOfRange { max_index: u32, vertex_count: usize },
}

impl AssetError {
    /// Stable name of the error kind, for consoles and banners.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManifestFetchFailed { .. } => "ManifestFetchFailed",
            Self::ManifestParseFailed { .. } => "ManifestParseFailed",
            Self::NoMeshes => "NoMeshes",
            Self::NoPrimitives => "NoPrimitives",
            Self::MissingRequiredAttributes { .. } => "MissingRequiredAttributes",
            Self::UnsupportedAccessorType { .. } => "UnsupportedAccessorType",
            Self::UnsupportedComponentType { .. } => "UnsupportedComponentType",
            Self::UnsupportedAttributeFormat { .. } => "UnsupportedAttributeFormat",
            Self::AttributeCountMismatch { .. } => "AttributeCountMismatch",
            Self::EmbeddedBufferUnsupported { .. } => "EmbeddedBufferUnsupported",
            Self::EmbeddedImageUnsupported { .. } => "EmbeddedImageUnsupported",
            Self::ResourceNotFound { .. } => "ResourceNotFound",
            Self::ResourceRead { .. } => "ResourceRead",
            Self::TextureDecode { .. } => "TextureDecode",
            Self::AccessorOutOfBounds { .. } => "AccessorOutOfBounds",
            Self::InvalidReference { .. } => "InvalidReference",
            Self::IndexRangeExceeds16Bit { .. } => "IndexRangeExceeds16Bit",
            Self::IndexOutOfRange { .. } => "IndexOutOfRange",
        }
    }
}

/// Where a manifest comes from. The loader dispatches on this once.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Manifest URL; sub-resources are fetched relative to its directory.
    Url(String),
    /// A manifest on its own; nothing it references can be resolved.
    RawBytes { name: Option<String>, bytes: Vec<u8> },
    /// A file list, archive contents or walked directory.
    Files(VirtualFileSet),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Backend accepts 32-bit index buffers; otherwise indices are narrowed.
    pub extended_indices: bool,
}

impl LoaderOptions {
    pub fn for_backend<B: GraphicsBackend>(backend: &B) -> Self {
        Self {
            extended_indices: backend.supports_extended_indices(),
        }
    }
}

/// One accessor a primitive needs, resolved against the manifest.
struct Stream<'m> {
    semantic: &'static str,
    accessor: &'m Accessor,
    view: &'m BufferView,
}

#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    options: LoaderOptions,
}

impl AssetLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> LoaderOptions {
        self.options
    }

    /// Loads mesh 0 / primitive 0 of the manifest behind `source`. All
    /// resources are fetched sequentially; the first failure aborts the load.
    pub fn load(&self, source: &AssetSource, hint: Option<&str>) -> Result<Drawable, AssetError> {
        match source {
            AssetSource::Url(url) => {
                log::info!("Loading glTF from {}", url);
                let bytes = resolver::fetch_url(url).map_err(|reason| {
                    AssetError::ManifestFetchFailed {
                        source_name: url.clone(),
                        reason,
                    }
                })?;
                self.load_manifest(&bytes, url, resolver::url_directory(url), &HttpResolver)
            }
            AssetSource::RawBytes { name, bytes } => {
                let name = name.as_deref().or(hint).unwrap_or("untitled");
                log::info!("Loading glTF from {} in-memory bytes ({})", bytes.len(), name);
                self.load_manifest(bytes, name, "", &DetachedResolver)
            }
            AssetSource::Files(files) => {
                let path = files
                    .select_manifest(hint)
                    .ok_or_else(|| AssetError::ManifestFetchFailed {
                        source_name: hint.unwrap_or("file set").to_string(),
                        reason: format!("no .gltf manifest among {} files", files.len()),
                    })?
                    .to_string();
                log::info!("Loading glTF {} from a set of {} files", path, files.len());
                let bytes = files.resolve(&path).map_err(|err| AssetError::ManifestFetchFailed {
                    source_name: path.clone(),
                    reason: err.to_string(),
                })?;
                self.load_manifest(&bytes, &path, resolver::parent_dir(&path), files)
            }
        }
    }

    /// Runs the pipeline on manifest bytes already in hand. `manifest_dir`
    /// is the base every declared `uri` is joined to.
    pub fn load_manifest(
        &self,
        bytes: &[u8],
        manifest_path: &str,
        manifest_dir: &str,
        resolver: &dyn FileResolver,
    ) -> Result<Drawable, AssetError> {
        let manifest = Manifest::parse(bytes, manifest_path)?;

        let mesh = manifest.meshes.first().ok_or(AssetError::NoMeshes)?;
        let primitive = mesh.primitives.first().ok_or(AssetError::NoPrimitives)?;
        let (position, normal, tex_coord, indices) = required_streams(&manifest, primitive)?;

        let mut streams = vec![&position, &normal, &indices];
        streams.extend(tex_coord.as_ref());
        let buffers = load_buffers(&manifest, &streams, manifest_dir, resolver)?;

        let position_view = decode_stream(&buffers, &position)?;
        let positions = float_vec3(&position_view, position.semantic)?;
        let vertex_count = position_view.count();

        let normal_view = decode_stream(&buffers, &normal)?;
        expect_count(&normal_view, normal.semantic, vertex_count)?;
        let normals = float_vec3(&normal_view, normal.semantic)?;

        let tex_coords = match &tex_coord {
            Some(stream) => {
                let view = decode_stream(&buffers, stream)?;
                expect_count(&view, stream.semantic, vertex_count)?;
                Some(tex_coord_vec2(&view, stream)?)
            }
            None => None,
        };

        let index_view = decode_stream(&buffers, &indices)?;
        let index_data = normalize_indices(&index_view, self.options.extended_indices)?;
        if let Some(max_index) = index_data.max_index() {
            if max_index as usize >= vertex_count {
                return Err(AssetError::IndexOutOfRange {
                    max_index,
                    vertex_count,
                });
            }
        }

        let texture = load_base_color_texture(&manifest, primitive, manifest_dir, resolver)?;
        if texture.is_some() && tex_coords.is_none() {
            log::warn!("{} has a base color texture but no TEXCOORD_0", manifest_path);
        }

        let name = resolver::file_stem(manifest_path).to_string();
        let drawable = Drawable::new(
            name,
            VertexBuffers {
                position: positions,
                normal: normals,
                tex_coord: tex_coords,
                indices: index_data,
            },
            texture,
        );
        log::info!(
            "Loaded glTF '{}' vertices={} indices={} width={:?} textured={} center={:?} radius={}",
            drawable.name,
            drawable.attribute_vertex_count(),
            drawable.vertex_count(),
            drawable.index_element_width(),
            drawable.texture.is_some(),
            drawable.bounds.center,
            drawable.bounds.radius
        );
        Ok(drawable)
    }
}

type RequiredStreams<'m> = (Stream<'m>, Stream<'m>, Option<Stream<'m>>, Stream<'m>);

fn required_streams<'m>(
    manifest: &'m Manifest,
    primitive: &Primitive,
) -> Result<RequiredStreams<'m>, AssetError> {
    let position = primitive.attributes.get("POSITION").copied();
    let normal = primitive.attributes.get("NORMAL").copied();
    let indices = primitive.indices;

    let missing: Vec<&'static str> = [
        ("POSITION", position.is_none()),
        ("NORMAL", normal.is_none()),
        ("indices", indices.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    let (Some(position), Some(normal), Some(indices)) = (position, normal, indices) else {
        return Err(AssetError::MissingRequiredAttributes { missing });
    };

    let stream = |semantic: &'static str, index: usize| -> Result<Stream<'m>, AssetError> {
        let accessor = manifest.accessor(index)?;
        let view = manifest.view_for(accessor, index)?;
        Ok(Stream {
            semantic,
            accessor,
            view,
        })
    };
    let tex_coord = primitive
        .attributes
        .get("TEXCOORD_0")
        .map(|index| stream("TEXCOORD_0", *index))
        .transpose()?;
    Ok((
        stream("POSITION", position)?,
        stream("NORMAL", normal)?,
        tex_coord,
        stream("indices", indices)?,
    ))
}

/// Resolves every buffer the streams reference, once each, in index order.
fn load_buffers(
    manifest: &Manifest,
    streams: &[&Stream<'_>],
    manifest_dir: &str,
    resolver: &dyn FileResolver,
) -> Result<BTreeMap<usize, Vec<u8>>, AssetError> {
    let wanted: BTreeSet<usize> = streams.iter().map(|stream| stream.view.buffer).collect();
    let mut buffers = BTreeMap::new();
    for index in wanted {
        let buffer = manifest.buffer(index)?;
        let uri = external_uri(buffer.uri.as_deref())
            .ok_or(AssetError::EmbeddedBufferUnsupported { buffer: index })?;
        let path = resolver.join(manifest_dir, uri);
        log::debug!("Resolving buffer {} at {}", index, path);
        let bytes = resolver.resolve(&path)?;
        if let Some(declared) = buffer.byte_length {
            if bytes.len() < declared {
                log::warn!(
                    "Buffer {} is {} bytes, manifest declares {}",
                    path,
                    bytes.len(),
                    declared
                );
            }
        }
        buffers.insert(index, bytes);
    }
    Ok(buffers)
}

fn external_uri(uri: Option<&str>) -> Option<&str> {
    uri.filter(|uri| !uri.is_empty() && !uri.starts_with("data:"))
}

fn decode_stream<'b>(
    buffers: &'b BTreeMap<usize, Vec<u8>>,
    stream: &Stream<'_>,
) -> Result<TypedView<'b>, AssetError> {
    let raw = buffers
        .get(&stream.view.buffer)
        .ok_or(AssetError::InvalidReference {
            kind: "buffer",
            index: stream.view.buffer,
        })?;
    decode::decode(raw, stream.view, stream.accessor)
}

fn unsupported_format(view: &TypedView<'_>, attribute: &'static str) -> AssetError {
    AssetError::UnsupportedAttributeFormat {
        attribute,
        component_type: view.component_type().code(),
        accessor_type: view.element_type().name().to_string(),
    }
}

fn expect_count(
    view: &TypedView<'_>,
    attribute: &'static str,
    expected: usize,
) -> Result<(), AssetError> {
    if view.count() != expected {
        return Err(AssetError::AttributeCountMismatch {
            attribute,
            expected,
            actual: view.count(),
        });
    }
    Ok(())
}

fn float_vec3(view: &TypedView<'_>, attribute: &'static str) -> Result<Vec<f32>, AssetError> {
    match (view.component_type(), view.element_type()) {
        (ComponentType::F32, ElementType::Vec3) => Ok(view.to_f32_vec()),
        _ => Err(unsupported_format(view, attribute)),
    }
}

/// Float texcoords pass through; unsigned byte/short ones must be flagged
/// `normalized` and are mapped to `[0, 1]`.
fn tex_coord_vec2(view: &TypedView<'_>, stream: &Stream<'_>) -> Result<Vec<f32>, AssetError> {
    match (view.component_type(), view.element_type()) {
        (ComponentType::F32, ElementType::Vec2) => Ok(view.to_f32_vec()),
        (ComponentType::U8 | ComponentType::U16, ElementType::Vec2)
            if stream.accessor.normalized =>
        {
            Ok(view.to_normalized_f32_vec())
        }
        _ => Err(unsupported_format(view, stream.semantic)),
    }
}

/// Produces 16-bit indices unless the source is 32-bit and the backend
/// accepts 32-bit index buffers.
fn normalize_indices(view: &TypedView<'_>, extended: bool) -> Result<IndexData, AssetError> {
    if view.element_type() != ElementType::Scalar {
        return Err(unsupported_format(view, "indices"));
    }
    let values = view
        .to_u32_vec()
        .ok_or_else(|| unsupported_format(view, "indices"))?;
    match view.component_type() {
        ComponentType::U32 if extended => Ok(IndexData::U32(values)),
        ComponentType::U32 => {
            let max_index = values.iter().copied().max().unwrap_or(0);
            if max_index > u32::from(u16::MAX) {
                return Err(AssetError::IndexRangeExceeds16Bit { max_index });
            }
            log::debug!("Narrowed {} 32-bit indices to 16-bit", values.len());
            Ok(IndexData::U16(values.into_iter().map(|value| value as u16).collect()))
        }
        // u8 and u16 sources always fit.
        _ => Ok(IndexData::U16(values.into_iter().map(|value| value as u16).collect())),
    }
}

fn load_base_color_texture(
    manifest: &Manifest,
    primitive: &Primitive,
    manifest_dir: &str,
    resolver: &dyn FileResolver,
) -> Result<Option<TextureImage>, AssetError> {
    let Some(material_index) = primitive.material else {
        return Ok(None);
    };
    let material = manifest.material(material_index)?;
    let Some(info) = material
        .pbr_metallic_roughness
        .as_ref()
        .and_then(|pbr| pbr.base_color_texture.as_ref())
    else {
        return Ok(None);
    };
    if info.tex_coord != 0 {
        log::warn!(
            "Material {} samples TEXCOORD_{}; only TEXCOORD_0 is loaded",
            material.name.as_deref().unwrap_or("unnamed"),
            info.tex_coord
        );
    }
    let texture = manifest.texture(info.index)?;
    let Some(image_index) = texture.source else {
        log::warn!("Texture {} has no image source; loading untextured", info.index);
        return Ok(None);
    };
    let image = manifest.image(image_index)?;
    let uri = external_uri(image.uri.as_deref()).ok_or_else(|| {
        AssetError::EmbeddedImageUnsupported {
            image: image
                .name
                .clone()
                .unwrap_or_else(|| format!("#{image_index}")),
        }
    })?;
    let path = resolver.join(manifest_dir, uri);
    log::debug!("Resolving base color texture at {}", path);
    let bytes = resolver.resolve(&path)?;
    TextureImage::decode(&bytes, &path).map(Some)
}
