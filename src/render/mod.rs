//! The seam between drawables and whatever graphics backend uploads them.

mod camera;
pub mod headless;

pub use camera::CameraController;
pub use headless::HeadlessBackend;

use crate::assets::{Drawable, IndexData, IndexElementWidth};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("backend does not accept 32-bit index buffers")]
    ExtendedIndicesUnsupported,
    #[error("texture data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    TextureSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("backend failed to create {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Position,
    Normal,
    TexCoord,
    Index,
}

/// Raw typed array handed to the backend.
#[derive(Debug, Clone, Copy)]
pub enum BufferData<'a> {
    F32(&'a [f32]),
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl BufferData<'_> {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::F32(data) => std::mem::size_of_val(*data),
            Self::U16(data) => std::mem::size_of_val(*data),
            Self::U32(data) => std::mem::size_of_val(*data),
        }
    }
}

pub trait GraphicsBackend {
    type Buffer;
    type Texture;

    /// Whether 32-bit index buffers can be drawn.
    fn supports_extended_indices(&self) -> bool;

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        data: BufferData<'_>,
    ) -> Result<Self::Buffer, RenderError>;

    /// `pixels` is tightly packed RGBA8.
    fn create_texture(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self::Texture, RenderError>;

    fn draw_indexed(
        &mut self,
        index_count: usize,
        index_width: IndexElementWidth,
    ) -> Result<(), RenderError>;
}

/// Backend handles for one uploaded drawable. After upload the drawable's
/// arrays may be dropped.
pub struct GpuMesh<B: GraphicsBackend> {
    pub position: B::Buffer,
    pub normal: B::Buffer,
    pub tex_coord: Option<B::Buffer>,
    pub index: B::Buffer,
    pub texture: Option<B::Texture>,
    pub index_count: usize,
    pub index_width: IndexElementWidth,
}

pub fn upload<B: GraphicsBackend>(
    backend: &mut B,
    drawable: &Drawable,
) -> Result<GpuMesh<B>, RenderError> {
    let buffers = &drawable.buffers;
    if drawable.index_element_width() == IndexElementWidth::U32
        && !backend.supports_extended_indices()
    {
        return Err(RenderError::ExtendedIndicesUnsupported);
    }

    let position =
        backend.create_buffer(BufferKind::Position, BufferData::F32(&buffers.position))?;
    let normal = backend.create_buffer(BufferKind::Normal, BufferData::F32(&buffers.normal))?;
    let tex_coord = match &buffers.tex_coord {
        Some(tex_coord) => {
            Some(backend.create_buffer(BufferKind::TexCoord, BufferData::F32(tex_coord))?)
        }
        None => None,
    };
    let index_data = match &buffers.indices {
        IndexData::U16(indices) => BufferData::U16(indices),
        IndexData::U32(indices) => BufferData::U32(indices),
    };
    let index = backend.create_buffer(BufferKind::Index, index_data)?;

    let texture = match &drawable.texture {
        Some(image) => {
            let expected = image.width as usize * image.height as usize * 4;
            if image.pixels.len() != expected {
                return Err(RenderError::TextureSizeMismatch {
                    width: image.width,
                    height: image.height,
                    expected,
                    actual: image.pixels.len(),
                });
            }
            Some(backend.create_texture(&image.pixels, image.width, image.height)?)
        }
        None => None,
    };

    log::debug!(
        "Uploaded '{}' ({} indices, {:?})",
        drawable.name,
        drawable.vertex_count(),
        drawable.index_element_width()
    );
    Ok(GpuMesh {
        position,
        normal,
        tex_coord,
        index,
        texture,
        index_count: drawable.vertex_count(),
        index_width: drawable.index_element_width(),
    })
}

pub fn draw<B: GraphicsBackend>(backend: &mut B, mesh: &GpuMesh<B>) -> Result<(), RenderError> {
    backend.draw_indexed(mesh.index_count, mesh.index_width)
}
