use glam::Vec3;

use super::texture::TextureImage;

/// Index buffer element width, which selects the draw call's index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexElementWidth {
    U16,
    U32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn len(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> IndexElementWidth {
        match self {
            Self::U16(_) => IndexElementWidth::U16,
            Self::U32(_) => IndexElementWidth::U32,
        }
    }

    pub fn max_index(&self) -> Option<u32> {
        match self {
            Self::U16(indices) => indices.iter().copied().max().map(u32::from),
            Self::U32(indices) => indices.iter().copied().max(),
        }
    }
}

/// Flat vertex streams: `position`/`normal` are VEC3 per vertex,
/// `tex_coord` VEC2 per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffers {
    pub position: Vec<f32>,
    pub normal: Vec<f32>,
    pub tex_coord: Option<Vec<f32>>,
    pub indices: IndexData,
}

/// Enclosing sphere used for camera framing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: [f32; 3],
    pub radius: f32,
}

/// Radius floor so that flat or point-like geometry still frames sensibly.
pub const MIN_BOUNDS_RADIUS: f32 = 1.0;

impl Bounds {
    /// Axis-aligned midpoint plus half the largest axis extent.
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut points = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]));
        let Some(first) = points.next() else {
            return Self {
                center: [0.0; 3],
                radius: MIN_BOUNDS_RADIUS,
            };
        };
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let center = (min + max) * 0.5;
        let radius = ((max - min).max_element() * 0.5).max(MIN_BOUNDS_RADIUS);
        Self {
            center: center.to_array(),
            radius,
        }
    }
}

/// Backend-neutral result of one load: immutable once built, replaced
/// wholesale by the next load.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub name: String,
    pub buffers: VertexBuffers,
    pub texture: Option<TextureImage>,
    pub bounds: Bounds,
}

impl Drawable {
    pub fn new(name: String, buffers: VertexBuffers, texture: Option<TextureImage>) -> Self {
        let bounds = Bounds::from_positions(&buffers.position);
        Self {
            name,
            buffers,
            texture,
            bounds,
        }
    }

    pub fn index_element_width(&self) -> IndexElementWidth {
        self.buffers.indices.width()
    }

    /// Number of indices to draw, not the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.buffers.indices.len()
    }

    pub fn attribute_vertex_count(&self) -> usize {
        self.buffers.position.len() / 3
    }

    pub fn is_textured(&self) -> bool {
        self.texture.is_some() && self.buffers.tex_coord.is_some()
    }
}
