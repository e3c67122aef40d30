//! Procedural shapes that share the [`Drawable`] contract with loaded assets.

use std::f32::consts::PI;

use super::drawable::{Drawable, IndexData, VertexBuffers};
use super::resolver::FileResolver;
use super::texture::TextureImage;

pub const DEFAULT_SPHERE_BANDS: u32 = 30;
/// Upper clamp for either band count of [`sphere`].
pub const MAX_SPHERE_BANDS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Cube,
    Sphere { latitude_bands: u32, longitude_bands: u32 },
}

impl ShapeKind {
    pub fn sphere() -> Self {
        Self::Sphere {
            latitude_bands: DEFAULT_SPHERE_BANDS,
            longitude_bands: DEFAULT_SPHERE_BANDS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere { .. } => "sphere",
        }
    }

    pub fn generate(self) -> Drawable {
        match self {
            Self::Cube => cube(),
            Self::Sphere {
                latitude_bands,
                longitude_bands,
            } => sphere(latitude_bands, longitude_bands),
        }
    }
}

// (normal, tangent u, tangent v) per face; corners are n ± u ± v.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
];

/// Unit cube spanning -1..1 on every axis, four vertices per face.
pub fn cube() -> Drawable {
    let mut position = Vec::with_capacity(24 * 3);
    let mut normal = Vec::with_capacity(24 * 3);
    let mut tex_coord = Vec::with_capacity(24 * 2);
    let mut indices: Vec<u16> = Vec::with_capacity(36);

    for (face, (n, u, v)) in CUBE_FACES.iter().enumerate() {
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            for axis in 0..3 {
                position.push(n[axis] + su * u[axis] + sv * v[axis]);
            }
            normal.extend_from_slice(n);
            tex_coord.extend_from_slice(&[(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
        }
        let base = (face * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Drawable::new(
        "cube".to_string(),
        VertexBuffers {
            position,
            normal,
            tex_coord: Some(tex_coord),
            indices: IndexData::U16(indices),
        },
        None,
    )
}

/// UV sphere of radius 1. Pole vertices are duplicated per longitude band.
/// Band counts are clamped to `2..=MAX_SPHERE_BANDS` and `3..=MAX_SPHERE_BANDS`.
pub fn sphere(latitude_bands: u32, longitude_bands: u32) -> Drawable {
    let latitude_bands = latitude_bands.clamp(2, MAX_SPHERE_BANDS);
    let longitude_bands = longitude_bands.clamp(3, MAX_SPHERE_BANDS);
    let vertex_total = (latitude_bands as usize + 1) * (longitude_bands as usize + 1);

    let mut position = Vec::with_capacity(vertex_total * 3);
    let mut normal = Vec::with_capacity(vertex_total * 3);
    let mut tex_coord = Vec::with_capacity(vertex_total * 2);
    for lat in 0..=latitude_bands {
        let theta = lat as f32 * PI / latitude_bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for lon in 0..=longitude_bands {
            let phi = lon as f32 * 2.0 * PI / longitude_bands as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let p = [cos_phi * sin_theta, cos_theta, sin_phi * sin_theta];
            position.extend_from_slice(&p);
            normal.extend_from_slice(&p);
            tex_coord.extend_from_slice(&[
                1.0 - lon as f32 / longitude_bands as f32,
                1.0 - lat as f32 / latitude_bands as f32,
            ]);
        }
    }

    let mut indices: Vec<u32> = Vec::with_capacity(latitude_bands as usize * longitude_bands as usize * 6);
    for lat in 0..latitude_bands {
        for lon in 0..longitude_bands {
            let first = lat * (longitude_bands + 1) + lon;
            let second = first + longitude_bands + 1;
            indices.extend_from_slice(&[first, second, first + 1, second, second + 1, first + 1]);
        }
    }
    let indices = if vertex_total <= usize::from(u16::MAX) + 1 {
        IndexData::U16(indices.into_iter().map(|index| index as u16).collect())
    } else {
        IndexData::U32(indices)
    };

    Drawable::new(
        "sphere".to_string(),
        VertexBuffers {
            position,
            normal,
            tex_coord: Some(tex_coord),
            indices,
        },
        None,
    )
}

/// Generates `kind` and, if asked, textures it with the image at `path`.
/// A texture that cannot be resolved or decoded leaves the shape untextured.
pub fn load_shape(kind: ShapeKind, texture: Option<(&dyn FileResolver, &str)>) -> Drawable {
    let mut drawable = kind.generate();
    let Some((resolver, path)) = texture else {
        return drawable;
    };
    match resolver
        .resolve(path)
        .and_then(|bytes| TextureImage::decode(&bytes, path))
    {
        Ok(image) => drawable.texture = Some(image),
        Err(err) => {
            log::warn!(
                "Texture {} unavailable for {}, using untextured variant: {}",
                path,
                kind.name(),
                err
            );
        }
    }
    drawable
}
