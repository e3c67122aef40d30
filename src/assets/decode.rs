//! Binary view decoding: turns an accessor/bufferView pair into a typed,
//! bounds-checked window over a raw glTF buffer.

use super::manifest::{Accessor, BufferView};
use super::AssetError;

/// glTF `componentType` codes this decoder accepts. `5124` (signed 32-bit)
/// is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Result<Self, AssetError> {
        match code {
            5120 => Ok(Self::I8),
            5121 => Ok(Self::U8),
            5122 => Ok(Self::I16),
            5123 => Ok(Self::U16),
            5125 => Ok(Self::U32),
            5126 => Ok(Self::F32),
            other => Err(AssetError::UnsupportedComponentType {
                component_type: other,
            }),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::I8 => 5120,
            Self::U8 => 5121,
            Self::I16 => 5122,
            Self::U16 => 5123,
            Self::U32 => 5125,
            Self::F32 => 5126,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
}

impl ElementType {
    pub fn from_name(name: &str) -> Result<Self, AssetError> {
        match name {
            "SCALAR" => Ok(Self::Scalar),
            "VEC2" => Ok(Self::Vec2),
            "VEC3" => Ok(Self::Vec3),
            other => Err(AssetError::UnsupportedAccessorType {
                accessor_type: other.to_string(),
            }),
        }
    }

    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
        }
    }
}

/// A typed window into a raw buffer. Borrows the buffer, so it cannot
/// outlive it; two views may overlap (interleaved vertex data).
#[derive(Debug, Clone, Copy)]
pub struct TypedView<'a> {
    bytes: &'a [u8],
    component_type: ComponentType,
    element_type: ElementType,
    count: usize,
    stride: usize,
}

/// Decodes the view an accessor declares over `raw`.
pub fn decode<'a>(
    raw: &'a [u8],
    view: &BufferView,
    accessor: &Accessor,
) -> Result<TypedView<'a>, AssetError> {
    let component_type = ComponentType::from_code(accessor.component_type)?;
    let element_type = ElementType::from_name(&accessor.element_type)?;

    let element_size = component_type.size() * element_type.components();
    let stride = view.byte_stride.unwrap_or(element_size).max(element_size);
    let offset = view.byte_offset.checked_add(accessor.byte_offset);
    let span = match accessor.count {
        0 => Some(0),
        count => (count - 1)
            .checked_mul(stride)
            .and_then(|value| value.checked_add(element_size)),
    };
    let out_of_bounds = || AssetError::AccessorOutOfBounds {
        offset: offset.unwrap_or(usize::MAX),
        length: span.unwrap_or(usize::MAX),
        available: raw.len(),
    };
    let (offset, span) = offset.zip(span).ok_or_else(out_of_bounds)?;
    let end = offset.checked_add(span).ok_or_else(out_of_bounds)?;
    if end > raw.len() {
        return Err(out_of_bounds());
    }
    if let Some(view_length) = view.byte_length {
        let view_end = accessor.byte_offset.checked_add(span);
        if view_end.map_or(true, |view_end| view_end > view_length) {
            return Err(out_of_bounds());
        }
    }

    Ok(TypedView {
        bytes: &raw[offset..end],
        component_type,
        element_type,
        count: accessor.count,
        stride,
    })
}

impl<'a> TypedView<'a> {
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Number of elements (vertices, indices) in the view.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of scalar components, `count × components per element`.
    pub fn len(&self) -> usize {
        self.count * self.element_type.components()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn component_bytes(&self, index: usize) -> &'a [u8] {
        let components = self.element_type.components();
        let size = self.component_type.size();
        let start = (index / components) * self.stride + (index % components) * size;
        &self.bytes[start..start + size]
    }

    /// Component `index` converted to `f32` without normalization.
    pub fn get_f32(&self, index: usize) -> f32 {
        let b = self.component_bytes(index);
        match self.component_type {
            ComponentType::I8 => i8::from_le_bytes([b[0]]) as f32,
            ComponentType::U8 => b[0] as f32,
            ComponentType::I16 => i16::from_le_bytes([b[0], b[1]]) as f32,
            ComponentType::U16 => u16::from_le_bytes([b[0], b[1]]) as f32,
            ComponentType::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
            ComponentType::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }

    /// Component `index` as an unsigned integer; `None` for signed or float views.
    pub fn get_u32(&self, index: usize) -> Option<u32> {
        let b = self.component_bytes(index);
        match self.component_type {
            ComponentType::U8 => Some(b[0] as u32),
            ComponentType::U16 => Some(u16::from_le_bytes([b[0], b[1]]) as u32),
            ComponentType::U32 => Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            _ => None,
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..self.len()).map(|index| self.get_f32(index)).collect()
    }

    /// Applies glTF normalized-integer rules (`c / MAX`, clamped to -1 for signed types).
    pub fn to_normalized_f32_vec(&self) -> Vec<f32> {
        let scale = match self.component_type {
            ComponentType::I8 => i8::MAX as f32,
            ComponentType::U8 => u8::MAX as f32,
            ComponentType::I16 => i16::MAX as f32,
            ComponentType::U16 => u16::MAX as f32,
            ComponentType::U32 | ComponentType::F32 => return self.to_f32_vec(),
        };
        (0..self.len())
            .map(|index| (self.get_f32(index) / scale).max(-1.0))
            .collect()
    }

    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        (0..self.len()).map(|index| self.get_u32(index)).collect()
    }
}
