use super::{BufferData, BufferKind, GraphicsBackend, RenderError};
use crate::assets::IndexElementWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub kind: BufferKind,
    pub byte_len: usize,
    pub elements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub index_count: usize,
    pub index_width: IndexElementWidth,
}

/// Backend without a GPU: records what would have been uploaded and drawn.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    extended_indices: bool,
    buffers: Vec<BufferRecord>,
    textures: Vec<(u32, u32)>,
    draws: Vec<DrawRecord>,
}

impl HeadlessBackend {
    pub fn new(extended_indices: bool) -> Self {
        Self {
            extended_indices,
            ..Self::default()
        }
    }

    pub fn buffers(&self) -> &[BufferRecord] {
        &self.buffers
    }

    pub fn textures(&self) -> &[(u32, u32)] {
        &self.textures
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn uploaded_bytes(&self) -> usize {
        let texture_bytes: usize = self
            .textures
            .iter()
            .map(|(width, height)| *width as usize * *height as usize * 4)
            .sum();
        self.buffers.iter().map(|record| record.byte_len).sum::<usize>() + texture_bytes
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Buffer = usize;
    type Texture = usize;

    fn supports_extended_indices(&self) -> bool {
        self.extended_indices
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        data: BufferData<'_>,
    ) -> Result<usize, RenderError> {
        let elements = match data {
            BufferData::F32(values) => values.len(),
            BufferData::U16(values) => values.len(),
            BufferData::U32(values) => values.len(),
        };
        self.buffers.push(BufferRecord {
            kind,
            byte_len: data.byte_len(),
            elements,
        });
        Ok(self.buffers.len() - 1)
    }

    fn create_texture(
        &mut self,
        _pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<usize, RenderError> {
        self.textures.push((width, height));
        Ok(self.textures.len() - 1)
    }

    fn draw_indexed(
        &mut self,
        index_count: usize,
        index_width: IndexElementWidth,
    ) -> Result<(), RenderError> {
        self.draws.push(DrawRecord {
            index_count,
            index_width,
        });
        Ok(())
    }
}
