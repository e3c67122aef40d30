use super::AssetError;

/// Decoded image, tightly packed RGBA8 at its native size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decodes PNG/JPEG/... bytes; no resizing and no mip generation.
    pub fn decode(bytes: &[u8], path: &str) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|source| AssetError::TextureDecode {
            path: path.to_string(),
            source,
        })?;
        let rgba = image.into_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
