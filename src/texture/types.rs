//! Texture data types.

/// Pixel format of a [`CpuTexture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA, four bytes per pixel.
    #[default]
    Rgba8,
    /// 8-bit BGRA, four bytes per pixel.
    Bgra8,
    /// Single 8-bit channel.
    R8,
    /// 16-bit float RGBA, eight bytes per pixel.
    Rgba16F,
}

impl TextureFormat {
    /// Bytes per pixel.
    pub fn pixel_size(&self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::R8 => 1,
            Self::Rgba16F => 8,
        }
    }
}

/// A CPU-side texture holding raw pixel data.
///
/// Rows are tightly packed, `width * pixel_size` bytes each, top-down.
#[derive(Debug, Clone)]
pub struct CpuTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
    srgb: bool,
    data: Vec<u8>,
}

impl CpuTexture {
    /// Create a zero-filled texture.
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        let len = width as usize * height as usize * format.pixel_size();
        Self {
            width,
            height,
            format,
            srgb: true,
            data: vec![0; len],
        }
    }

    /// Create a texture from existing pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not match `width * height * pixel_size` bytes.
    pub fn from_pixels(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * format.pixel_size(),
            "pixel data length does not match texture dimensions"
        );
        Self {
            width,
            height,
            format,
            srgb: true,
            data,
        }
    }

    /// Mark the texture as sRGB-encoded or linear.
    #[must_use]
    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }

    /// Texture width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Texture height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Whether the pixel data is sRGB-encoded.
    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw pixel bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Byte offset of the pixel at (x, y).
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.format.pixel_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_texture_is_zero_filled() {
        let tex = CpuTexture::new(4, 2, TextureFormat::Rgba8);
        assert_eq!(tex.data().len(), 32);
        assert!(tex.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn pixel_offset_respects_stride() {
        let tex = CpuTexture::new(8, 8, TextureFormat::Rgba8);
        assert_eq!(tex.pixel_offset(0, 0), 0);
        assert_eq!(tex.pixel_offset(2, 1), (8 + 2) * 4);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn mismatched_pixel_data_panics() {
        CpuTexture::from_pixels(2, 2, TextureFormat::Rgba8, vec![0; 3]);
    }
}
