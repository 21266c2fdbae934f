use crate::error::{PakError, Result};
use crate::palette::Palette;

/// A decoded palette-indexed image, one byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IndexedImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(PakError::CorruptImage(format!(
                "{width}x{height} image with {} pixels",
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Erase the flat background of a skin, see [`crate::floodfill`].
    pub fn fill_background(&mut self, palette: &Palette) {
        crate::floodfill::flood_fill_skin(&mut self.pixels, self.width, self.height, palette);
    }

    pub fn to_truecolor(&self, palette: &Palette) -> Vec<u32> {
        palette.map_indexed(&self.pixels)
    }
}
