//! The 256-entry index -> truecolor table shared by every decoder.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::catalog::Catalog;
use crate::error::{PakError, Result};
use crate::pcx::PcxHeader;

/// Virtual path of the image whose trailing block defines the game palette.
pub const COLORMAP_NAME: &str = "pics/colormap.pcx";
/// Size of the trailing RGB block of a PCX image.
pub const PALETTE_SIZE: usize = 768;
/// Index reserved for transparency; also the visited marker of the skin fill.
pub const TRANSPARENT_INDEX: u8 = 255;

/// Fully opaque black.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// Pack a color so that `to_le_bytes()` yields `[r, g, b, a]`.
#[inline]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [u32; 256],
    raw: [u8; PALETTE_SIZE],
}

impl Palette {
    /// Build the table from 256 packed RGB triples. Every color is opaque
    /// except [`TRANSPARENT_INDEX`].
    pub fn from_rgb(raw: &[u8; PALETTE_SIZE]) -> Self {
        let mut colors = [0u32; 256];
        for (color, rgb) in colors.iter_mut().zip(raw.chunks_exact(3)) {
            *color = pack_rgba(rgb[0], rgb[1], rgb[2], 255);
        }
        colors[TRANSPARENT_INDEX as usize] &= 0x00FF_FFFF;

        Self { colors, raw: *raw }
    }

    /// Locate `name` in the catalog and read the palette appended to it.
    pub fn load(catalog: &Catalog, name: &str) -> Result<Self> {
        let entry = catalog.get(name)?;
        let data = entry.read_bytes()?;

        let header = PcxHeader::parse(&data)?;
        header.check_signature()?;

        if data.len() < PcxHeader::SIZE + PALETTE_SIZE {
            return Err(PakError::CorruptImage(format!(
                "{} bytes is too short to carry a palette",
                data.len()
            )));
        }
        let mut raw = [0u8; PALETTE_SIZE];
        raw.copy_from_slice(&data[data.len() - PALETTE_SIZE..]);

        Ok(Self::from_rgb(&raw))
    }

    #[inline]
    pub fn color(&self, index: u8) -> u32 {
        self.colors[index as usize]
    }

    pub fn colors(&self) -> &[u32; 256] {
        &self.colors
    }

    /// The palette block exactly as read.
    pub fn raw(&self) -> &[u8; PALETTE_SIZE] {
        &self.raw
    }

    /// First index holding opaque black, 0 if there is none.
    pub fn opaque_black_index(&self) -> u8 {
        self.colors
            .iter()
            .position(|&c| c == OPAQUE_BLACK)
            .map_or(0, |i| i as u8)
    }

    pub fn map_indexed(&self, pixels: &[u8]) -> Vec<u32> {
        pixels.iter().map(|&p| self.colors[p as usize]).collect()
    }

    /// Write the raw 768-byte block to `path`.
    pub fn write_raw(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let write = || -> Result<()> {
            let mut file = File::create(path)?;
            file.write_all(&self.raw)?;
            file.flush()?;
            Ok(())
        };
        write().map_err(|e| e.with_entry(&path.display().to_string()))
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("opaque_black_index", &self.opaque_black_index())
            .finish_non_exhaustive()
    }
}
