//! 8-bit run-length encoded PCX images.

use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::catalog::CatalogEntry;
use crate::error::{PakError, Result};
use crate::indexed::IndexedImage;
use crate::palette::Palette;

/// Images whose declared extent reaches this value on either axis are rejected.
pub const PCX_MAX_DIMENSION: i32 = 4096;

/// A byte with both top bits set starts a run.
const RUN_MARKER: u8 = 0xC0;
const RUN_LENGTH_MASK: u8 = 0x3F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcxHeader {
    pub manufacturer: u8,
    pub version: u8,
    pub encoding: u8,
    pub bits_per_pixel: u8,
    pub xmin: u16,
    pub ymin: u16,
    pub xmax: u16,
    pub ymax: u16,
    pub hres: u16,
    pub vres: u16,
    pub color_planes: u8,
    pub bytes_per_line: u16,
    pub palette_type: u16,
}

impl PcxHeader {
    pub const SIZE: usize = 128;

    pub fn parse(data: &[u8]) -> Result<Self> {
        let head = data.get(..Self::SIZE).ok_or_else(|| {
            PakError::CorruptImage(format!("pcx header needs {} bytes, have {}", Self::SIZE, data.len()))
        })?;
        let mut r = Cursor::new(head);

        let manufacturer = r.read_u8()?;
        let version = r.read_u8()?;
        let encoding = r.read_u8()?;
        let bits_per_pixel = r.read_u8()?;
        let xmin = r.read_u16::<LittleEndian>()?;
        let ymin = r.read_u16::<LittleEndian>()?;
        let xmax = r.read_u16::<LittleEndian>()?;
        let ymax = r.read_u16::<LittleEndian>()?;
        let hres = r.read_u16::<LittleEndian>()?;
        let vres = r.read_u16::<LittleEndian>()?;
        // 48-byte EGA palette and a reserved byte
        r.seek(SeekFrom::Current(49))?;
        let color_planes = r.read_u8()?;
        let bytes_per_line = r.read_u16::<LittleEndian>()?;
        let palette_type = r.read_u16::<LittleEndian>()?;

        Ok(Self {
            manufacturer,
            version,
            encoding,
            bits_per_pixel,
            xmin,
            ymin,
            xmax,
            ymax,
            hres,
            vres,
            color_planes,
            bytes_per_line,
            palette_type,
        })
    }

    /// Only ZSoft version 5, RLE, 8 bits per pixel is accepted.
    pub fn check_signature(&self) -> Result<()> {
        if self.manufacturer != 0x0a || self.version != 5 || self.encoding != 1 || self.bits_per_pixel != 8 {
            return Err(PakError::InvalidFormat(format!(
                "bad pcx signature: manufacturer={:#04x} version={} encoding={} bits_per_pixel={}",
                self.manufacturer, self.version, self.encoding, self.bits_per_pixel
            )));
        }
        Ok(())
    }

    /// Decoded `(width, height)` in pixels. The bounding box is inclusive on both ends.
    pub fn dimensions(&self) -> Result<(usize, usize)> {
        let width = self.xmax as i32 - self.xmin as i32;
        let height = self.ymax as i32 - self.ymin as i32;
        if !(0..PCX_MAX_DIMENSION).contains(&width) || !(0..PCX_MAX_DIMENSION).contains(&height) {
            return Err(PakError::InvalidFormat(format!(
                "pcx extent {width}x{height} outside 0..{PCX_MAX_DIMENSION}"
            )));
        }
        Ok((width as usize + 1, height as usize + 1))
    }
}

/// Expand an RLE stream into `width * height` pixels.
///
/// Runs are clipped at the end of their row. Running out of input before the
/// last row is complete is an error.
pub fn decode_rle(src: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    let mut pixels = vec![0u8; width * height];
    if pixels.is_empty() {
        return Ok(pixels);
    }

    let mut src = src.iter().copied();
    let mut next = |row: usize| {
        src.next()
            .ok_or_else(|| PakError::CorruptImage(format!("pixel data ends in row {row} of {height}")))
    };

    for (y, row) in pixels.chunks_exact_mut(width).enumerate() {
        let mut x = 0;
        while x < width {
            let mut value = next(y)?;
            let mut run = 1;
            if value & RUN_MARKER == RUN_MARKER {
                run = (value & RUN_LENGTH_MASK) as usize;
                value = next(y)?;
            }

            let end = (x + run).min(width);
            row[x..end].fill(value);
            x += run;
        }
    }

    Ok(pixels)
}

/// Decode a complete PCX file held in memory.
pub fn decode_pcx(data: &[u8]) -> Result<IndexedImage> {
    let header = PcxHeader::parse(data)?;
    header.check_signature()?;
    let (width, height) = header.dimensions()?;

    let pixels = decode_rle(&data[PcxHeader::SIZE..], width, height)?;
    IndexedImage::new(width, height, pixels)
}

/// Read and decode a catalog entry. Skins get their background filled.
pub fn load_pcx(entry: &CatalogEntry, skin: bool, palette: &Palette) -> Result<IndexedImage> {
    let data = entry.read_bytes()?;
    let mut image = decode_pcx(&data)?;
    if skin {
        image.fill_background(palette);
    }
    Ok(image)
}
