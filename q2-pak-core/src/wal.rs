//! `.wal` mip textures. Only the full-resolution level is decoded.

use bitflags::bitflags;

use crate::catalog::CatalogEntry;
use crate::error::{PakError, Result};
use crate::indexed::IndexedImage;
use crate::raw::MipTexHeader;

bitflags! {
    /// Surface flags stored alongside the texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SurfaceFlags: u32 {
        const LIGHT = 0x1;
        const SLICK = 0x2;
        const SKY = 0x4;
        const WARP = 0x8;
        const TRANS33 = 0x10;
        const TRANS66 = 0x20;
        const FLOWING = 0x40;
        const NODRAW = 0x80;
    }
}

#[derive(Debug, Clone)]
pub struct MipTexture {
    pub name: String,
    pub anim_name: String,
    pub flags: SurfaceFlags,
    pub contents: u32,
    pub value: u32,
    pub image: IndexedImage,
}

/// Decode the base level of a mip texture held in memory.
pub fn decode_wal(data: &[u8]) -> Result<MipTexture> {
    let header = MipTexHeader::from_bytes(data)?;
    let width = header.width.get();
    let height = header.height.get();
    let offset = header.offsets[0].get();

    // enough bytes after the base offset for `height` rows of `width`
    let available = data.len() as i64 - offset as i64;
    if offset == 0 || width == 0 || height == 0 || available / (height as i64) < width as i64 {
        return Err(PakError::InvalidFormat(format!(
            "bad mip header: {width}x{height} at offset {offset} in {} bytes",
            data.len()
        )));
    }

    let (width, height, offset) = (width as usize, height as usize, offset as usize);
    let pixels = width
        .checked_mul(height)
        .and_then(|size| data.get(offset..offset.checked_add(size)?))
        .ok_or_else(|| PakError::CorruptImage(format!("mip level 0 of {width}x{height} is truncated")))?;

    Ok(MipTexture {
        name: header.name(),
        anim_name: header.anim_name(),
        flags: SurfaceFlags::from_bits_retain(header.flags.get()),
        contents: header.contents.get(),
        value: header.value.get(),
        image: IndexedImage::new(width, height, pixels.to_vec())?,
    })
}

pub fn load_wal(entry: &CatalogEntry) -> Result<MipTexture> {
    decode_wal(&entry.read_bytes()?)
}
