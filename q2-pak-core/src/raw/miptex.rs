use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{PakError, Result};

pub const MIPLEVELS: usize = 4;

/// Header of a `.wal` mip texture.
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct MipTexHeader {
    pub name: [u8; 32],
    pub width: U32,
    pub height: U32,
    pub offsets: [U32; MIPLEVELS],
    pub anim_name: [u8; 32],
    pub flags: U32,
    pub contents: U32,
    pub value: U32,
}

static_assertions::assert_eq_size!(MipTexHeader, [u8; 100]);

impl MipTexHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let head = data
            .get(..Self::SIZE)
            .ok_or_else(|| PakError::CorruptImage(format!("mip header needs {} bytes, have {}", Self::SIZE, data.len())))?;
        Self::read_from_bytes(head).map_err(|_| PakError::CorruptImage("malformed mip header".to_string()))
    }

    pub fn name(&self) -> String {
        super::padded_str(&self.name)
    }

    pub fn anim_name(&self) -> String {
        super::padded_str(&self.anim_name)
    }
}
