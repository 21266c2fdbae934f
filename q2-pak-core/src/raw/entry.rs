use std::io::Read;

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{PakError, Result};

pub const PACK_NAME_LEN: usize = 56;

/// One directory record of a pack file.
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct PackDirEntry {
    pub name: [u8; PACK_NAME_LEN],
    pub file_pos: U32,
    pub file_len: U32,
}

static_assertions::assert_eq_size!(PackDirEntry, [u8; 64]);

impl PackDirEntry {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_reader<R>(reader: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = [0u8; Self::SIZE];
        super::read_exact_or(reader, &mut buf, || {
            PakError::CorruptDirectory("directory ends before its last record".to_string())
        })?;
        Self::read_from_bytes(&buf).map_err(|_| PakError::CorruptDirectory("malformed directory record".to_string()))
    }

    pub fn name(&self) -> String {
        super::padded_str(&self.name)
    }
}
