use std::io::Read;

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{PakError, Result};

#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct PackHeader {
    pub ident: [u8; 4],
    pub dir_offset: U32,
    pub dir_length: U32,
}

static_assertions::assert_eq_size!(PackHeader, [u8; 12]);

impl PackHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_reader<R>(reader: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = [0u8; Self::SIZE];
        super::read_exact_or(reader, &mut buf, || {
            PakError::CorruptDirectory("truncated pack header".to_string())
        })?;
        Self::read_from_bytes(&buf).map_err(|_| PakError::CorruptDirectory("malformed pack header".to_string()))
    }
}
