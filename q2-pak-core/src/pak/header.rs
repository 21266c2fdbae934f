use crate::raw;

/// Pack file magic, `PACK` read as bytes.
pub const PACK_MAGIC: [u8; 4] = *b"PACK";
/// Upper bound on the number of directory records accepted from a header.
pub const MAX_FILES_IN_PACK: u32 = 4096;

#[derive(Clone, Default)]
pub struct PakHeader {
    magic: [u8; 4],
    dir_offset: u32,
    dir_length: u32,
}

impl PakHeader {
    pub fn entry_size(&self) -> u32 {
        raw::PackDirEntry::SIZE as u32
    }

    #[inline]
    pub fn magic(&self) -> [u8; 4] {
        self.magic
    }

    #[inline]
    pub fn dir_offset(&self) -> u32 {
        self.dir_offset
    }

    #[inline]
    pub fn dir_length(&self) -> u32 {
        self.dir_length
    }

    #[inline]
    pub fn total_files(&self) -> u32 {
        self.dir_length / self.entry_size()
    }
}

impl TryFrom<raw::PackHeader> for PakHeader {
    type Error = crate::error::PakError;

    fn try_from(this: raw::PackHeader) -> Result<Self, Self::Error> {
        if this.ident != PACK_MAGIC {
            return Err(Self::Error::InvalidMagic {
                expected: PACK_MAGIC,
                found: this.ident,
            });
        }

        let header = PakHeader {
            magic: this.ident,
            dir_offset: this.dir_offset.get(),
            dir_length: this.dir_length.get(),
        };
        let total_files = header.total_files();
        if total_files == 0 || total_files > MAX_FILES_IN_PACK {
            return Err(Self::Error::CorruptDirectory(format!(
                "directory holds {total_files} files, expected 1..={MAX_FILES_IN_PACK}"
            )));
        }

        Ok(header)
    }
}

impl std::fmt::Debug for PakHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakHeader")
            .field("magic", &format!("{:02x?}", self.magic))
            .field("dir_offset", &format!("{:08x}", self.dir_offset))
            .field("dir_length", &self.dir_length)
            .field("total_files", &self.total_files())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use zerocopy::byteorder::little_endian::U32;

    use super::*;
    use crate::error::ErrorKind;

    fn raw_header(ident: [u8; 4], dir_length: u32) -> raw::PackHeader {
        raw::PackHeader {
            ident,
            dir_offset: U32::new(12),
            dir_length: U32::new(dir_length),
        }
    }

    #[test]
    fn accepts_bounds() {
        let header = PakHeader::try_from(raw_header(PACK_MAGIC, 64)).unwrap();
        assert_eq!(header.total_files(), 1);

        let header = PakHeader::try_from(raw_header(PACK_MAGIC, 64 * MAX_FILES_IN_PACK)).unwrap();
        assert_eq!(header.total_files(), MAX_FILES_IN_PACK);

        // trailing partial record is ignored
        let header = PakHeader::try_from(raw_header(PACK_MAGIC, 64 * 3 + 10)).unwrap();
        assert_eq!(header.total_files(), 3);
    }

    #[test]
    fn rejects_wrong_magic() {
        for ident in [*b"KPKA", *b"pack", [0; 4], *b"PAC\0"] {
            let err = PakHeader::try_from(raw_header(ident, 64)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        }
    }

    #[test]
    fn rejects_bad_counts() {
        for dir_length in [0, 63, 64 * (MAX_FILES_IN_PACK + 1), u32::MAX] {
            let err = PakHeader::try_from(raw_header(PACK_MAGIC, dir_length)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CorruptDirectory, "dir_length {dir_length}");
        }
    }
}
