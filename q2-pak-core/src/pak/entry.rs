use serde::{Deserialize, Serialize};

use crate::raw;

/// One file stored inside a pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PakEntry {
    pub(crate) name: String,
    pub(crate) offset: u64,
    pub(crate) size: u64,
}

impl PakEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl From<raw::PackDirEntry> for PakEntry {
    fn from(value: raw::PackDirEntry) -> Self {
        Self {
            name: value.name(),
            offset: value.file_pos.get() as u64,
            size: value.file_len.get() as u64,
        }
    }
}
