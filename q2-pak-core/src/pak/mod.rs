mod entry;
mod header;

use serde::Serialize;

pub use entry::*;
pub use header::*;

/// Pak Archive, stores the header and entries.
#[derive(Debug, Clone, Serialize)]
pub struct PakArchive {
    #[serde(skip)]
    header: PakHeader,
    entries: Vec<PakEntry>,
}

impl PakArchive {
    pub fn new(header: PakHeader, entries: Vec<PakEntry>) -> Self {
        PakArchive { header, entries }
    }

    pub fn header(&self) -> &PakHeader {
        &self.header
    }

    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }
}
