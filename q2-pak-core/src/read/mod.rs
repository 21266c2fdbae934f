use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;
use crate::pak::{PakArchive, PakEntry, PakHeader};
use crate::raw;

/// Read the header and directory of a pack.
///
/// Directory records are copied verbatim: offsets and lengths are only checked
/// against the backing store when an entry is read.
pub fn read_archive<R>(reader: &mut R) -> Result<PakArchive>
where
    R: Read + Seek,
{
    // read header
    let raw_header = raw::PackHeader::from_reader(reader)?;
    let header = PakHeader::try_from(raw_header)?;

    // read entries
    reader.seek(SeekFrom::Start(header.dir_offset() as u64))?;
    let entries = read_entries(reader, header.total_files())?;

    Ok(PakArchive::new(header, entries))
}

fn read_entries<R>(reader: &mut R, total_files: u32) -> Result<Vec<PakEntry>>
where
    R: Read,
{
    let mut entries = Vec::with_capacity(total_files as usize);
    for _ in 0..total_files {
        let raw_entry = raw::PackDirEntry::from_reader(reader)?;
        entries.push(PakEntry::from(raw_entry));
    }

    Ok(entries)
}
