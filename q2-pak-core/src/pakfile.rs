use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};
use parking_lot::Mutex;

use crate::error::{PakError, Result};
use crate::pak::{PakArchive, PakEntry};
use crate::read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PakBackend {
    /// Use `memmap2` memory mapping.
    #[default]
    Mmap,
    /// Use regular file IO.
    File,
}

#[derive(Debug, Default)]
pub struct PakFileBuilder {
    backend: PakBackend,
}

impl PakFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: PakBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mmap(mut self, enabled: bool) -> Self {
        self.backend = if enabled { PakBackend::Mmap } else { PakBackend::File };
        self
    }

    pub fn open(self, path: impl AsRef<Path>) -> Result<PakFile> {
        PakFile::open_with_backend(path, self.backend)
    }
}

/// An opened pack: its directory plus the backing store entries are read from.
///
/// The store stays open for as long as the handle lives; catalog entries share
/// it through an `Arc`.
pub struct PakFile {
    path: PathBuf,
    archive: PakArchive,
    backend: PakBackend,
    inner: PakFileInner,
}

enum PakFileInner {
    Mmap { mmap: Arc<Mmap> },
    File { file: Mutex<File>, len: u64 },
}

impl PakFile {
    pub fn builder() -> PakFileBuilder {
        PakFileBuilder::new()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_backend(path, PakBackend::default())
    }

    pub fn open_with_backend(path: impl AsRef<Path>, backend: PakBackend) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PakError::IO(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))?;
        let mut reader = BufReader::new(file);
        let archive = read::read_archive(&mut reader).map_err(|e| e.with_entry(&path.display().to_string()))?;

        let file = reader.into_inner();

        let inner = match backend {
            PakBackend::Mmap => {
                // SAFETY: read-only mapping; the file is held for the lifetime of the mmap.
                let mmap = unsafe { MmapOptions::new().map(&file)? };
                PakFileInner::Mmap { mmap: Arc::new(mmap) }
            }
            PakBackend::File => {
                let len = file.metadata()?.len();
                PakFileInner::File {
                    file: Mutex::new(file),
                    len,
                }
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            backend,
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive(&self) -> &PakArchive {
        &self.archive
    }

    pub fn backend(&self) -> PakBackend {
        self.backend
    }

    /// Size of the backing store in bytes.
    pub fn len(&self) -> u64 {
        match &self.inner {
            PakFileInner::Mmap { mmap } => mmap.len() as u64,
            PakFileInner::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_range(&self, offset: u64, size: u64) -> Result<u64> {
        let file_size = self.len();
        match offset.checked_add(size) {
            Some(end) if end <= file_size => Ok(end),
            _ => Err(PakError::InvalidEntryRange {
                offset,
                size,
                file_size,
            }),
        }
    }

    /// Open a reader over `size` bytes starting at `offset` of the backing store.
    pub fn open_range(&self, offset: u64, size: u64) -> Result<Box<dyn BufRead + Send>> {
        let end = self.check_range(offset, size)?;
        match &self.inner {
            PakFileInner::Mmap { mmap } => Ok(Box::new(MmapRangeReader::new(
                Arc::clone(mmap),
                offset as usize,
                end as usize,
            ))),
            PakFileInner::File { .. } => Ok(Box::new(Cursor::new(self.read_range(offset, size)?))),
        }
    }

    /// Read `size` bytes starting at `offset` of the backing store.
    pub fn read_range(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let end = self.check_range(offset, size)?;
        match &self.inner {
            PakFileInner::Mmap { mmap } => Ok(mmap[offset as usize..end as usize].to_vec()),
            PakFileInner::File { file, .. } => {
                let mut data = vec![0; size as usize];
                let mut f = file.lock();
                f.seek(SeekFrom::Start(offset))?;
                crate::raw::read_exact_or(&mut *f, &mut data, || PakError::InvalidEntryRange {
                    offset,
                    size,
                    file_size: self.len(),
                })?;
                Ok(data)
            }
        }
    }

    pub fn open_entry(&self, entry: &PakEntry) -> Result<Box<dyn BufRead + Send>> {
        self.open_range(entry.offset(), entry.size())
    }

    pub fn read_entry(&self, entry: &PakEntry) -> Result<Vec<u8>> {
        self.read_range(entry.offset(), entry.size())
    }
}

impl std::fmt::Debug for PakFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakFile")
            .field("path", &self.path)
            .field("backend", &self.backend)
            .field("files", &self.archive.entries().len())
            .finish()
    }
}

struct MmapRangeReader {
    mmap: Arc<Mmap>,
    end: usize,
    pos: usize,
}

impl MmapRangeReader {
    fn new(mmap: Arc<Mmap>, start: usize, end: usize) -> Self {
        Self { mmap, end, pos: start }
    }
}

impl Read for MmapRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.end.saturating_sub(self.pos);
        if remaining == 0 {
            return Ok(0);
        }
        let to_read = remaining.min(buf.len());
        let src = &self.mmap[self.pos..self.pos + to_read];
        buf[..to_read].copy_from_slice(src);
        self.pos += to_read;
        Ok(to_read)
    }
}

impl BufRead for MmapRangeReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        Ok(&self.mmap[self.pos..self.end])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.end);
    }
}
