//! Virtual file tree: pack contents and loose files merged into one name lookup.
//!
//! Pack entries always precede loose files, so when both provide the same name
//! the packed copy is the one found.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{PakError, Result};
use crate::pakfile::{PakBackend, PakFile};

const PAK_EXTENSION: &str = "pak";
const SHARED_LIBRARY_EXTENSIONS: [&str; 3] = ["dylib", "so", "dll"];

/// Where the bytes of a catalog entry live.
#[derive(Debug, Clone)]
pub enum EntrySource {
    Pak(Arc<PakFile>),
    Loose(PathBuf),
}

impl EntrySource {
    pub fn path(&self) -> &Path {
        match self {
            EntrySource::Pak(pak) => pak.path(),
            EntrySource::Loose(path) => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    name: String,
    source: EntrySource,
    offset: u64,
    length: u64,
}

impl CatalogEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &EntrySource {
        &self.source
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Read the whole entry. The byte range is validated against the backing store first.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            EntrySource::Pak(pak) => pak.read_range(self.offset, self.length),
            EntrySource::Loose(path) => {
                let (file, file_size) = self.open_loose(path)?;
                let mut data = Vec::with_capacity(self.length as usize);
                file.take(self.length).read_to_end(&mut data)?;
                if data.len() as u64 != self.length {
                    return Err(PakError::InvalidEntryRange {
                        offset: self.offset,
                        size: self.length,
                        file_size,
                    });
                }
                Ok(data)
            }
        }
    }

    /// Stream the entry, used for raw copies.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match &self.source {
            EntrySource::Pak(pak) => pak.open_range(self.offset, self.length),
            EntrySource::Loose(path) => {
                let (file, _) = self.open_loose(path)?;
                Ok(Box::new(BufReader::new(file.take(self.length))))
            }
        }
    }

    /// Open a loose file positioned at the entry start, after checking its current size.
    fn open_loose(&self, path: &Path) -> Result<(File, u64)> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if self.offset.checked_add(self.length).is_none_or(|end| end > file_size) {
            return Err(PakError::InvalidEntryRange {
                offset: self.offset,
                size: self.length,
                file_size,
            });
        }
        file.seek(SeekFrom::Start(self.offset))?;
        Ok((file, file_size))
    }

    pub fn info(&self) -> EntryInfo {
        let (kind, source) = match &self.source {
            EntrySource::Pak(pak) => ("pak", pak.path()),
            EntrySource::Loose(path) => ("loose", path.as_path()),
        };
        EntryInfo {
            name: self.name.clone(),
            kind,
            source: source.display().to_string(),
            offset: self.offset,
            length: self.length,
        }
    }
}

/// Serializable summary of a catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub kind: &'static str,
    pub source: String,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    /// Name -> position of its first occurrence in `entries`.
    index: IndexMap<String, usize>,
    packs: Vec<Arc<PakFile>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Scan `root` with the default pack backend.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        Self::builder().scan(root)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn packs(&self) -> &[Arc<PakFile>] {
        &self.packs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with exactly this name.
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get(&self, name: &str) -> Result<&CatalogEntry> {
        self.find(name).ok_or_else(|| PakError::NotFound(name.to_string()))
    }

    /// The entry each distinct name resolves to, in first-seen order.
    pub fn visible_entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.index.values().map(|&i| &self.entries[i])
    }

    fn from_parts(pak_entries: Vec<CatalogEntry>, loose_entries: Vec<CatalogEntry>, packs: Vec<Arc<PakFile>>) -> Self {
        let mut entries = pak_entries;
        entries.extend(loose_entries);

        let mut index = IndexMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index.entry(entry.name.clone()).or_insert(i);
        }

        Self { entries, index, packs }
    }
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    backend: PakBackend,
}

impl CatalogBuilder {
    pub fn backend(mut self, backend: PakBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Walk `root` depth-first and catalog every pack and loose file found.
    ///
    /// Failing to read a directory or to load a pack aborts the scan.
    pub fn scan(self, root: impl AsRef<Path>) -> Result<Catalog> {
        let root = root.as_ref();
        let mut pak_entries = Vec::new();
        let mut loose_entries = Vec::new();
        let mut packs = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                log::warn!("Skipping unknown file: {}", entry.path().display());
                continue;
            }

            let path = entry.path();
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();

            if extension == PAK_EXTENSION {
                let pak = Arc::new(PakFile::open_with_backend(path, self.backend)?);
                log::info!(
                    "Added packfile '{}' ({} files).",
                    path.display(),
                    pak.archive().entries().len()
                );
                pak_entries.extend(pak.archive().entries().iter().map(|e| CatalogEntry {
                    name: e.name().to_string(),
                    source: EntrySource::Pak(Arc::clone(&pak)),
                    offset: e.offset(),
                    length: e.size(),
                }));
                packs.push(pak);
            } else if SHARED_LIBRARY_EXTENSIONS.contains(&extension.as_str()) {
                log::debug!("Ignoring shared library {}", path.display());
            } else {
                let name = virtual_name(root, path);
                loose_entries.push(CatalogEntry {
                    name,
                    source: EntrySource::Loose(path.to_path_buf()),
                    offset: 0,
                    length: entry.metadata().map_err(std::io::Error::from)?.len(),
                });
            }
        }

        let catalog = Catalog::from_parts(pak_entries, loose_entries, packs);
        log::info!("Files: {}", catalog.len());
        Ok(catalog)
    }
}

/// Path of `path` relative to `root`, `/`-separated.
fn virtual_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
