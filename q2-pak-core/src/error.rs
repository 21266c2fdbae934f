pub type Result<T> = std::result::Result<T, PakError>;

/// Coarse classification of a [`PakError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidFormat,
    CorruptDirectory,
    CorruptImage,
    Unsupported,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum PakError {
    #[error("Upstream IO Error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid pack file magic: expected {expected:X?}, found {found:X?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Corrupt directory: {0}")]
    CorruptDirectory(String),
    #[error("Corrupt image: {0}")]
    CorruptImage(String),
    #[error("Invalid entry range: offset={offset}, size={size}, file_size={file_size}")]
    InvalidEntryRange { offset: u64, size: u64, file_size: u64 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: Box<PakError>,
    },

    #[error("Failed to build rayon thread pool: {0}")]
    ThreadPoolBuild(String),
}

impl PakError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PakError::IO(_) | PakError::ThreadPoolBuild(_) => ErrorKind::Io,
            PakError::NotFound(_) => ErrorKind::NotFound,
            PakError::InvalidMagic { .. } | PakError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            PakError::CorruptDirectory(_) => ErrorKind::CorruptDirectory,
            PakError::CorruptImage(_) | PakError::InvalidEntryRange { .. } => ErrorKind::CorruptImage,
            PakError::UnsupportedFormat(_) => ErrorKind::Unsupported,
            PakError::Entry { source, .. } => source.kind(),
        }
    }

    /// Attach the virtual name of the entry being processed.
    pub fn with_entry(self, name: &str) -> Self {
        match self {
            PakError::Entry { .. } => self,
            other => PakError::Entry {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl From<image::ImageError> for PakError {
    fn from(value: image::ImageError) -> Self {
        match value {
            image::ImageError::IoError(e) => PakError::IO(e),
            other => PakError::IO(std::io::Error::other(other)),
        }
    }
}
