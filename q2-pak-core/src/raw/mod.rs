//! Fixed-layout records as they appear on disk. All integers are little-endian.

mod entry;
mod header;
mod miptex;

use std::io::{ErrorKind, Read};

pub use entry::*;
pub use header::*;
pub use miptex::*;

use crate::error::{PakError, Result};

/// Read exactly `buf.len()` bytes, mapping a premature end of input onto `truncated`.
pub(crate) fn read_exact_or<R, F>(reader: &mut R, buf: &mut [u8], truncated: F) -> Result<()>
where
    R: Read,
    F: FnOnce() -> PakError,
{
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => truncated(),
        _ => PakError::IO(e),
    })
}

/// Decode a NUL-padded name field.
pub(crate) fn padded_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
