//! Writing extracted entries to the output tree.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::codecs::png::PngEncoder;

use crate::catalog::CatalogEntry;
use crate::error::{PakError, Result};

/// Map a virtual path onto `out_root`, lowercased, optionally swapping its extension.
///
/// Empty, `.` and `..` segments are dropped so a crafted name cannot leave `out_root`.
pub fn output_path(out_root: &Path, name: &str, extension: Option<&str>) -> PathBuf {
    let mut path = out_root.to_path_buf();
    for segment in name.split(['/', '\\']) {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path.push(segment.to_lowercase());
    }
    if let Some(extension) = extension {
        path.set_extension(extension);
    }
    path
}

/// Create the parent directories of `path` and open it for writing.
pub fn create_output(path: &Path, overwrite: bool) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut open_options = OpenOptions::new();
    if overwrite {
        open_options.create(true).write(true).truncate(true);
    } else {
        open_options.create_new(true).write(true);
    }
    open_options
        .open(path)
        .map_err(|e| PakError::IO(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
}

/// Encode packed RGBA colors as a PNG file.
pub fn write_png(path: &Path, width: usize, height: usize, colors: &[u32], overwrite: bool) -> Result<()> {
    let rgba: Vec<u8> = colors.iter().flat_map(|c| c.to_le_bytes()).collect();
    let img = u32::try_from(width)
        .ok()
        .zip(u32::try_from(height).ok())
        .and_then(|(w, h)| RgbaImage::from_raw(w, h, rgba))
        .ok_or_else(|| PakError::CorruptImage(format!("{width}x{height} buffer holds {} pixels", colors.len())))?;

    let mut writer = BufWriter::new(create_output(path, overwrite)?);
    img.write_with_encoder(PngEncoder::new(&mut writer))?;
    writer.flush()?;
    Ok(())
}

/// Byte-for-byte copy of an entry.
pub fn copy_entry(entry: &CatalogEntry, path: &Path, overwrite: bool) -> Result<u64> {
    let mut reader = entry.open()?;
    let mut file = create_output(path, overwrite)?;
    let written = std::io::copy(&mut reader, &mut file)?;
    file.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let root = Path::new("/out");
        assert_eq!(
            output_path(root, "Models/Monsters/Tank/SKIN.PCX", Some("png")),
            Path::new("/out/models/monsters/tank/skin.png")
        );
        assert_eq!(output_path(root, "sound/misc/h2ohit1.wav", None), Path::new("/out/sound/misc/h2ohit1.wav"));
        assert_eq!(output_path(root, "../../etc/passwd", None), Path::new("/out/etc/passwd"));
        assert_eq!(output_path(root, "/textures//e1u1/./floor.wal", Some("png")), Path::new("/out/textures/e1u1/floor.png"));
    }

    #[test]
    fn test_write_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/test.png");
        let colors = [0xFF00_00FFu32, 0xFF00_FF00, 0x00FF_0000, 0xFFFF_FFFF];
        write_png(&path, 2, 2, &colors, false).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0xFF, 0, 0, 0xFF]);
        assert_eq!(img.get_pixel(1, 1).0, [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(img.get_pixel(0, 1).0[3], 0);

        // existing files are kept unless overwriting
        assert!(write_png(&path, 2, 2, &colors, false).is_err());
        assert!(write_png(&path, 2, 2, &colors, true).is_ok());
    }

    #[test]
    fn test_write_png_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_png(&dir.path().join("x.png"), 3, 3, &[0; 4], true).is_err());
    }
}
