use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use rayon::prelude::*;

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{PakError, Result};
use crate::indexed::IndexedImage;
use crate::output::{copy_entry, output_path, write_png};
use crate::pakfile::PakBackend;
use crate::palette::{COLORMAP_NAME, Palette};
use crate::pcx::load_pcx;
use crate::wal::load_wal;

type EntryFilter = dyn Fn(&CatalogEntry) -> bool + Send + Sync;
type EventHandler = dyn Fn(ExtractEvent) + Send + Sync;

/// Directory of the palette side artifact, relative to the output root.
const PALETTE_DIR: &str = "pics";
const PALETTE_ARTIFACT: &str = "colormap.bin";
const SKIN_PREFIXES: [&str; 2] = ["models", "players"];

/// What happens to a single catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Copy,
    Pcx { skin: bool },
    Wal,
    /// Recognized image format without a decoder.
    Unsupported,
    Skip,
}

impl EntryAction {
    pub fn classify(name: &str, convert: bool) -> Self {
        if !convert {
            return EntryAction::Copy;
        }
        if name == COLORMAP_NAME {
            return EntryAction::Skip;
        }

        let extension = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pcx" => EntryAction::Pcx {
                skin: SKIN_PREFIXES.iter().any(|prefix| name.starts_with(prefix)),
            },
            "wal" => EntryAction::Wal,
            "tga" => EntryAction::Unsupported,
            _ => EntryAction::Copy,
        }
    }

    /// Decode an image entry to palette indices.
    pub fn decode(self, entry: &CatalogEntry, palette: &Palette) -> Result<IndexedImage> {
        match self {
            EntryAction::Pcx { skin } => load_pcx(entry, skin, palette),
            EntryAction::Wal => Ok(load_wal(entry)?.image),
            EntryAction::Unsupported | EntryAction::Copy | EntryAction::Skip => Err(PakError::UnsupportedFormat(
                format!("no image decoder for {}", entry.name()),
            )),
        }
    }

    fn converts(self) -> bool {
        matches!(self, EntryAction::Pcx { .. } | EntryAction::Wal)
    }
}

#[derive(Debug, Clone)]
pub enum ExtractEvent {
    Start { total: usize },
    FileStart { name: String },
    FileDone { name: String, path: PathBuf },
    Finish { converted: usize, copied: usize, skipped: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub converted: usize,
    pub copied: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    #[default]
    Parallel,
    Sequential,
}

/// Converts or copies every visible entry of a catalog into `output_dir`.
pub struct CatalogExtractBuilder<'a> {
    catalog: &'a Catalog,
    output_dir: PathBuf,
    convert: bool,
    mode: ExtractMode,
    threads: Option<usize>,
    overwrite: bool,
    filter: Option<Arc<EntryFilter>>,
    on_event: Option<Arc<EventHandler>>,
}

impl<'a> CatalogExtractBuilder<'a> {
    pub fn new(catalog: &'a Catalog, output_dir: impl AsRef<Path>) -> Self {
        Self {
            catalog,
            output_dir: output_dir.as_ref().to_path_buf(),
            convert: true,
            mode: ExtractMode::default(),
            threads: None,
            overwrite: false,
            filter: None,
            on_event: None,
        }
    }

    /// Decode images to PNG. When disabled every entry is copied as is.
    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.mode = if enabled {
            ExtractMode::Parallel
        } else {
            ExtractMode::Sequential
        };
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&CatalogEntry) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn on_event<F>(mut self, on_event: F) -> Self
    where
        F: Fn(ExtractEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Process all entries. The first failing entry aborts the run.
    pub fn run(self) -> Result<ExtractReport> {
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir)?;
        }

        let palette = if self.convert {
            let palette = Palette::load(self.catalog, COLORMAP_NAME).map_err(|e| e.with_entry(COLORMAP_NAME))?;
            let palette_dir = self.output_dir.join(PALETTE_DIR);
            std::fs::create_dir_all(&palette_dir)?;
            palette.write_raw(palette_dir.join(PALETTE_ARTIFACT))?;
            Some(palette)
        } else {
            None
        };

        let mut tasks: Vec<(&CatalogEntry, EntryAction)> = Vec::new();
        let mut skipped = 0usize;
        for entry in self.catalog.visible_entries() {
            if let Some(filter) = &self.filter
                && !filter(entry)
            {
                skipped += 1;
                continue;
            }

            match EntryAction::classify(entry.name(), self.convert) {
                EntryAction::Skip => skipped += 1,
                EntryAction::Unsupported => {
                    log::info!("TGA {} not supported, skipping", entry.name());
                    skipped += 1;
                }
                action => tasks.push((entry, action)),
            }
        }

        self.emit(ExtractEvent::Start { total: tasks.len() });

        let converted = AtomicCount::new();
        let copied = AtomicCount::new();

        let process = |&(entry, action): &(&CatalogEntry, EntryAction)| -> Result<()> {
            self.emit(ExtractEvent::FileStart {
                name: entry.name().to_string(),
            });
            let path = self
                .extract_one(entry, action, palette.as_ref())
                .map_err(|e| e.with_entry(entry.name()))?;
            if action.converts() {
                converted.inc();
            } else {
                copied.inc();
            }
            self.emit(ExtractEvent::FileDone {
                name: entry.name().to_string(),
                path,
            });
            Ok(())
        };

        let work = || -> Result<()> {
            match self.mode {
                ExtractMode::Sequential => tasks.iter().try_for_each(&process),
                ExtractMode::Parallel => tasks.par_iter().try_for_each(&process),
            }
        };

        match (self.mode, self.threads) {
            (ExtractMode::Parallel, Some(n)) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| PakError::ThreadPoolBuild(e.to_string()))?;
                pool.install(work)?;
            }
            _ => work()?,
        }

        let report = ExtractReport {
            converted: converted.get(),
            copied: copied.get(),
            skipped,
        };
        self.emit(ExtractEvent::Finish {
            converted: report.converted,
            copied: report.copied,
            skipped: report.skipped,
        });

        Ok(report)
    }

    fn emit(&self, event: ExtractEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    fn extract_one(&self, entry: &CatalogEntry, action: EntryAction, palette: Option<&Palette>) -> Result<PathBuf> {
        let name = entry.name();
        match (action, palette) {
            (EntryAction::Copy, _) => {
                let path = output_path(&self.output_dir, name, None);
                log::debug!("Copy {name}");
                copy_entry(entry, &path, self.overwrite)?;
                Ok(path)
            }
            (EntryAction::Pcx { .. } | EntryAction::Wal, Some(palette)) => {
                let path = output_path(&self.output_dir, name, Some("png"));
                log::debug!("Convert {name}");
                let image = action.decode(entry, palette)?;
                write_png(
                    &path,
                    image.width(),
                    image.height(),
                    &image.to_truecolor(palette),
                    self.overwrite,
                )?;
                Ok(path)
            }
            (EntryAction::Pcx { .. } | EntryAction::Wal, None) => Err(PakError::NotFound(COLORMAP_NAME.to_string())),
            (EntryAction::Unsupported | EntryAction::Skip, _) => {
                Err(PakError::UnsupportedFormat(format!("{action:?} entries are not extracted")))
            }
        }
    }
}

impl Catalog {
    pub fn extractor(&self, output_dir: impl AsRef<Path>) -> CatalogExtractBuilder<'_> {
        CatalogExtractBuilder::new(self, output_dir)
    }
}

/// Highest-level unpack API: scan a game directory + extract with builder configuration.
pub struct UnpackBuilder {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    backend: PakBackend,
    convert: bool,
    mode: ExtractMode,
    threads: Option<usize>,
    overwrite: bool,
    filter: Option<Arc<EntryFilter>>,
    on_event: Option<Arc<EventHandler>>,
}

impl Default for UnpackBuilder {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: None,
            backend: PakBackend::default(),
            convert: true,
            mode: ExtractMode::default(),
            threads: None,
            overwrite: false,
            filter: None,
            on_event: None,
        }
    }
}

impl UnpackBuilder {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: impl AsRef<Path>) -> Self {
        self.input = Some(input.as_ref().to_path_buf());
        self
    }

    pub fn output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(output_dir.as_ref().to_path_buf());
        self
    }

    pub fn backend(mut self, backend: PakBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.mode = if enabled {
            ExtractMode::Parallel
        } else {
            ExtractMode::Sequential
        };
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&CatalogEntry) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn on_event<F>(mut self, on_event: F) -> Self
    where
        F: Fn(ExtractEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    pub fn run(self) -> Result<ExtractReport> {
        let input = self.input.ok_or_else(|| {
            PakError::IO(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Missing input path",
            ))
        })?;
        let output_dir = self.output_dir.ok_or_else(|| {
            PakError::IO(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Missing output dir",
            ))
        })?;

        let catalog = Catalog::builder().backend(self.backend).scan(&input)?;

        let mut extractor = catalog
            .extractor(&output_dir)
            .convert(self.convert)
            .mode(self.mode)
            .overwrite(self.overwrite);

        if let Some(threads) = self.threads {
            extractor = extractor.threads(threads);
        }
        if let Some(filter) = self.filter {
            extractor = extractor.filter(move |entry| filter(entry));
        }
        if let Some(on_event) = self.on_event {
            extractor = extractor.on_event(move |event| on_event(event));
        }

        extractor.run()
    }
}

struct AtomicCount(std::sync::atomic::AtomicUsize);

impl AtomicCount {
    fn new() -> Self {
        Self(std::sync::atomic::AtomicUsize::new(0))
    }

    fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::palette::PALETTE_SIZE;
    use crate::palette::tests::gradient_rgb;
    use crate::pcx::tests::{build_pcx, encode_rle};
    use crate::read::tests::build_pak;
    use crate::wal::tests::build_wal;

    /// Color of index `i` under [`gradient_rgb`], as RGBA bytes.
    fn gradient_color(i: u8) -> [u8; 4] {
        [i, 255 - i, i / 2, 255]
    }

    fn game_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let colormap = build_pcx(1, 0, &[0x05, 0x06], Some(&gradient_rgb()));
        let help = build_pcx(3, 3, &[0xC4u8, 0x10].repeat(4), Some(&gradient_rgb()));
        let skin = build_pcx(2, 2, &encode_rle(&[9, 9, 9, 9, 5, 9, 9, 9, 9], 3), Some(&[0u8; PALETTE_SIZE]));
        let wal = build_wal(2, 2, 100, 0, &[1, 2, 3, 4]);
        let pak = build_pak(&[
            (COLORMAP_NAME, &colormap),
            ("pics/Help.PCX", &help),
            ("models/tank/skin.pcx", &skin),
            ("textures/e1u1/floor.wal", &wal),
            ("sound/hit.wav", b"RIFF"),
            ("pics/logo.tga", b"tga"),
        ]);
        fs::write(dir.path().join("pak0.pak"), pak).unwrap();

        // shadowed by the packed copy
        fs::create_dir(dir.path().join("sound")).unwrap();
        fs::write(dir.path().join("sound/hit.wav"), b"loose").unwrap();
        dir
    }

    #[test]
    fn test_classify() {
        assert_eq!(EntryAction::classify(COLORMAP_NAME, true), EntryAction::Skip);
        assert_eq!(EntryAction::classify(COLORMAP_NAME, false), EntryAction::Copy);
        assert_eq!(EntryAction::classify("pics/help.pcx", true), EntryAction::Pcx { skin: false });
        assert_eq!(EntryAction::classify("models/a/skin.PCX", true), EntryAction::Pcx { skin: true });
        assert_eq!(EntryAction::classify("players/male/grunt.pcx", true), EntryAction::Pcx { skin: true });
        assert_eq!(EntryAction::classify("textures/a.wal", true), EntryAction::Wal);
        assert_eq!(EntryAction::classify("env/sky.tga", true), EntryAction::Unsupported);
        assert_eq!(EntryAction::classify("maps/base1.bsp", true), EntryAction::Copy);
        assert_eq!(EntryAction::classify("textures/a.wal", false), EntryAction::Copy);
    }

    #[test]
    fn test_convert() {
        for mode in [ExtractMode::Sequential, ExtractMode::Parallel] {
            let game = game_dir();
            let out = tempfile::tempdir().unwrap();
            let report = UnpackBuilder::builder()
                .input(game.path())
                .output_dir(out.path())
                .mode(mode)
                .run()
                .unwrap();
            assert_eq!(
                report,
                ExtractReport {
                    converted: 3,
                    copied: 1,
                    skipped: 2
                }
            );

            let out = out.path();
            assert_eq!(fs::read(out.join("pics/colormap.bin")).unwrap(), gradient_rgb());
            assert!(!out.join("pics/colormap.pcx").exists());
            assert!(!out.join("pics/colormap.png").exists());
            assert!(!out.join("pics/logo.tga").exists());
            assert_eq!(fs::read(out.join("sound/hit.wav")).unwrap(), b"RIFF");

            let help = out.join("pics/help.png");
            assert_eq!(image::image_dimensions(&help).unwrap(), (4, 4));
            let help = image::open(&help).unwrap().to_rgba8();
            assert_eq!(help.pixels().count(), 16);
            assert!(help.pixels().all(|p| p.0 == gradient_color(0x10)));

            let floor = out.join("textures/e1u1/floor.png");
            let floor = image::open(&floor).unwrap().to_rgba8();
            let colors: Vec<[u8; 4]> = floor.pixels().map(|p| p.0).collect();
            assert_eq!(
                colors,
                [gradient_color(1), gradient_color(2), gradient_color(3), gradient_color(4)]
            );

            // background of a skin is repainted, the subject is kept
            let skin = image::open(out.join("models/tank/skin.png")).unwrap().to_rgba8();
            assert_eq!(skin.get_pixel(1, 1).0, gradient_color(5));
            assert!(skin.pixels().all(|p| p.0 != gradient_color(9)));
        }
    }

    #[test]
    fn test_decode_dispatch() {
        let game = game_dir();
        let catalog = Catalog::from_dir(game.path()).unwrap();
        let palette = Palette::load(&catalog, COLORMAP_NAME).unwrap();

        let entry = catalog.get("textures/e1u1/floor.wal").unwrap();
        let image = EntryAction::classify(entry.name(), true).decode(entry, &palette).unwrap();
        assert_eq!(image.pixels(), &[1, 2, 3, 4]);

        let entry = catalog.get("pics/logo.tga").unwrap();
        let err = EntryAction::classify(entry.name(), true).decode(entry, &palette).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_image_without_palette_is_not_copied() {
        let game = game_dir();
        let out = tempfile::tempdir().unwrap();
        let catalog = Catalog::from_dir(game.path()).unwrap();
        let extractor = catalog.extractor(out.path());
        let entry = catalog.get("textures/e1u1/floor.wal").unwrap();

        let err = extractor.extract_one(entry, EntryAction::Wal, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!out.path().join("textures/e1u1/floor.wal").exists());

        let err = extractor.extract_one(entry, EntryAction::Skip, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_no_convert_copies_everything() {
        let game = game_dir();
        let out = tempfile::tempdir().unwrap();
        let report = UnpackBuilder::builder()
            .input(game.path())
            .output_dir(out.path())
            .convert(false)
            .parallel(false)
            .run()
            .unwrap();
        assert_eq!(report.copied, 6);
        assert_eq!(report.converted, 0);

        let out = out.path();
        assert!(!out.join("pics/colormap.bin").exists());
        assert!(out.join("pics/colormap.pcx").exists());
        assert!(out.join("pics/help.pcx").exists());
        assert_eq!(fs::read(out.join("pics/logo.tga")).unwrap(), b"tga");
        assert_eq!(
            fs::read(out.join("textures/e1u1/floor.wal")).unwrap(),
            build_wal(2, 2, 100, 0, &[1, 2, 3, 4])
        );
    }

    #[test]
    fn test_no_convert_needs_no_palette() {
        let game = tempfile::tempdir().unwrap();
        fs::write(game.path().join("pak0.pak"), build_pak(&[("maps/q2dm1.bsp", b"IBSP")])).unwrap();
        let out = tempfile::tempdir().unwrap();

        let catalog = Catalog::from_dir(game.path()).unwrap();
        let err = catalog.extractor(out.path()).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let report = catalog.extractor(out.path()).convert(false).run().unwrap();
        assert_eq!(report.copied, 1);
    }

    #[test]
    fn test_failure_aborts_with_entry_name() {
        let mut bad = build_pcx(1, 1, &[1, 2, 3, 4], None);
        bad[1] = 3;
        for mode in [ExtractMode::Sequential, ExtractMode::Parallel] {
            let game = tempfile::tempdir().unwrap();
            let colormap = build_pcx(1, 0, &[0x05, 0x06], Some(&gradient_rgb()));
            let pak = build_pak(&[(COLORMAP_NAME, &colormap), ("pics/bad.pcx", &bad)]);
            fs::write(game.path().join("pak0.pak"), pak).unwrap();
            let out = tempfile::tempdir().unwrap();

            let err = Catalog::from_dir(game.path())
                .unwrap()
                .extractor(out.path())
                .mode(mode)
                .threads(2)
                .run()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormat);
            assert!(err.to_string().starts_with("pics/bad.pcx: "), "{err}");
        }
    }

    #[test]
    fn test_overwrite() {
        let game = game_dir();
        let out = tempfile::tempdir().unwrap();
        let catalog = Catalog::from_dir(game.path()).unwrap();

        catalog.extractor(out.path()).run().unwrap();
        let err = catalog.extractor(out.path()).parallel(false).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        catalog.extractor(out.path()).overwrite(true).run().unwrap();
    }

    #[test]
    fn test_filter_and_events() {
        let game = game_dir();
        let out = tempfile::tempdir().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let report = Catalog::from_dir(game.path())
            .unwrap()
            .extractor(out.path())
            .parallel(false)
            .filter(|entry| entry.name().starts_with("textures/"))
            .on_event(move |event| sink.lock().push(event))
            .run()
            .unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(report.copied, 0);
        assert_eq!(report.skipped, 5);
        assert!(!out.path().join("sound/hit.wav").exists());

        let events = events.lock();
        assert!(matches!(events[0], ExtractEvent::Start { total: 1 }));
        assert!(matches!(&events[1], ExtractEvent::FileStart { name } if name == "textures/e1u1/floor.wal"));
        assert!(matches!(&events[2], ExtractEvent::FileDone { path, .. } if path.ends_with("textures/e1u1/floor.png")));
        assert!(matches!(events[3], ExtractEvent::Finish { converted: 1, .. }));
    }

    #[test]
    fn test_missing_paths() {
        assert!(UnpackBuilder::builder().output_dir("out").run().is_err());
        assert!(UnpackBuilder::builder().input("in").run().is_err());
    }
}
