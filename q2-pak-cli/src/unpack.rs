use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use q2_pak_core::extract::{ExtractEvent, UnpackBuilder};
use q2_pak_core::pakfile::PakBackend;
use regex::Regex;

use crate::UnpackCommand;

pub fn unpack(cmd: &UnpackCommand) -> anyhow::Result<()> {
    let include = cmd
        .include
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid include pattern")?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar().template("{pos}/{len} files written {wide_bar} elapsed: {elapsed} eta: {eta}")?,
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.println(format!("Output directory: `{}`", cmd.output));

    let bar1 = bar.clone();
    let mut builder = UnpackBuilder::builder()
        .input(&cmd.input)
        .output_dir(&cmd.output)
        .backend(if cmd.no_mmap { PakBackend::File } else { PakBackend::Mmap })
        .convert(!cmd.no_convert)
        .parallel(!cmd.sequential)
        .overwrite(cmd.overwrite)
        .on_event(move |event| match event {
            ExtractEvent::Start { total } => bar1.set_length(total as u64),
            ExtractEvent::FileDone { .. } => bar1.inc(1),
            _ => {}
        });
    if let Some(threads) = cmd.threads {
        builder = builder.threads(threads);
    }
    if let Some(include) = include {
        builder = builder.filter(move |entry| include.is_match(entry.name()));
    }

    let result = builder
        .run()
        .with_context(|| format!("Failed to unpack `{}`", cmd.input));
    bar.finish_and_clear();
    let report = result?;

    log::info!(
        "Done. {} converted, {} copied, {} skipped.",
        report.converted,
        report.copied,
        report.skipped
    );
    Ok(())
}
