use anyhow::Context;
use q2_pak_core::catalog::{Catalog, EntryInfo};

use crate::ListCommand;

pub fn list(cmd: &ListCommand) -> anyhow::Result<()> {
    let catalog = Catalog::from_dir(&cmd.input).with_context(|| format!("Failed to scan `{}`", cmd.input))?;
    let entries: Vec<EntryInfo> = catalog.entries().iter().map(|e| e.info()).collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for info in &entries {
        println!(
            "{:<56} {:>10} {:>10}  {} ({})",
            info.name, info.offset, info.length, info.source, info.kind
        );
    }
    Ok(())
}
