//! `vayu pending` – list media not yet present in the destination.

use anyhow::{bail, Result};
use std::path::Path;
use vayu_core::{dedupe, LocalFsProvider};

use crate::cli::scan;

pub fn run_pending(source: &Path, dest: &Path, all: bool) -> Result<()> {
    if dest.to_str().is_none() {
        bail!("destination {} is not a valid UTF-8 path", dest.display());
    }
    let items = scan::scan_media(source, all)?;
    let provider = LocalFsProvider::new();
    let (pending, done) =
        dedupe::partition_pending(&provider, &LocalFsProvider::locator(dest), items)?;
    if pending.is_empty() {
        println!("Nothing to copy ({} already copied).", done.len());
        return Ok(());
    }
    let bytes: u64 = pending.iter().map(|i| i.size_bytes).sum();
    println!("{:>12}  NAME", "SIZE");
    for item in &pending {
        println!("{:>12}  {}", item.size_bytes, item.display_name);
    }
    println!(
        "{} file(s), {:.1} MiB to copy; {} already copied",
        pending.len(),
        bytes as f64 / 1_048_576.0,
        done.len()
    );
    Ok(())
}
