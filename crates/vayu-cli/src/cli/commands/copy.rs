//! `vayu copy` – copy media from one folder into another, with live progress.

use anyhow::{bail, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use vayu_core::config::EngineConfig;
use vayu_core::{dedupe, JobStatus, LocalFsProvider, ProgressSnapshot, TransferEngine, TransferJob};

use crate::cli::{control_socket, scan};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
/// Wide enough to blank out a progress line.
const LINE_WIDTH: usize = 64;

#[derive(Debug)]
pub struct CopyArgs {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub include_existing: bool,
    pub all: bool,
}

pub async fn run_copy(cfg: &EngineConfig, args: CopyArgs) -> Result<()> {
    if !args.dest.is_dir() {
        bail!("destination {} is not a directory", args.dest.display());
    }
    if args.dest.to_str().is_none() {
        bail!("destination {} is not a valid UTF-8 path", args.dest.display());
    }
    let provider = Arc::new(LocalFsProvider::new());
    let dest = LocalFsProvider::locator(&args.dest);

    let mut items = scan::scan_media(&args.source, args.all)?;
    if cfg.skip_existing && !args.include_existing {
        let (pending, done) = dedupe::partition_pending(provider.as_ref(), &dest, items)?;
        if !done.is_empty() {
            println!("Skipping {} file(s) already in {}", done.len(), dest);
        }
        items = pending;
    }
    if items.is_empty() {
        println!("Nothing to copy.");
        return Ok(());
    }

    let engine = TransferEngine::new(provider, cfg);
    let mut progress_rx = engine.subscribe_progress();
    let mut completed_rx = engine.subscribe_completed();

    let _listener = match vayu_core::control::default_control_socket_path() {
        Ok(path) => match control_socket::spawn_control_listener(engine.clone(), &path) {
            Ok(l) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(l)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {:#}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("no control socket path: {}", e);
            None
        }
    };

    let count = items.len();
    let jobs = items
        .into_iter()
        .map(|item| TransferJob::new(item, dest.clone()))
        .collect();
    engine.enqueue(jobs)?;
    println!("Copying {} file(s) into {}", count, dest);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut completed_open = true;
    let mut last_print: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = progress_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = progress_rx.borrow_and_update().clone();
                let finished = snap.completed || snap.cancelled;
                let now = Instant::now();
                if finished || last_print.map_or(true, |t| now.duration_since(t) >= PROGRESS_INTERVAL) {
                    print_progress(&snap);
                    last_print = Some(now);
                }
                if finished {
                    break;
                }
            }
            item = completed_rx.recv(), if completed_open => match item {
                Ok(item) => print_copied(&item.display_name),
                Err(RecvError::Lagged(n)) => tracing::warn!("missed {} completion event(s)", n),
                Err(RecvError::Closed) => completed_open = false,
            },
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    tracing::warn!("ctrl-c handler: {}", e);
                }
                println!("\nCancelling...");
                engine.cancel();
            }
        }
    }

    let waiter = engine.clone();
    tokio::task::spawn_blocking(move || waiter.wait_idle()).await?;
    loop {
        match completed_rx.try_recv() {
            Ok(item) => print_copied(&item.display_name),
            Err(TryRecvError::Lagged(n)) => tracing::warn!("missed {} completion event(s)", n),
            Err(_) => break,
        }
    }
    println!();

    let reports = engine.reports();
    let copied = reports.iter().filter(|r| r.status == JobStatus::Completed).count();
    let failed: Vec<_> = reports
        .iter()
        .filter(|r| r.status == JobStatus::Failed)
        .collect();
    let cancelled = reports.len() - copied - failed.len();
    for r in &failed {
        println!(
            "  failed {}: {}",
            r.display_name,
            r.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!(
        "Copied {} of {} file(s){}",
        copied,
        count,
        if cancelled > 0 {
            format!(", {} cancelled", cancelled)
        } else {
            String::new()
        }
    );
    tracing::info!(copied, failed = failed.len(), cancelled, "copy command finished");
    if !failed.is_empty() {
        bail!("{} file(s) failed to copy", failed.len());
    }
    Ok(())
}

/// One progress line, starting with `\r` and without a newline so it can be
/// redrawn in place.
fn format_progress(snap: &ProgressSnapshot) -> String {
    let done_mib = snap.copied_bytes as f64 / 1_048_576.0;
    let total_mib = snap.total_bytes as f64 / 1_048_576.0;
    let pct = snap.fraction() * 100.0;
    let rate_mib = snap.throughput_bytes_per_sec / 1_048_576.0;
    let eta = snap
        .eta_secs
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    let tag = if snap.paused { "  [paused]" } else { "" };
    format!(
        "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}{}  ",
        done_mib, total_mib, pct, rate_mib, eta, tag
    )
}

fn print_progress(snap: &ProgressSnapshot) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(format_progress(snap).as_bytes());
    let _ = out.flush();
}

/// Print a finished file on its own line, overwriting the progress line.
fn print_copied(name: &str) {
    println!("\r  copied {:<width$}", name, width = LINE_WIDTH);
}
