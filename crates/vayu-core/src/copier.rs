//! Byte-stream copier: moves one job's bytes in fixed-size chunks.
//!
//! Pause and cancel are cooperative. They are consulted between chunks only;
//! a chunk write that has started always completes.

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::config::{EngineConfig, DEFAULT_CHUNK_SIZE};

/// How a copy ended when no I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Source reached EOF; all bytes written and the writer flushed.
    Completed(u64),
    /// Stopped early on request. The destination holds a partial artifact.
    Cancelled(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    pub chunk_size: usize,
    pub poll_interval: Duration,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl From<&EngineConfig> for CopyOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size_bytes.max(1),
            poll_interval: cfg.pause_poll_interval(),
        }
    }
}

/// Copy `reader` into `writer`, calling `on_progress` with the cumulative byte
/// count of this stream after every chunk written.
///
/// While `should_pause` holds, the copier sleeps in `poll_interval` steps before
/// reading the next chunk. Once `should_cancel` holds, it stops without reading
/// further and returns `CopyOutcome::Cancelled`.
pub fn copy_stream<R, W, P, C, F>(
    reader: &mut R,
    writer: &mut W,
    opts: CopyOptions,
    should_pause: P,
    should_cancel: C,
    mut on_progress: F,
) -> io::Result<CopyOutcome>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    P: Fn() -> bool,
    C: Fn() -> bool,
    F: FnMut(u64),
{
    let mut buf = vec![0u8; opts.chunk_size.max(1)];
    let mut copied: u64 = 0;

    loop {
        while should_pause() && !should_cancel() {
            std::thread::sleep(opts.poll_interval);
        }
        if should_cancel() {
            return Ok(CopyOutcome::Cancelled(copied));
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        copied += n as u64;
        on_progress(copied);

        if should_cancel() {
            return Ok(CopyOutcome::Cancelled(copied));
        }
    }

    writer.flush()?;
    Ok(CopyOutcome::Completed(copied))
}
