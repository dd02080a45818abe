//! Pause/cancel signals shared between the caller and the copy worker.
//!
//! Both flags are plain atomics: the worker polls them between chunks and the
//! caller flips them from any thread. No lock is involved.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared pause and cancel flags for one engine instance.
#[derive(Debug, Default, Clone)]
pub struct TransferControl {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sets the pause flag. Returns true if the flag changed.
    pub fn request_pause(&self) -> bool {
        !self.paused.swap(true, Ordering::AcqRel)
    }

    /// Clears the pause flag. Returns true if the flag changed.
    pub fn request_resume(&self) -> bool {
        self.paused.swap(false, Ordering::AcqRel)
    }

    /// Sets the cancel flag and clears pause so a paused worker wakes up and unwinds.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
    }

    /// Clears both flags at the start of a new run.
    pub fn reset(&self) {
        self.paused.store(false, Ordering::Release);
        self.cancelled.store(false, Ordering::Release);
    }
}

/// Default path for the control socket of a running `vayu copy`.
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("vayu")?.get_state_home();
    Ok(dir.join("control.sock"))
}
