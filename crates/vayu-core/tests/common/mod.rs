//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use vayu_core::config::EngineConfig;
use vayu_core::{Locator, MediaItem, MemoryProvider, TransferEngine, TransferJob};

pub fn test_config() -> EngineConfig {
    EngineConfig {
        pause_poll_interval_ms: 10,
        ..EngineConfig::default()
    }
}

pub fn engine(provider: &MemoryProvider) -> TransferEngine {
    TransferEngine::new(Arc::new(provider.clone()), &test_config())
}

/// Deterministic payload of `size` bytes.
pub fn payload(size: usize) -> Vec<u8> {
    (0u8..=250).cycle().take(size).collect()
}

/// Add a source file of `size` bytes and describe it as a media item.
pub fn media(provider: &MemoryProvider, folder: &Locator, name: &str, size: usize) -> MediaItem {
    MediaItem {
        locator: provider.add_file(folder, name, payload(size)),
        display_name: name.to_string(),
        size_bytes: size as u64,
        media_type: "image/jpeg".to_string(),
    }
}

pub fn jobs(items: Vec<MediaItem>, destination: &Locator) -> Vec<TransferJob> {
    items
        .into_iter()
        .map(|item| TransferJob::new(item, destination.clone()))
        .collect()
}

/// Poll `cond` every millisecond until it holds; panics after `timeout`.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < timeout, "condition not met within {timeout:?}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
