//! "Already copied" detection.
//!
//! Matching is by display name only: a different file that happens to share a
//! name with one at the destination is reported as already copied. Size and
//! modification time are not compared.

use std::collections::HashSet;

use crate::job::MediaItem;
use crate::storage::{Locator, StorageError, StorageProvider};

/// Names of `items` that already exist under `folder`.
pub fn already_copied(
    provider: &dyn StorageProvider,
    folder: &Locator,
    items: &[MediaItem],
) -> Result<HashSet<String>, StorageError> {
    let existing = provider.list_display_names(folder)?;
    Ok(items
        .iter()
        .filter(|item| existing.contains(&item.display_name))
        .map(|item| item.display_name.clone())
        .collect())
}

/// Split `items` into (not yet copied, already copied), preserving order.
pub fn partition_pending(
    provider: &dyn StorageProvider,
    folder: &Locator,
    items: Vec<MediaItem>,
) -> Result<(Vec<MediaItem>, Vec<MediaItem>), StorageError> {
    let existing = provider.list_display_names(folder)?;
    let (done, pending): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| existing.contains(&item.display_name));
    tracing::debug!(
        folder = %folder,
        pending = pending.len(),
        already_copied = done.len(),
        "checked destination for existing copies"
    );
    Ok((pending, done))
}
