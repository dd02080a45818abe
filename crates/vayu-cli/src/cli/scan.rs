//! Source folder listing: which files are media and how big they are.

use anyhow::{Context, Result};
use std::path::Path;
use vayu_core::{LocalFsProvider, MediaItem};

/// MIME type for a media file extension, or `None` for anything else.
pub fn media_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "dng" => "image/x-adobe-dng",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "3gp" => "video/3gpp",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}

/// Regular files directly under `dir`, sorted by name. With `include_all`
/// non-media files are listed too, typed `application/octet-stream`.
/// Files whose path is not valid UTF-8 are skipped with a warning, since
/// locators are strings.
pub fn scan_media(dir: &Path, include_all: bool) -> Result<Vec<MediaItem>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    let mut items = Vec::new();
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|_| path.to_str().is_some())
            .map(str::to_owned)
        else {
            tracing::warn!(path = ?path, "skipping file with non-UTF-8 path");
            continue;
        };
        let media_type = match media_type_for(&name) {
            Some(t) => t,
            None if include_all => "application/octet-stream",
            None => continue,
        };
        items.push(MediaItem {
            locator: LocalFsProvider::locator(&path),
            display_name: name,
            size_bytes: meta.len(),
            media_type: media_type.to_string(),
        });
    }
    items.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(items)
}
