//! Storage provider abstraction.
//!
//! The engine never touches a filesystem path directly. It talks to a
//! `StorageProvider` that resolves opaque `Locator`s to streams and supports
//! creating, deleting and listing items under a folder locator.

mod local;
mod memory;

pub use local::LocalFsProvider;
pub use memory::MemoryProvider;

use std::collections::HashSet;
use std::io::{self, Read, Write};

/// Opaque reference to a storage item or folder. Only the provider that
/// produced it knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure of a single storage operation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot create {name:?} in {folder}: {source}")]
    Create {
        folder: Locator,
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot open {locator} for reading: {source}")]
    OpenRead {
        locator: Locator,
        #[source]
        source: io::Error,
    },
    #[error("cannot open {locator} for writing: {source}")]
    OpenWrite {
        locator: Locator,
        #[source]
        source: io::Error,
    },
    #[error("cannot delete {locator}: {source}")]
    Delete {
        locator: Locator,
        #[source]
        source: io::Error,
    },
    #[error("cannot list {folder}: {source}")]
    List {
        folder: Locator,
        #[source]
        source: io::Error,
    },
}

pub type ReadStream = Box<dyn Read + Send>;
pub type WriteStream = Box<dyn Write + Send>;

/// Backing store the engine copies through (local filesystem, remote, in-memory).
pub trait StorageProvider: Send + Sync {
    /// Create a new child item under `folder` and return its locator.
    fn create_child_document(
        &self,
        folder: &Locator,
        media_type: &str,
        display_name: &str,
    ) -> Result<Locator, StorageError>;

    fn open_read_stream(&self, locator: &Locator) -> Result<ReadStream, StorageError>;

    fn open_write_stream(&self, locator: &Locator) -> Result<WriteStream, StorageError>;

    fn delete_document(&self, locator: &Locator) -> Result<(), StorageError>;

    /// Display names of the items directly under `folder`.
    fn list_display_names(&self, folder: &Locator) -> Result<HashSet<String>, StorageError>;
}

/// Picks `name (1).ext`, `name (2).ext`, ... until `taken` rejects none.
pub(crate) fn unique_name(display_name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(display_name) {
        return display_name.to_string();
    }
    let (stem, ext) = match display_name.rfind('.') {
        Some(idx) if idx > 0 => (&display_name[..idx], &display_name[idx..]),
        _ => (display_name, ""),
    };
    let mut n = 1u32;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
