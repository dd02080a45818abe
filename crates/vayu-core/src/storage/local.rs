//! Local filesystem provider: locators are plain paths.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::{unique_name, Locator, ReadStream, StorageError, StorageProvider, WriteStream};

/// Provider backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFsProvider;

impl LocalFsProvider {
    pub fn new() -> Self {
        Self
    }

    /// Locator for `path`. Non-UTF-8 bytes are replaced, so such a locator
    /// will not resolve; enumerators skip those paths.
    pub fn locator(path: &Path) -> Locator {
        Locator::new(path.to_string_lossy().into_owned())
    }

    fn path(locator: &Locator) -> PathBuf {
        PathBuf::from(locator.as_str())
    }
}

impl StorageProvider for LocalFsProvider {
    fn create_child_document(
        &self,
        folder: &Locator,
        _media_type: &str,
        display_name: &str,
    ) -> Result<Locator, StorageError> {
        let dir = Self::path(folder);
        let create_err = |source: io::Error| StorageError::Create {
            folder: folder.clone(),
            name: display_name.to_string(),
            source,
        };
        if display_name.is_empty() || display_name.contains(['/', '\\']) {
            return Err(create_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "display name must be a single path component",
            )));
        }
        if !dir.is_dir() {
            return Err(create_err(io::Error::new(
                io::ErrorKind::NotFound,
                "destination folder does not exist",
            )));
        }
        // create_new guards against a racing writer taking the name between check and create.
        loop {
            let name = unique_name(display_name, |n| dir.join(n).exists());
            let path = dir.join(&name);
            match File::options().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self::locator(&path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(create_err(e)),
            }
        }
    }

    fn open_read_stream(&self, locator: &Locator) -> Result<ReadStream, StorageError> {
        let file = File::open(Self::path(locator)).map_err(|source| StorageError::OpenRead {
            locator: locator.clone(),
            source,
        })?;
        Ok(Box::new(file))
    }

    fn open_write_stream(&self, locator: &Locator) -> Result<WriteStream, StorageError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(Self::path(locator))
            .map_err(|source| StorageError::OpenWrite {
                locator: locator.clone(),
                source,
            })?;
        Ok(Box::new(io::BufWriter::new(file)))
    }

    fn delete_document(&self, locator: &Locator) -> Result<(), StorageError> {
        match fs::remove_file(Self::path(locator)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete {
                locator: locator.clone(),
                source,
            }),
        }
    }

    fn list_display_names(&self, folder: &Locator) -> Result<HashSet<String>, StorageError> {
        let list_err = |source| StorageError::List {
            folder: folder.clone(),
            source,
        };
        let mut names = HashSet::new();
        for entry in fs::read_dir(Self::path(folder)).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
