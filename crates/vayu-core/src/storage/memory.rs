//! In-memory provider for tests and dry runs.
//!
//! Locators are `folder/name` strings. Individual names or locators can be
//! told to fail, and reads can be throttled so tests can pause or cancel a
//! copy while it is in flight.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{unique_name, Locator, ReadStream, StorageError, StorageProvider, WriteStream};

type Buffer = Arc<Mutex<Vec<u8>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct Item {
    folder: Locator,
    name: String,
    data: Buffer,
}

#[derive(Default)]
struct State {
    folders: HashSet<Locator>,
    items: HashMap<Locator, Item>,
    failing_names: HashSet<String>,
    failing_reads: HashSet<Locator>,
    failing_writes: HashSet<String>,
    read_limits: HashMap<Locator, u64>,
    deleted: Vec<Locator>,
    read_delay: Option<Duration>,
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Arc<Mutex<State>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, name: &str) -> Locator {
        let loc = Locator::new(name);
        lock(&self.state).folders.insert(loc.clone());
        loc
    }

    /// Add a file with `data` under `folder` (created if missing).
    pub fn add_file(&self, folder: &Locator, name: &str, data: Vec<u8>) -> Locator {
        let mut state = lock(&self.state);
        state.folders.insert(folder.clone());
        let loc = Locator::new(format!("{}/{}", folder.as_str(), name));
        state.items.insert(
            loc.clone(),
            Item {
                folder: folder.clone(),
                name: name.to_string(),
                data: Arc::new(Mutex::new(data)),
            },
        );
        loc
    }

    pub fn exists(&self, locator: &Locator) -> bool {
        lock(&self.state).items.contains_key(locator)
    }

    pub fn contents(&self, locator: &Locator) -> Option<Vec<u8>> {
        lock(&self.state)
            .items
            .get(locator)
            .map(|item| lock(&item.data).clone())
    }

    /// Locators of all items currently under `folder`.
    pub fn items_in(&self, folder: &Locator) -> Vec<Locator> {
        let state = lock(&self.state);
        let mut out: Vec<Locator> = state
            .items
            .iter()
            .filter(|(_, item)| &item.folder == folder)
            .map(|(loc, _)| loc.clone())
            .collect();
        out.sort();
        out
    }

    /// Every locator passed to `delete_document`, in call order.
    pub fn deleted(&self) -> Vec<Locator> {
        lock(&self.state).deleted.clone()
    }

    /// Creating a child with this display name fails.
    pub fn fail_create(&self, display_name: &str) {
        lock(&self.state)
            .failing_names
            .insert(display_name.to_string());
    }

    /// Opening this locator for reading fails.
    pub fn fail_read(&self, locator: &Locator) {
        lock(&self.state).failing_reads.insert(locator.clone());
    }

    /// Opening a write stream on an item with this name fails, after the item
    /// itself was created.
    pub fn fail_write(&self, display_name: &str) {
        lock(&self.state)
            .failing_writes
            .insert(display_name.to_string());
    }

    /// Reads of this locator return an error once `bytes` have been delivered.
    pub fn fail_read_after(&self, locator: &Locator, bytes: u64) {
        lock(&self.state).read_limits.insert(locator.clone(), bytes);
    }

    /// Sleep this long on every read call of streams opened afterwards.
    pub fn set_read_delay(&self, delay: Duration) {
        lock(&self.state).read_delay = Some(delay);
    }
}

impl StorageProvider for MemoryProvider {
    fn create_child_document(
        &self,
        folder: &Locator,
        _media_type: &str,
        display_name: &str,
    ) -> Result<Locator, StorageError> {
        let mut state = lock(&self.state);
        let create_err = |msg: &str| StorageError::Create {
            folder: folder.clone(),
            name: display_name.to_string(),
            source: io::Error::new(io::ErrorKind::Other, msg.to_string()),
        };
        if !state.folders.contains(folder) {
            return Err(create_err("no such folder"));
        }
        if state.failing_names.contains(display_name) {
            return Err(create_err("injected create failure"));
        }
        let name = unique_name(display_name, |n| {
            state
                .items
                .values()
                .any(|item| &item.folder == folder && item.name == n)
        });
        let loc = Locator::new(format!("{}/{}", folder.as_str(), name));
        state.items.insert(
            loc.clone(),
            Item {
                folder: folder.clone(),
                name,
                data: Arc::default(),
            },
        );
        Ok(loc)
    }

    fn open_read_stream(&self, locator: &Locator) -> Result<ReadStream, StorageError> {
        let state = lock(&self.state);
        let read_err = |msg: &str| StorageError::OpenRead {
            locator: locator.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, msg.to_string()),
        };
        if state.failing_reads.contains(locator) {
            return Err(read_err("injected read failure"));
        }
        let item = state.items.get(locator).ok_or_else(|| read_err("no such item"))?;
        let data = lock(&item.data).clone();
        Ok(Box::new(MemReader {
            inner: io::Cursor::new(data),
            delay: state.read_delay,
            fail_after: state.read_limits.get(locator).copied(),
        }))
    }

    fn open_write_stream(&self, locator: &Locator) -> Result<WriteStream, StorageError> {
        let state = lock(&self.state);
        let item = state.items.get(locator).ok_or_else(|| StorageError::OpenWrite {
            locator: locator.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such item"),
        })?;
        if state.failing_writes.contains(&item.name) {
            return Err(StorageError::OpenWrite {
                locator: locator.clone(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected write failure"),
            });
        }
        lock(&item.data).clear();
        Ok(Box::new(MemWriter {
            data: Arc::clone(&item.data),
        }))
    }

    fn delete_document(&self, locator: &Locator) -> Result<(), StorageError> {
        let mut state = lock(&self.state);
        state.items.remove(locator);
        state.deleted.push(locator.clone());
        Ok(())
    }

    fn list_display_names(&self, folder: &Locator) -> Result<HashSet<String>, StorageError> {
        let state = lock(&self.state);
        if !state.folders.contains(folder) {
            return Err(StorageError::List {
                folder: folder.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such folder"),
            });
        }
        Ok(state
            .items
            .values()
            .filter(|item| &item.folder == folder)
            .map(|item| item.name.clone())
            .collect())
    }
}

struct MemReader {
    inner: io::Cursor<Vec<u8>>,
    delay: Option<Duration>,
    fail_after: Option<u64>,
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        let Some(limit) = self.fail_after else {
            return self.inner.read(buf);
        };
        let left = limit.saturating_sub(self.inner.position());
        if left == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        let n = buf.len().min(usize::try_from(left).unwrap_or(usize::MAX));
        self.inner.read(&mut buf[..n])
    }
}

struct MemWriter {
    data: Buffer,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.data).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
