//! RAM-backed storage medium.
//!
//! Behaves like a removable card whose presence can be switched at runtime,
//! and counts acquisitions and releases so callers can check that every
//! acquire is paired with a release. Used for dry runs and tests.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::medium::{AppendHandle, StorageMedium, Volume};

#[derive(Debug)]
struct MemoryState {
    available: bool,
    fail_open: bool,
    fail_write: bool,
    partial_write: bool,
    files: HashMap<String, Vec<u8>>,
    acquisitions: usize,
    releases: usize,
    open_handles: usize,
}

/// In-memory medium. Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                available: true,
                fail_open: false,
                fail_write: false,
                partial_write: false,
                files: HashMap::new(),
                acquisitions: 0,
                releases: 0,
                open_handles: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or remove the simulated card.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make `open_append` fail, as with a corrupt filesystem.
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make writes fail before any byte lands.
    pub fn set_fail_write(&self, fail: bool) {
        self.lock().fail_write = fail;
    }

    /// Make writes land half their bytes and then fail, as with a card that
    /// fills up mid-record.
    pub fn set_partial_write(&self, partial: bool) {
        self.lock().partial_write = partial;
    }

    /// Raw contents of `name`, empty if it does not exist.
    pub fn contents(&self, name: &str) -> Vec<u8> {
        self.lock()
            .files
            .get(name.trim_start_matches('/'))
            .cloned()
            .unwrap_or_default()
    }

    /// Contents of `name` split into lines, terminators removed.
    pub fn lines(&self, name: &str) -> Vec<String> {
        String::from_utf8_lossy(&self.contents(name))
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lock().files.contains_key(name.trim_start_matches('/'))
    }

    pub fn acquisitions(&self) -> usize {
        self.lock().acquisitions
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }
}

impl StorageMedium for MemoryMedium {
    fn acquire(&self) -> io::Result<Box<dyn Volume + '_>> {
        let mut state = self.lock();
        if !state.available {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no medium present"));
        }
        state.acquisitions += 1;
        Ok(Box::new(MemoryVolume { medium: self }))
    }
}

struct MemoryVolume<'a> {
    medium: &'a MemoryMedium,
}

impl Volume for MemoryVolume<'_> {
    fn open_append(&mut self, name: &str) -> io::Result<Box<dyn AppendHandle + '_>> {
        let mut state = self.medium.lock();
        if state.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot open for append",
            ));
        }
        let name = name.trim_start_matches('/').to_string();
        let start = state.files.entry(name.clone()).or_default().len();
        state.open_handles += 1;
        Ok(Box::new(MemoryHandle {
            medium: self.medium,
            name,
            start,
        }))
    }
}

impl Drop for MemoryVolume<'_> {
    fn drop(&mut self) {
        self.medium.lock().releases += 1;
    }
}

struct MemoryHandle<'a> {
    medium: &'a MemoryMedium,
    name: String,
    start: usize,
}

impl AppendHandle for MemoryHandle<'_> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.medium.lock();
        if state.fail_write {
            return Err(io::Error::new(io::ErrorKind::Other, "write failed"));
        }
        let partial = state.partial_write;
        let file = state.files.entry(self.name.clone()).or_default();
        if partial {
            file.extend_from_slice(&buf[..buf.len() / 2]);
            return Err(io::Error::new(io::ErrorKind::StorageFull, "medium full"));
        }
        file.extend_from_slice(buf);
        Ok(())
    }

    fn rollback(&mut self) -> io::Result<()> {
        let start = self.start;
        if let Some(file) = self.medium.lock().files.get_mut(&self.name) {
            file.truncate(start);
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryHandle<'_> {
    fn drop(&mut self) {
        self.medium.lock().open_handles -= 1;
    }
}
