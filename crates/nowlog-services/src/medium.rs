//! Storage media — where the append-only log lives.
//!
//! A medium is acquired for every write and released afterwards, so a card
//! that is pulled and reinserted between messages is picked up again
//! without a restart. Acquisition yields a [`Volume`] guard; releasing it is
//! dropping it. Handles borrow the volume, so a handle can never outlive
//! the acquisition it came from.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// A storage device that must be made ready before each use.
pub trait StorageMedium: Send + Sync {
    /// Mount / open the medium. Fails when the device is absent or unusable.
    fn acquire(&self) -> io::Result<Box<dyn Volume + '_>>;
}

/// An acquired medium. Dropping it releases the acquisition.
pub trait Volume {
    /// Open `name` for appending, creating it if absent.
    fn open_append(&mut self, name: &str) -> io::Result<Box<dyn AppendHandle + '_>>;
}

/// An open log resource.
pub trait AppendHandle {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Discard everything written through this handle, restoring the
    /// resource to its length at open time.
    fn rollback(&mut self) -> io::Result<()>;

    /// Flush through the medium and close. Dropping without `close` still
    /// closes the handle but gives no durability report.
    fn close(self: Box<Self>) -> io::Result<()>;
}

// ── Directory medium ──────────────────────────────────────────────────────────

/// A medium mounted as a directory, e.g. an SD card at `/media/sd`.
///
/// The mount point must already exist; a missing directory is treated as a
/// removed card.
#[derive(Debug, Clone)]
pub struct DirMedium {
    mount_point: PathBuf,
}

impl DirMedium {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

impl StorageMedium for DirMedium {
    fn acquire(&self) -> io::Result<Box<dyn Volume + '_>> {
        let meta = std::fs::metadata(&self.mount_point).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("mount point {} unavailable: {e}", self.mount_point.display()),
            )
        })?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mount point {} is not a directory", self.mount_point.display()),
            ));
        }
        tracing::trace!(mount_point = %self.mount_point.display(), "medium acquired");
        Ok(Box::new(DirVolume {
            root: &self.mount_point,
        }))
    }
}

struct DirVolume<'a> {
    root: &'a Path,
}

impl Volume for DirVolume<'_> {
    fn open_append(&mut self, name: &str) -> io::Result<Box<dyn AppendHandle + '_>> {
        let path = log_path(self.root, name)?;
        let created = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if created {
            // The new directory entry must survive a power cut too.
            File::open(self.root)?.sync_all()?;
            tracing::debug!(path = %path.display(), "log created");
        }
        let start = file.metadata()?.len();
        Ok(Box::new(FileHandle { file, start }))
    }
}

/// Resolve `name` inside `root`. Only plain relative names are accepted,
/// so a log can never land outside the mount point.
fn log_path(root: &Path, name: &str) -> io::Result<PathBuf> {
    let relative = Path::new(name.trim_start_matches('/'));
    let plain = relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log name {name:?} must be a plain relative path"),
        ));
    }
    Ok(root.join(relative))
}

impl Drop for DirVolume<'_> {
    fn drop(&mut self) {
        tracing::trace!(mount_point = %self.root.display(), "medium released");
    }
}

struct FileHandle {
    file: File,
    /// File length when the handle was opened.
    start: u64,
}

impl AppendHandle for FileHandle {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.start)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.file.sync_data()
    }
}
