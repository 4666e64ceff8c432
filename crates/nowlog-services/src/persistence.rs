//! Durable append of received messages.
//!
//! Every append is self-contained: acquire the medium, open the log in
//! append mode, write one line, close, release. Nothing is held between
//! calls and nothing is retried or queued. A failed append loses that one
//! message and says so; it never takes the process down.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::medium::StorageMedium;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage medium unavailable: {0}")]
    MediumUnavailable(#[source] io::Error),
    #[error("failed to append to {name}: {source}")]
    AppendFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Append-only line writer over a [`StorageMedium`].
pub struct Persistence {
    medium: Arc<dyn StorageMedium>,
    log_name: String,
    /// Serializes appends so two records can never share a line.
    write_lock: Mutex<()>,
}

impl Persistence {
    pub const TERMINATOR: u8 = b'\n';

    pub fn new(medium: Arc<dyn StorageMedium>, log_name: impl Into<String>) -> Self {
        Self {
            medium,
            log_name: log_name.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Append `record` plus a terminator as one line.
    ///
    /// `Ok` means the line was written and the handle closed. A write that
    /// fails partway is rolled back, so the log only ever holds whole lines.
    /// The record is written as-is; bytes are not interpreted.
    pub fn append(&self, record: &[u8]) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut volume = self
            .medium
            .acquire()
            .map_err(PersistenceError::MediumUnavailable)?;

        let mut handle = volume
            .open_append(&self.log_name)
            .map_err(|source| self.append_failed(source))?;

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record);
        line.push(Self::TERMINATOR);

        if let Err(source) = handle.write_all(&line) {
            if let Err(e) = handle.rollback() {
                tracing::warn!(log = %self.log_name, error = %e, "partial record left in log");
            }
            return Err(self.append_failed(source));
        }
        handle.close().map_err(|source| self.append_failed(source))?;

        tracing::debug!(log = %self.log_name, bytes = line.len(), "record appended");
        Ok(())
    }

    fn append_failed(&self, source: io::Error) -> PersistenceError {
        PersistenceError::AppendFailed {
            name: self.log_name.clone(),
            source,
        }
    }
}
