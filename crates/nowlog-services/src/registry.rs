//! Peer registry — the set of trusted peers, mirrored into the driver.
//!
//! Add-only. The local list always gains an entry for a new address, even
//! when the driver refuses it: such a peer is kept but is unreachable, and
//! the failure is reported as `DriverRejected`. Callers must not read a
//! successful local insert as "this peer can talk to us".

use std::sync::Arc;

use nowlog_core::{MacAddr, PeerDescriptor};

use crate::driver::{DriverError, RadioDriver};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("peer {0} is already registered")]
    DuplicateAddress(MacAddr),
    #[error("driver rejected peer {0}: {1}")]
    DriverRejected(MacAddr, DriverError),
}

/// Outcome of registering a configured peer list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    /// Accepted locally and by the driver.
    pub registered: usize,
    /// Accepted locally, refused by the driver.
    pub rejected: usize,
    /// Skipped because the address was already present.
    pub duplicates: usize,
}

/// Ordered, add-only peer table. Insertion order is configuration order.
pub struct PeerRegistry {
    peers: Vec<PeerDescriptor>,
    driver: Arc<dyn RadioDriver>,
}

impl PeerRegistry {
    pub fn new(driver: Arc<dyn RadioDriver>) -> Self {
        Self {
            peers: Vec::new(),
            driver,
        }
    }

    /// Register one peer locally and with the driver.
    ///
    /// A driver failure does not undo the local insert.
    pub fn add(&mut self, descriptor: PeerDescriptor) -> Result<(), RegistryError> {
        let address = descriptor.address();
        if self.contains(&address) {
            tracing::warn!(peer = %address, "duplicate peer ignored");
            return Err(RegistryError::DuplicateAddress(address));
        }

        let outcome = self.driver.register_peer(&descriptor);
        self.peers.push(descriptor);

        match outcome {
            Ok(()) => {
                tracing::info!(peer = %address, "peer registered");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(peer = %address, error = %e, "failed to register peer with driver");
                Err(RegistryError::DriverRejected(address, e))
            }
        }
    }

    /// Register every configured peer in order. Failures are logged and
    /// counted, never propagated.
    pub fn populate<I>(&mut self, peers: I) -> PopulateSummary
    where
        I: IntoIterator<Item = PeerDescriptor>,
    {
        let mut summary = PopulateSummary::default();
        for peer in peers {
            match self.add(peer) {
                Ok(()) => summary.registered += 1,
                Err(RegistryError::DriverRejected(..)) => summary.rejected += 1,
                Err(RegistryError::DuplicateAddress(_)) => summary.duplicates += 1,
            }
        }
        summary
    }

    pub fn contains(&self, address: &MacAddr) -> bool {
        self.peers.iter().any(|p| p.address() == *address)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerDescriptor> {
        self.peers.iter()
    }
}
