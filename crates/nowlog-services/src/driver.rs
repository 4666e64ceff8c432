//! Radio collaborator traits.
//!
//! The link-layer driver and the transport it rides on are not part of
//! nowlog. These traits are the contract between them and the intake
//! pipeline; the daemon supplies a UDP-backed implementation and tests use
//! [`crate::LoopbackRadio`].

use std::sync::Arc;

use nowlog_core::{InterfaceRole, MacAddr, PeerDescriptor};

/// Invoked by the driver for every accepted frame with
/// `(source address, payload, reported length)`.
///
/// The payload slice is only valid for the duration of the call.
pub type ReceiveCallback = Arc<dyn Fn(MacAddr, &[u8], usize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("radio transport not started")]
    NotStarted,
    #[error("radio driver not initialized")]
    NotInitialized,
    #[error("peer table full ({0} entries)")]
    PeerTableFull(usize),
    #[error("invalid channel {0}")]
    InvalidChannel(u8),
    #[error("receive callback already registered")]
    CallbackExists,
    #[error("driver error: {0}")]
    Other(String),
}

/// Station/association layer underneath the peer-messaging driver.
pub trait Transport: Send + Sync {
    /// Select the interface the radio runs in.
    fn set_mode(&self, mode: InterfaceRole) -> Result<(), DriverError>;

    /// Fix the operating channel.
    fn set_channel(&self, channel: u8) -> Result<(), DriverError>;

    /// Readiness signal, polled during boot.
    fn is_started(&self) -> bool;

    /// Local hardware address.
    fn mac_address(&self) -> MacAddr;
}

/// Connectionless peer-messaging driver.
///
/// Implementations filter frames by their peer table before invoking the
/// callback; the pipeline never re-checks the sender.
pub trait RadioDriver: Send + Sync {
    /// Bring up the peer-messaging subsystem.
    fn init(&self) -> Result<(), DriverError>;

    /// Add a peer to the driver's own peer table.
    fn register_peer(&self, peer: &PeerDescriptor) -> Result<(), DriverError>;

    /// Install the receive callback. Called once per boot.
    fn register_receive_callback(&self, callback: ReceiveCallback) -> Result<(), DriverError>;
}
