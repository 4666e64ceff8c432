//! nowlog-core — shared types, wire format, and configuration.
//! All other nowlog crates depend on this one.

pub mod config;
pub mod message;
pub mod peer;
pub mod wire;

pub use message::Message;
pub use peer::{InterfaceRole, LocalMasterKey, MacAddr, ParseMacError, PeerDescriptor};
