//! nowlog-services — the peer-trust and message-intake pipeline.
//!
//! Bootstrap registers trusted peers with the radio driver, hands the driver
//! a receive callback, and every frame that arrives is appended to the log
//! on the storage medium.

pub mod bootstrap;
pub mod dispatcher;
pub mod driver;
pub mod loopback;
pub mod medium;
pub mod memory;
pub mod persistence;
pub mod registry;

pub use bootstrap::{BootError, BootOptions, Booted, BootstrapController, RestartHook};
pub use dispatcher::{DispatchStats, ReceiveDispatcher};
pub use driver::{DriverError, RadioDriver, ReceiveCallback, Transport};
pub use loopback::LoopbackRadio;
pub use medium::{AppendHandle, DirMedium, StorageMedium, Volume};
pub use memory::MemoryMedium;
pub use persistence::{Persistence, PersistenceError};
pub use registry::{PeerRegistry, PopulateSummary, RegistryError};
