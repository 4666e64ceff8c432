//! Bootstrap — bring the radio up and wire the intake pipeline into it.
//!
//! Order matters: transport mode and channel, wait for the transport,
//! initialize peer messaging, register the configured peers, and only then
//! install the receive callback. Frames can therefore never arrive while the
//! registry is still being written.
//!
//! A failure before the callback is installed is fatal. The controller waits
//! the configured delay and asks its [`RestartHook`] for a full restart,
//! once, without backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nowlog_core::config::RadioConfig;
use nowlog_core::{InterfaceRole, MacAddr, PeerDescriptor};

use crate::dispatcher::ReceiveDispatcher;
use crate::driver::{DriverError, RadioDriver, Transport};
use crate::registry::{PeerRegistry, PopulateSummary};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    #[error("failed to configure radio transport: {0}")]
    TransportSetupFailed(DriverError),
    #[error("radio transport not ready after {0:?}")]
    TransportNotReady(Duration),
    #[error("failed to initialize peer messaging: {0}")]
    TransportInitFailed(DriverError),
    #[error("failed to register receive callback: {0}")]
    CallbackRejected(DriverError),
}

/// Performs the full process restart after a fatal boot error.
pub trait RestartHook: Send + Sync {
    fn restart(&self, reason: &BootError);
}

#[derive(Debug, Clone)]
pub struct BootOptions {
    pub mode: InterfaceRole,
    pub channel: u8,
    pub ready_poll: Duration,
    /// `None` polls forever.
    pub ready_timeout: Option<Duration>,
    pub restart_delay: Duration,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self::from(&RadioConfig::default())
    }
}

impl From<&RadioConfig> for BootOptions {
    fn from(radio: &RadioConfig) -> Self {
        Self {
            mode: radio.mode,
            channel: radio.channel,
            ready_poll: Duration::from_millis(radio.ready_poll_ms),
            ready_timeout: match radio.ready_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            restart_delay: Duration::from_millis(radio.restart_delay_ms),
        }
    }
}

/// A radio that is up, with peers registered and the callback installed.
pub struct Booted {
    pub local_address: MacAddr,
    pub registry: PeerRegistry,
    pub summary: PopulateSummary,
}

pub struct BootstrapController<'a> {
    transport: &'a dyn Transport,
    driver: Arc<dyn RadioDriver>,
    restart: &'a dyn RestartHook,
    options: BootOptions,
}

impl<'a> BootstrapController<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        driver: Arc<dyn RadioDriver>,
        restart: &'a dyn RestartHook,
        options: BootOptions,
    ) -> Self {
        Self {
            transport,
            driver,
            restart,
            options,
        }
    }

    /// Run the boot sequence. Blocks while polling and during the restart
    /// delay.
    ///
    /// On error the restart hook has already been invoked.
    pub fn run(
        self,
        peers: Vec<PeerDescriptor>,
        dispatcher: Arc<ReceiveDispatcher>,
    ) -> Result<Booted, BootError> {
        match self.boot(peers, dispatcher) {
            Ok(booted) => Ok(booted),
            Err(e) => {
                self.escalate(&e);
                Err(e)
            }
        }
    }

    fn boot(
        &self,
        peers: Vec<PeerDescriptor>,
        dispatcher: Arc<ReceiveDispatcher>,
    ) -> Result<Booted, BootError> {
        self.transport
            .set_mode(self.options.mode)
            .map_err(BootError::TransportSetupFailed)?;
        self.transport
            .set_channel(self.options.channel)
            .map_err(BootError::TransportSetupFailed)?;
        self.wait_until_started()?;

        let local_address = self.transport.mac_address();
        tracing::info!(
            mode = %self.options.mode,
            mac = %local_address,
            channel = self.options.channel,
            "radio transport started"
        );

        self.driver.init().map_err(BootError::TransportInitFailed)?;

        let mut registry = PeerRegistry::new(self.driver.clone());
        let summary = registry.populate(peers);
        tracing::info!(
            registered = summary.registered,
            rejected = summary.rejected,
            duplicates = summary.duplicates,
            "peer table populated"
        );

        self.driver
            .register_receive_callback(dispatcher.into_callback())
            .map_err(BootError::CallbackRejected)?;

        tracing::info!("setup complete, waiting for messages");
        Ok(Booted {
            local_address,
            registry,
            summary,
        })
    }

    fn wait_until_started(&self) -> Result<(), BootError> {
        let started = Instant::now();
        while !self.transport.is_started() {
            if let Some(limit) = self.options.ready_timeout {
                if started.elapsed() >= limit {
                    return Err(BootError::TransportNotReady(limit));
                }
            }
            std::thread::sleep(self.options.ready_poll);
        }
        Ok(())
    }

    fn escalate(&self, error: &BootError) {
        tracing::error!(error = %error, "radio bootstrap failed");
        tracing::warn!(
            delay_ms = self.options.restart_delay.as_millis() as u64,
            "restarting"
        );
        std::thread::sleep(self.options.restart_delay);
        self.restart.restart(error);
    }
}
