//! In-process radio — a transport and driver with no hardware behind it.
//!
//! Frames are injected with [`LoopbackRadio::deliver`] and run through the
//! same filtering a real driver applies (registered callback, peer table,
//! operating channel) before the callback sees them. Failure knobs let
//! callers reproduce a driver that refuses to initialize or rejects peers.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use nowlog_core::{InterfaceRole, MacAddr, PeerDescriptor};

use crate::driver::{DriverError, RadioDriver, ReceiveCallback, Transport};

/// Peer table capacity of the reference radio.
pub const MAX_PEERS: usize = 20;

#[derive(Default)]
struct LoopbackState {
    mode: Option<InterfaceRole>,
    channel: Option<u8>,
    /// `is_started` reports false this many times first.
    start_delay_polls: usize,
    never_start: bool,
    ready_polls: usize,
    fail_init: bool,
    initialized: bool,
    init_calls: usize,
    last_init_at: Option<Instant>,
    rejected: HashSet<MacAddr>,
    register_attempts: usize,
    peers: Vec<PeerDescriptor>,
    callback: Option<ReceiveCallback>,
    callback_registrations: usize,
}

pub struct LoopbackRadio {
    mac: MacAddr,
    state: Mutex<LoopbackState>,
}

impl LoopbackRadio {
    pub fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            state: Mutex::new(LoopbackState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Failure knobs ─────────────────────────────────────────────────────────

    /// Make `init` fail.
    pub fn fail_init(&self) {
        self.lock().fail_init = true;
    }

    /// Make `register_peer` refuse this address.
    pub fn reject_peer(&self, addr: MacAddr) {
        self.lock().rejected.insert(addr);
    }

    /// Report not-started for the first `polls` readiness checks.
    pub fn delay_start(&self, polls: usize) {
        self.lock().start_delay_polls = polls;
    }

    /// Never report the transport as started.
    pub fn never_start(&self) {
        self.lock().never_start = true;
    }

    // ── Observations ──────────────────────────────────────────────────────────

    pub fn mode(&self) -> Option<InterfaceRole> {
        self.lock().mode
    }

    pub fn channel(&self) -> Option<u8> {
        self.lock().channel
    }

    pub fn ready_polls(&self) -> usize {
        self.lock().ready_polls
    }

    pub fn init_calls(&self) -> usize {
        self.lock().init_calls
    }

    /// When `init` was last called, successful or not.
    pub fn last_init_at(&self) -> Option<Instant> {
        self.lock().last_init_at
    }

    pub fn register_attempts(&self) -> usize {
        self.lock().register_attempts
    }

    pub fn callback_registrations(&self) -> usize {
        self.lock().callback_registrations
    }

    /// The driver-side peer table.
    pub fn peer_table(&self) -> Vec<PeerDescriptor> {
        self.lock().peers.clone()
    }

    // ── Frame injection ───────────────────────────────────────────────────────

    /// Simulate a frame arriving on `channel` from `src`.
    ///
    /// Returns whether the frame reached the callback.
    pub fn deliver_on(&self, src: MacAddr, channel: u8, data: &[u8]) -> bool {
        let callback = {
            let state = self.lock();
            if state.channel != Some(channel) {
                tracing::trace!(%src, channel, "frame on foreign channel dropped");
                return false;
            }
            if !state.peers.iter().any(|p| p.address() == src) {
                tracing::trace!(%src, "frame from unknown peer dropped");
                return false;
            }
            match &state.callback {
                Some(cb) => cb.clone(),
                None => return false,
            }
        };
        // The lock is released first so the callback may take as long as it needs.
        callback(src, data, data.len());
        true
    }

    /// Simulate a frame arriving on the operating channel.
    pub fn deliver(&self, src: MacAddr, data: &[u8]) -> bool {
        let channel = self.lock().channel.unwrap_or_default();
        self.deliver_on(src, channel, data)
    }
}

impl Transport for LoopbackRadio {
    fn set_mode(&self, mode: InterfaceRole) -> Result<(), DriverError> {
        self.lock().mode = Some(mode);
        Ok(())
    }

    fn set_channel(&self, channel: u8) -> Result<(), DriverError> {
        if channel == 0 || channel > 14 {
            return Err(DriverError::InvalidChannel(channel));
        }
        self.lock().channel = Some(channel);
        Ok(())
    }

    fn is_started(&self) -> bool {
        let mut state = self.lock();
        state.ready_polls += 1;
        if state.never_start || state.mode.is_none() {
            return false;
        }
        if state.start_delay_polls > 0 {
            state.start_delay_polls -= 1;
            return false;
        }
        true
    }

    fn mac_address(&self) -> MacAddr {
        self.mac
    }
}

impl RadioDriver for LoopbackRadio {
    fn init(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.init_calls += 1;
        state.last_init_at = Some(Instant::now());
        if state.fail_init {
            return Err(DriverError::Other("init refused".into()));
        }
        if state.mode.is_none() {
            return Err(DriverError::NotStarted);
        }
        state.initialized = true;
        Ok(())
    }

    fn register_peer(&self, peer: &PeerDescriptor) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.register_attempts += 1;
        if !state.initialized {
            return Err(DriverError::NotInitialized);
        }
        if state.rejected.contains(&peer.address()) {
            return Err(DriverError::Other(format!("peer {} refused", peer.address())));
        }
        if state.peers.len() >= MAX_PEERS {
            return Err(DriverError::PeerTableFull(MAX_PEERS));
        }
        state.peers.push(peer.clone());
        Ok(())
    }

    fn register_receive_callback(&self, callback: ReceiveCallback) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.callback_registrations += 1;
        if !state.initialized {
            return Err(DriverError::NotInitialized);
        }
        if state.callback.is_some() {
            return Err(DriverError::CallbackExists);
        }
        state.callback = Some(callback);
        Ok(())
    }
}
