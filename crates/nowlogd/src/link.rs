//! UDP link — a host-side stand-in for the peer-messaging radio.
//!
//! Frames travel as UDP datagrams on a loopback port (see
//! `nowlog_core::wire`). The link plays both collaborator roles: it is the
//! transport (mode, channel, readiness) and the driver (peer table, receive
//! callback). Like the radio it replaces, it only hands frames to the
//! callback when they come from a registered peer on the operating channel,
//! and it calls back from its own task, not from the main loop.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;

use nowlog_core::wire::{decode_frame, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
use nowlog_core::{InterfaceRole, MacAddr, PeerDescriptor};
use nowlog_services::{DriverError, RadioDriver, ReceiveCallback, Transport};

/// Peer table capacity, matching the radio this stands in for.
pub const MAX_PEERS: usize = 20;

/// Pause after the first receive error; doubles per consecutive error.
const RECV_RETRY_BASE: Duration = Duration::from_millis(10);
const RECV_RETRY_MAX: Duration = Duration::from_secs(1);

/// State shared with the receive task.
struct Shared {
    channel: AtomicU8,
    peers: DashMap<MacAddr, PeerDescriptor>,
    callback: OnceLock<ReceiveCallback>,
}

pub struct UdpLink {
    mac: MacAddr,
    port: u16,
    runtime: Handle,
    mode: Mutex<Option<InterfaceRole>>,
    socket: Mutex<Option<std::net::UdpSocket>>,
    started: AtomicBool,
    initialized: AtomicBool,
    shared: Arc<Shared>,
}

impl UdpLink {
    pub fn new(mac: MacAddr, port: u16, runtime: Handle) -> Self {
        Self {
            mac,
            port,
            runtime,
            mode: Mutex::new(None),
            socket: Mutex::new(None),
            started: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            shared: Arc::new(Shared {
                channel: AtomicU8::new(0),
                peers: DashMap::new(),
                callback: OnceLock::new(),
            }),
        }
    }
}

impl Transport for UdpLink {
    fn set_mode(&self, mode: InterfaceRole) -> Result<(), DriverError> {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = Some(mode);

        let mut socket = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        if socket.is_none() && !self.initialized.load(Ordering::Acquire) {
            let bound = make_link_socket(self.port).map_err(|e| DriverError::Other(format!("{e:#}")))?;
            *socket = Some(bound);
            self.started.store(true, Ordering::Release);
            tracing::debug!(port = self.port, %mode, "link socket bound");
        }
        Ok(())
    }

    fn set_channel(&self, channel: u8) -> Result<(), DriverError> {
        if !(1..=14).contains(&channel) {
            return Err(DriverError::InvalidChannel(channel));
        }
        self.shared.channel.store(channel, Ordering::Relaxed);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn mac_address(&self) -> MacAddr {
        self.mac
    }
}

impl RadioDriver for UdpLink {
    fn init(&self) -> Result<(), DriverError> {
        let socket = self
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DriverError::NotStarted)?;

        let socket = {
            let _guard = self.runtime.enter();
            UdpSocket::from_std(socket).map_err(|e| DriverError::Other(e.to_string()))?
        };
        self.runtime
            .spawn(receive_loop(socket, self.shared.clone()));
        self.initialized.store(true, Ordering::Release);
        tracing::info!(port = self.port, "link receiver started");
        Ok(())
    }

    fn register_peer(&self, peer: &PeerDescriptor) -> Result<(), DriverError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(DriverError::NotInitialized);
        }
        if self.shared.peers.contains_key(&peer.address()) {
            return Err(DriverError::Other(format!("peer {} exists", peer.address())));
        }
        if self.shared.peers.len() >= MAX_PEERS {
            return Err(DriverError::PeerTableFull(MAX_PEERS));
        }
        self.shared.peers.insert(peer.address(), peer.clone());
        tracing::debug!(
            peer = %peer.address(),
            channel = peer.channel(),
            interface = %peer.interface(),
            encrypt = peer.encrypt(),
            "peer added to link table"
        );
        Ok(())
    }

    fn register_receive_callback(&self, callback: ReceiveCallback) -> Result<(), DriverError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(DriverError::NotInitialized);
        }
        self.shared
            .callback
            .set(callback)
            .map_err(|_| DriverError::CallbackExists)
    }
}

/// Receive datagrams, filter them like the radio would, and invoke the
/// callback.
///
/// Runs until the runtime shuts down.
async fn receive_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut buf = vec![0u8; FRAME_HEADER_LEN + MAX_PAYLOAD_LEN];
    let mut failures = 0u32;

    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(r) => {
                failures = 0;
                r
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let pause = recv_backoff(failures);
                tracing::warn!(error = %e, failures, ?pause, "recv_from failed");
                tokio::time::sleep(pause).await;
                continue;
            }
        };

        let (header, payload) = match decode_frame(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, %from, "malformed frame dropped");
                continue;
            }
        };

        let src = header.source();
        let channel = header.channel;
        if channel != shared.channel.load(Ordering::Relaxed) {
            tracing::trace!(%src, channel, "frame on foreign channel dropped");
            continue;
        }

        let encrypt = match shared.peers.get(&src) {
            Some(peer) => peer.encrypt(),
            None => {
                tracing::trace!(%src, "frame from unknown peer dropped");
                continue;
            }
        };
        if encrypt && !header.is_encrypted() {
            tracing::warn!(%src, "plaintext frame from encrypted peer dropped");
            continue;
        }

        let Some(callback) = shared.callback.get() else {
            tracing::trace!(%src, "no receive callback registered");
            continue;
        };

        let declared = header.length() as usize;
        tokio::task::block_in_place(|| callback(src, payload, declared));
    }
}

/// How long to wait after `failures` consecutive receive errors.
fn recv_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    RECV_RETRY_BASE
        .saturating_mul(1 << shift)
        .min(RECV_RETRY_MAX)
}

/// Create the UDP socket the link listens on.
fn make_link_socket(port: u16) -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
    socket
        .bind(&bind_addr.into())
        .with_context(|| format!("bind() to {bind_addr}"))?;

    Ok(socket.into())
}
