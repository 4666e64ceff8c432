//! nowlog integration test harness.
//!
//! Tests run the whole intake pipeline in-process: bootstrap against the
//! loopback radio, frames injected through the driver, records read back
//! from the storage medium. No network or privileges are required.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nowlog_core::{InterfaceRole, MacAddr, PeerDescriptor};
use nowlog_services::{
    BootError, BootOptions, Booted, BootstrapController, LoopbackRadio, Persistence,
    ReceiveDispatcher, RestartHook, StorageMedium,
};

mod bootstrap;
mod messaging;
mod storage;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const LOG_NAME: &str = "received_data.txt";
pub const CHANNEL: u8 = 6;
pub const LOCAL: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const PEER_A: MacAddr = MacAddr([0x1c, 0x69, 0x20, 0x89, 0xd9, 0x08]);
pub const PEER_B: MacAddr = MacAddr([0x1c, 0x69, 0x20, 0x89, 0xe7, 0x28]);
pub const PEER_C: MacAddr = MacAddr([0x08, 0x3a, 0xf2, 0x73, 0x08, 0x94]);

/// Records restart requests, and when they happened, instead of restarting.
#[derive(Default)]
pub struct RecordingRestart {
    pub calls: Mutex<Vec<(BootError, Instant)>>,
}

impl RecordingRestart {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn first_at(&self) -> Option<Instant> {
        self.calls.lock().unwrap().first().map(|(_, at)| *at)
    }
}

impl RestartHook for RecordingRestart {
    fn restart(&self, reason: &BootError) {
        self.calls.lock().unwrap().push((reason.clone(), Instant::now()));
    }
}

/// Fast boot options for tests.
pub fn test_options() -> BootOptions {
    BootOptions {
        mode: InterfaceRole::Station,
        channel: CHANNEL,
        ready_poll: Duration::from_millis(1),
        ready_timeout: Some(Duration::from_millis(100)),
        restart_delay: Duration::from_millis(20),
    }
}

pub fn trusted_peers() -> Vec<PeerDescriptor> {
    [PEER_A, PEER_B, PEER_C]
        .into_iter()
        .map(|addr| PeerDescriptor::station(addr, CHANNEL))
        .collect()
}

/// A booted node wired to the given medium.
pub struct Node {
    pub radio: Arc<LoopbackRadio>,
    pub dispatcher: Arc<ReceiveDispatcher>,
    pub restart: RecordingRestart,
    pub booted: Result<Booted, BootError>,
}

/// Boot a node. `prepare` runs against the radio before bootstrap so tests
/// can inject driver faults.
pub fn boot_node(
    medium: Arc<dyn StorageMedium>,
    peers: Vec<PeerDescriptor>,
    prepare: impl FnOnce(&LoopbackRadio),
) -> Node {
    let radio = Arc::new(LoopbackRadio::new(LOCAL));
    prepare(&radio);

    let dispatcher = Arc::new(ReceiveDispatcher::new(Persistence::new(medium, LOG_NAME)));
    let restart = RecordingRestart::default();
    let booted = BootstrapController::new(radio.as_ref(), radio.clone(), &restart, test_options())
        .run(peers, dispatcher.clone());

    Node {
        radio,
        dispatcher,
        restart,
        booted,
    }
}

/// Fresh temp directory standing in for a mounted card.
pub fn temp_mount(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nowlog-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Harness sanity: a default node boots and registers all three peers.
#[test]
fn test_node_boots_with_three_peers() {
    let medium = Arc::new(nowlog_services::MemoryMedium::new());
    let node = boot_node(medium, trusted_peers(), |_| {});

    let booted = node.booted.as_ref().expect("boot should succeed");
    assert_eq!(booted.registry.len(), 3);
    assert_eq!(node.radio.peer_table().len(), 3);
    assert_eq!(node.restart.count(), 0);
}
