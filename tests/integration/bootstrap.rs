use crate::*;
use nowlog_services::MemoryMedium;

/// Messaging init failure: exactly one restart, no peer registration.
#[test]
fn test_init_failure_triggers_single_restart() {
    let medium = Arc::new(MemoryMedium::new());
    let node = boot_node(medium, trusted_peers(), |radio| radio.fail_init());

    assert!(matches!(node.booted, Err(BootError::TransportInitFailed(_))));
    assert_eq!(node.restart.count(), 1);
    assert_eq!(node.radio.init_calls(), 1);
    assert_eq!(node.radio.register_attempts(), 0);
    assert_eq!(node.radio.callback_registrations(), 0);
}

/// The restart fires only after the configured delay has passed since the
/// failed init.
#[test]
fn test_restart_is_delayed() {
    let medium = Arc::new(MemoryMedium::new());
    let node = boot_node(medium, trusted_peers(), |radio| radio.fail_init());

    assert_eq!(node.restart.count(), 1);
    let failed_at = node.radio.last_init_at().expect("init was attempted");
    let restarted_at = node.restart.first_at().expect("restart was requested");
    assert!(restarted_at.duration_since(failed_at) >= test_options().restart_delay);
}

/// A transport that comes up late is waited for, not treated as failure.
#[test]
fn test_slow_transport_is_polled_until_ready() {
    let medium = Arc::new(MemoryMedium::new());
    let node = boot_node(medium, trusted_peers(), |radio| radio.delay_start(5));

    assert!(node.booted.is_ok());
    assert_eq!(node.radio.ready_polls(), 6);
    assert_eq!(node.restart.count(), 0);
}

/// A transport that never comes up is bounded by the ready timeout.
#[test]
fn test_dead_transport_times_out_and_restarts() {
    let medium = Arc::new(MemoryMedium::new());
    let node = boot_node(medium, trusted_peers(), |radio| radio.never_start());

    assert!(matches!(node.booted, Err(BootError::TransportNotReady(_))));
    assert_eq!(node.radio.init_calls(), 0);
    assert_eq!(node.restart.count(), 1);
}

/// Duplicate configuration entries are skipped, the rest register.
#[test]
fn test_duplicate_config_entries_are_skipped() {
    let medium = Arc::new(MemoryMedium::new());
    let mut peers = trusted_peers();
    peers.push(PeerDescriptor::station(PEER_A, CHANNEL));

    let node = boot_node(medium, peers, |_| {});
    let booted = node.booted.as_ref().expect("duplicates are not fatal");
    assert_eq!(booted.registry.len(), 3);
    assert_eq!(booted.summary.duplicates, 1);
    assert_eq!(node.radio.register_attempts(), 3);
}

/// Configured peers flow from TOML into the driver's table in order.
#[test]
fn test_config_peers_reach_driver() -> anyhow::Result<()> {
    let config: nowlog_core::config::NowlogConfig = toml_config(
        r#"
        [radio]
        channel = 6

        [[peers]]
        address = "1c:69:20:89:d9:08"

        [[peers]]
        address = "08:3a:f2:73:08:94"
        lmk = "00112233445566778899aabbccddeeff"
        "#,
    )?;
    let medium = Arc::new(MemoryMedium::new());
    let node = boot_node(medium, config.peer_descriptors()?, |_| {});

    let table = node.radio.peer_table();
    assert_eq!(table.len(), 2);
    assert_eq!(table[0].address(), PEER_A);
    assert_eq!(table[1].address(), PEER_C);
    assert!(table[1].encrypt());
    Ok(())
}

fn toml_config(text: &str) -> anyhow::Result<nowlog_core::config::NowlogConfig> {
    let dir = temp_mount("config");
    let path = dir.join("config.toml");
    std::fs::write(&path, text)?;
    let config = nowlog_core::config::NowlogConfig::from_file(&path)?;
    let _ = std::fs::remove_dir_all(&dir);
    Ok(config)
}
