use crate::*;
use nowlog_services::{DirMedium, MemoryMedium, PersistenceError};

/// A card that is pulled loses the messages sent meanwhile, nothing else.
#[test]
fn test_removed_medium_drops_only_its_messages() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});

    node.radio.deliver(PEER_A, b"before");
    medium.set_available(false);
    node.radio.deliver(PEER_A, b"during");
    medium.set_available(true);
    node.radio.deliver(PEER_A, b"after");

    assert_eq!(medium.lines(LOG_NAME), vec!["before", "after"]);
    let stats = node.dispatcher.stats();
    assert_eq!((stats.received(), stats.persisted(), stats.dropped()), (3, 2, 1));
    assert_eq!(medium.acquisitions(), medium.releases());
}

/// Records written before a power cycle are preserved and appended after.
#[test]
fn test_power_cycle_appends_after_existing_records() {
    let mount = temp_mount("power-cycle");

    for (boot, text) in [(1, "first boot"), (2, "second boot")] {
        let node = boot_node(Arc::new(DirMedium::new(&mount)), trusted_peers(), |_| {});
        assert!(node.booted.is_ok(), "boot {boot} failed");
        assert!(node.radio.deliver(PEER_C, text.as_bytes()));
    }

    let log = std::fs::read_to_string(mount.join(LOG_NAME)).unwrap();
    assert_eq!(log, "first boot\nsecond boot\n");
    let _ = std::fs::remove_dir_all(&mount);
}

/// A mount point that vanishes reports MediumUnavailable and writes nothing.
#[test]
fn test_missing_mount_point_is_medium_unavailable() {
    let mount = temp_mount("vanish");
    let persistence = Persistence::new(Arc::new(DirMedium::new(&mount)), LOG_NAME);
    persistence.append(b"kept").unwrap();

    let parked = mount.with_extension("parked");
    let _ = std::fs::remove_dir_all(&parked);
    std::fs::rename(&mount, &parked).unwrap();

    let err = persistence.append(b"lost").unwrap_err();
    assert!(matches!(err, PersistenceError::MediumUnavailable(_)));
    assert!(!mount.exists());

    std::fs::rename(&parked, &mount).unwrap();
    persistence.append(b"back").unwrap();
    let log = std::fs::read_to_string(mount.join(LOG_NAME)).unwrap();
    assert_eq!(log, "kept\nback\n");

    let _ = std::fs::remove_dir_all(&mount);
}

/// Messages arriving before the card is inserted are dropped; the log is
/// created on the first successful append.
#[test]
fn test_log_created_on_first_append() {
    let medium = MemoryMedium::new();
    medium.set_available(false);
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});

    node.radio.deliver(PEER_B, b"too early");
    assert!(!medium.exists(LOG_NAME));

    medium.set_available(true);
    node.radio.deliver(PEER_B, b"on time");
    assert_eq!(medium.lines(LOG_NAME), vec!["on time"]);
}
