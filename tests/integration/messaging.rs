use crate::*;
use nowlog_services::MemoryMedium;

/// Peers {A, B, C}: "hello" from A then "world" from B lands as two lines.
#[test]
fn test_hello_world_from_two_peers() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});
    assert!(node.booted.is_ok());

    assert!(node.radio.deliver(PEER_A, b"hello"));
    assert_eq!(medium.lines(LOG_NAME), vec!["hello"]);

    assert!(node.radio.deliver(PEER_B, b"world"));
    assert_eq!(medium.lines(LOG_NAME), vec!["hello", "world"]);
    assert_eq!(medium.contents(LOG_NAME), b"hello\nworld\n");
}

/// Rapid consecutive frames become separate records in arrival order.
#[test]
fn test_rapid_frames_keep_order() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});

    for i in 0..50 {
        let peer = if i % 2 == 0 { PEER_A } else { PEER_C };
        assert!(node.radio.deliver(peer, format!("msg-{i}").as_bytes()));
    }

    let lines = medium.lines(LOG_NAME);
    let expected: Vec<String> = (0..50).map(|i| format!("msg-{i}")).collect();
    assert_eq!(lines, expected);
    assert_eq!(node.dispatcher.stats().persisted(), 50);
}

/// The driver filters strangers and foreign channels; nothing reaches the log.
#[test]
fn test_unregistered_sender_is_never_logged() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});

    let stranger = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
    assert!(!node.radio.deliver(stranger, b"intruder"));
    assert!(!node.radio.deliver_on(PEER_A, 11, b"wrong channel"));

    assert!(!medium.exists(LOG_NAME));
    assert_eq!(node.dispatcher.stats().received(), 0);
}

/// A peer the driver refused stays in the registry but cannot deliver.
#[test]
fn test_driver_rejected_peer_is_kept_but_unreachable() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |radio| {
        radio.reject_peer(PEER_B)
    });

    let booted = node.booted.as_ref().expect("rejection is not fatal");
    assert_eq!(booted.registry.len(), 3);
    assert!(booted.registry.contains(&PEER_B));
    assert_eq!(booted.summary.rejected, 1);

    assert!(!node.radio.deliver(PEER_B, b"unheard"));
    assert!(node.radio.deliver(PEER_A, b"heard"));
    assert_eq!(medium.lines(LOG_NAME), vec!["heard"]);
}

/// Payload bytes after a NUL never reach the log; bytes before it do, as-is.
#[test]
fn test_payload_cut_at_terminator() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});

    node.radio.deliver(PEER_A, b"sensor=\xb0C\0padding");
    assert_eq!(medium.contents(LOG_NAME), b"sensor=\xb0C\n");
}

/// Frames delivered from several driver threads still produce whole lines.
#[test]
fn test_concurrent_delivery_never_merges_lines() {
    let medium = MemoryMedium::new();
    let node = boot_node(Arc::new(medium.clone()), trusted_peers(), |_| {});
    let radio = node.radio.clone();

    let workers: Vec<_> = [PEER_A, PEER_B, PEER_C]
        .into_iter()
        .map(|peer| {
            let radio = radio.clone();
            std::thread::spawn(move || {
                for i in 0..20 {
                    radio.deliver(peer, format!("{peer}/{i}").as_bytes());
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let lines = medium.lines(LOG_NAME);
    assert_eq!(lines.len(), 60);
    for peer in [PEER_A, PEER_B, PEER_C] {
        let own: Vec<&String> = lines
            .iter()
            .filter(|l| l.starts_with(&peer.to_string()))
            .collect();
        assert_eq!(own.len(), 20);
        // Per-peer order survives interleaving across peers.
        for (i, line) in own.iter().enumerate() {
            assert_eq!(**line, format!("{peer}/{i}"));
        }
    }
}
