use super::*;
use std::time::Duration;

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = RaopConfig::default();

    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.latency_samples, 11025);
    assert_eq!(config.sync_every_frames, 125);
    assert!(config.sync_interval.is_none());
    assert_eq!(config.initial_volume, Some(0.66));
    assert_eq!(config.control_port, 0);
    assert!(config.auth_setup);
    assert_eq!(config.backpressure, BackpressurePolicy::DropOldest);
}

#[test]
fn test_config_builder() {
    let config = RaopConfig::builder()
        .user_agent("test/1.0")
        .request_timeout(None)
        .latency_samples(22050)
        .sync_interval(Duration::from_secs(3))
        .initial_volume(None)
        .local_ports(6001, 6002, 6000)
        .silence_frames(10, 250)
        .pin("1234")
        .auth_setup(false)
        .capture_queue(8, BackpressurePolicy::Block)
        .build();

    assert_eq!(config.user_agent, "test/1.0");
    assert!(config.request_timeout.is_none());
    assert_eq!(config.latency_samples, 22050);
    assert_eq!(config.sync_interval, Some(Duration::from_secs(3)));
    assert!(config.initial_volume.is_none());
    assert_eq!(
        (config.control_port, config.timing_port, config.audio_port),
        (6001, 6002, 6000)
    );
    assert_eq!(config.pre_record_silence_frames, 10);
    assert_eq!(config.post_record_silence_frames, 250);
    assert_eq!(config.pin.as_deref(), Some("1234"));
    assert!(!config.auth_setup);
    assert_eq!(config.capture_queue_capacity, 8);
    assert_eq!(config.backpressure, BackpressurePolicy::Block);
}

#[test]
fn test_config_builder_clamps_zero_values() {
    let config = RaopConfig::builder()
        .sync_every_frames(0)
        .capture_queue(0, BackpressurePolicy::DropOldest)
        .build();

    assert_eq!(config.sync_every_frames, 1);
    assert_eq!(config.capture_queue_capacity, 1);
}

// --- receiver.rs tests ---

#[test]
fn test_receiver_authority() {
    let receiver = ReceiverInfo::new("Kitchen", "192.168.1.20", 7000);
    assert_eq!(receiver.authority(), "192.168.1.20:7000");
    assert_eq!(receiver.to_string(), "Kitchen (192.168.1.20:7000)");
}

#[test]
fn test_receiver_authority_ipv6() {
    let receiver = ReceiverInfo::new("Den", "fe80::1", 5000);
    assert_eq!(receiver.authority(), "[fe80::1]:5000");
}
