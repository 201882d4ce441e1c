use super::*;
use std::time::Duration;

// --- packet.rs tests ---

#[test]
fn test_audio_header_layout() {
    let header = RtpHeader::audio(0x1234, 0xDEAD_BEEF, 0x0102_0304, false);
    let bytes = header.encode();

    assert_eq!(bytes[0], 0x80);
    assert_eq!(bytes[1], 96);
    assert_eq!(&bytes[2..4], &[0x12, 0x34]);
    assert_eq!(&bytes[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(&bytes[8..12], &[0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_audio_header_marker_bit() {
    let bytes = RtpHeader::audio(0, 0, 0, true).encode();
    assert_eq!(bytes[1], 0x80 | 96);
    assert!(RtpHeader::decode(&bytes).unwrap().marker);
}

#[test]
fn test_header_decode_rejects_short_and_bad_version() {
    assert_eq!(
        RtpHeader::decode(&[0x80; 4]),
        Err(RtpDecodeError::BufferTooSmall { needed: 12, have: 4 })
    );
    assert_eq!(
        RtpHeader::decode(&[0x40; 12]),
        Err(RtpDecodeError::InvalidVersion(1))
    );
}

#[test]
fn test_packet_builder_prepends_header() {
    let mut builder = RtpPacketBuilder::new();
    let header = RtpHeader::audio(7, 352, 99, false);
    let packet = builder.build(&header, &[0xAA, 0xBB, 0xCC]);

    assert_eq!(packet.len(), RtpHeader::SIZE + 3);
    assert_eq!(&packet[..12], &header.encode());
    assert_eq!(&packet[12..], &[0xAA, 0xBB, 0xCC]);

    // Buffer reuse must not leak bytes from the previous packet
    let second = builder.build(&RtpHeader::audio(8, 704, 99, false), &[0x01]);
    assert_eq!(second.len(), 13);
    assert_eq!(packet[12], 0xAA);
}

// --- ntp.rs tests ---

#[test]
fn test_ntp_from_unix_epoch() {
    let ts = NtpTimestamp::from_unix_duration(Duration::ZERO);
    assert_eq!(u64::from(ts.seconds), NtpTimestamp::NTP_UNIX_OFFSET);
    assert_eq!(ts.fraction, 0);
}

#[test]
fn test_ntp_half_second_fraction() {
    let ts = NtpTimestamp::from_unix_duration(Duration::from_millis(1500));
    assert_eq!(u64::from(ts.seconds), NtpTimestamp::NTP_UNIX_OFFSET + 1);
    assert_eq!(ts.fraction, 0x8000_0000);
}

#[test]
fn test_ntp_pack_unpack() {
    let ts = NtpTimestamp {
        seconds: 0xE000_0001,
        fraction: 0x1234_5678,
    };
    assert_eq!(ts.to_u64(), 0xE000_0001_1234_5678);
    assert_eq!(NtpTimestamp::from_u64(ts.to_u64()), ts);
    assert_eq!(NtpTimestamp::decode(&ts.encode()), Some(ts));
    assert_eq!(NtpTimestamp::decode(&[0u8; 7]), None);
}

#[test]
fn test_ntp_now_is_after_2020() {
    // 2020-01-01 in NTP seconds
    assert!(NtpTimestamp::now().seconds > 3_786_825_600);
}

// --- sync.rs tests ---

#[test]
fn test_sync_packet_layout() {
    let ntp = NtpTimestamp {
        seconds: 1,
        fraction: 2,
    };
    let bytes = SyncPacket::new(100_000, 11025, ntp, true).encode();

    assert_eq!(bytes.len(), 20);
    assert_eq!(bytes[0], 0x90);
    assert_eq!(bytes[1], 0xD4);
    assert_eq!(&bytes[2..4], &[0x07, 0x00]);
    assert_eq!(&bytes[4..8], &(100_000u32 - 11025).to_be_bytes());
    assert_eq!(&bytes[8..16], &ntp.encode());
    assert_eq!(&bytes[16..20], &100_000u32.to_be_bytes());
}

#[test]
fn test_sync_packet_not_first() {
    let bytes = SyncPacket::new(0, 0, NtpTimestamp::default(), false).encode();
    assert_eq!(bytes[0], 0x80);
}

#[test]
fn test_sync_packet_latency_wraps() {
    let packet = SyncPacket::new(100, 11025, NtpTimestamp::default(), false);
    assert_eq!(packet.playing_timestamp, 100u32.wrapping_sub(11025));
    assert_eq!(SyncPacket::decode(&packet.encode()).unwrap(), packet);
}

// --- timing.rs tests ---

#[test]
fn test_timing_reply_echoes_origin() {
    let mut request = [0u8; 32];
    request[0] = 0x80;
    request[1] = 0xD2;
    request[24..32].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);

    let now = NtpTimestamp {
        seconds: 0x0102_0304,
        fraction: 0x0506_0708,
    };
    let reply = timing_reply(&request, now).unwrap();

    assert_eq!(reply[0], 0x80);
    assert_eq!(reply[1], 0xD3);
    assert_eq!(&reply[2..4], &[0, 0]);
    assert_eq!(&reply[8..16], &[0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);
    assert_eq!(&reply[16..24], &now.encode());
    assert_eq!(&reply[24..32], &now.encode());
}

#[test]
fn test_timing_reply_ignores_other_packets() {
    let mut short = [0u8; 31];
    short[0] = 0x80;
    short[1] = 0xD2;
    assert!(timing_reply(&short, NtpTimestamp::now()).is_none());

    let mut wrong_type = [0u8; 32];
    wrong_type[0] = 0x80;
    wrong_type[1] = 0xD4;
    assert!(timing_reply(&wrong_type, NtpTimestamp::now()).is_none());
}

#[test]
fn test_timing_request_round_trip() {
    let sent = NtpTimestamp {
        seconds: 42,
        fraction: 7,
    };
    let request = TimingPacket::request(sent);
    let parsed = TimingPacket::parse_request(request.as_bytes()).unwrap();
    assert_eq!(parsed.transmit_time(), sent);
}
