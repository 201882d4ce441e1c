use super::*;

fn announce() -> String {
    AnnounceSdp {
        session_id: "123456789",
        client_ip: "192.168.1.10",
        host: "192.168.1.50",
        latency_samples: 11025,
    }
    .encode()
}

#[test]
fn test_announce_sdp_lines_in_order() {
    let binding = announce();
    let lines: Vec<&str> = binding.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(
        lines,
        vec![
            "v=0",
            "o=iTunes 123456789 0 IN IP4 192.168.1.10",
            "s=iTunes",
            "c=IN IP4 192.168.1.50",
            "t=0 0",
            "m=audio 0 RTP/AVP 96",
            "a=rtpmap:96 AppleLossless",
            "a=fmtp:96 352 0 16 40 10 14 2 255 0 0 44100",
            "a=min-latency:11025",
        ]
    );
    assert!(announce().ends_with("\r\n"));
}

#[test]
fn test_announce_sdp_ipv6_client() {
    let sdp = AnnounceSdp {
        session_id: "1",
        client_ip: "fe80::1",
        host: "fe80::2",
        latency_samples: 0,
    }
    .encode();
    assert!(sdp.contains("o=iTunes 1 0 IN IP6 fe80::1\r\n"));
    assert!(sdp.contains("c=IN IP6 fe80::2\r\n"));
}

#[test]
fn test_announced_stream_fields() {
    let stream = AnnouncedStream::parse(&announce()).unwrap();

    assert_eq!(stream.session_id.as_deref(), Some("123456789"));
    assert_eq!(stream.rtpmap.as_deref(), Some(AnnounceSdp::RTPMAP));
    assert_eq!(stream.fmtp.as_deref(), Some(AnnounceSdp::FMTP));
    assert_eq!(stream.min_latency, Some(11025));
}

#[test]
fn test_announced_stream_skips_unknown_and_malformed_lines() {
    let text = "v=0\r\nbogus\r\nx=whatever\r\nm=audio 0 RTP/AVP 96\r\na=recvonly\r\na=min-latency:abc\r\n";
    let stream = AnnouncedStream::parse(text).unwrap();
    assert_eq!(stream, AnnouncedStream::default());
}

#[test]
fn test_announced_stream_requires_audio() {
    assert!(AnnouncedStream::parse("v=0\r\ns=x\r\nm=video 0 RTP/AVP 96\r\n").is_none());
    assert!(AnnouncedStream::parse("").is_none());
}
