//! Sequence and timestamp arithmetic of the packetizer

use proptest::prelude::*;
use raop_stream::protocol::rtp::{NtpTimestamp, RtpHeader, SyncPacket};
use raop_stream::streaming::RaopStreamer;

const FRAME: [u8; 1408] = [0u8; 1408];

#[test]
fn test_sequence_wraps_after_full_cycle() {
    let mut streamer = RaopStreamer::new(0, 0, 1, 125);

    for _ in 0..65_536 {
        streamer.encode_frame(&FRAME).unwrap();
    }

    assert_eq!(streamer.sequence(), 0);
    assert_eq!(streamer.timestamp(), 65_536 * 352);
}

proptest! {
    #[test]
    fn test_headers_follow_start_values(
        sequence in any::<u16>(),
        timestamp in any::<u32>(),
        ssrc in any::<u32>(),
        frames in 1usize..64
    ) {
        let mut streamer = RaopStreamer::new(sequence, timestamp, ssrc, 125);

        for i in 0..frames {
            let packet = streamer.encode_frame(&FRAME).unwrap();
            let header = RtpHeader::decode(&packet).unwrap();
            let offset = u32::try_from(i).unwrap();

            prop_assert_eq!(header.marker, i == 0);
            prop_assert_eq!(header.ssrc, ssrc);
            prop_assert_eq!(header.sequence, sequence.wrapping_add(u16::try_from(i).unwrap()));
            prop_assert_eq!(header.timestamp, timestamp.wrapping_add(offset * 352));
        }

        let advanced = u32::try_from(frames).unwrap();
        prop_assert_eq!(streamer.timestamp(), timestamp.wrapping_add(advanced * 352));
    }

    #[test]
    fn test_sync_playing_timestamp_wraps(timestamp in any::<u32>(), latency in any::<u32>()) {
        let packet = SyncPacket::new(timestamp, latency, NtpTimestamp::from_u64(0), false);
        let decoded = SyncPacket::decode(&packet.encode()).unwrap();

        prop_assert_eq!(decoded.next_timestamp, timestamp);
        prop_assert_eq!(decoded.playing_timestamp.wrapping_add(latency), timestamp);
        prop_assert!(!decoded.first);
    }

    #[test]
    fn test_sync_due_every_n_frames(every in 1u32..20, frames in 0u32..100) {
        let mut streamer = RaopStreamer::new(0, 0, 0, every);
        let mut due = 0;
        for _ in 0..frames {
            streamer.encode_frame(&FRAME).unwrap();
            if streamer.take_sync_due() {
                due += 1;
            }
        }
        prop_assert_eq!(due, frames / every);
    }
}
