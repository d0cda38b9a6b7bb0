// File: saybot-core/src/platforms/discord/dca.rs
//
// DCA1 framing: magic, a little-endian i32 metadata length, JSON metadata, then
// every Opus packet prefixed with its length as a little-endian i16. Songbird
// plays this format by passing the packets straight through.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::json;

use saybot_common::error::VoiceError;

use crate::audio::{CHANNELS, FRAME_SIZE, SAMPLE_RATE};

pub const MAGIC: &[u8; 4] = b"DCA1";

pub fn header() -> Result<Bytes, VoiceError> {
    let metadata = json!({
        "dca": {
            "version": 1,
            "tool": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "url": null,
                "author": null
            }
        },
        "opus": {
            "mode": "voip",
            "sample_rate": SAMPLE_RATE,
            "frame_size": FRAME_SIZE,
            "abr": null,
            "vbr": true,
            "channels": CHANNELS
        },
        "info": null,
        "origin": null,
        "extra": null
    });

    let metadata = serde_json::to_vec(&metadata)
        .map_err(|e| VoiceError::Transport(format!("couldn't write stream header: {e}")))?;
    let len = i32::try_from(metadata.len())
        .map_err(|_| VoiceError::Transport("stream header too large".into()))?;

    let mut buf = BytesMut::with_capacity(MAGIC.len() + 4 + metadata.len());
    buf.put_slice(MAGIC);
    buf.put_i32_le(len);
    buf.put_slice(&metadata);
    Ok(buf.freeze())
}

/// One length-prefixed packet.
pub fn frame(packet: &[u8]) -> Result<Bytes, VoiceError> {
    let len = i16::try_from(packet.len()).map_err(|_| {
        VoiceError::Transport(format!("{} byte packet can't be framed", packet.len()))
    })?;

    let mut buf = BytesMut::with_capacity(2 + packet.len());
    buf.put_i16_le(len);
    buf.put_slice(packet);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn header_carries_opus_layout() {
        let header = header().unwrap();
        assert_eq!(&header[..4], MAGIC);

        let len = i32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        assert_eq!(header.len(), 8 + len);

        let metadata: Value = serde_json::from_slice(&header[8..]).unwrap();
        assert_eq!(metadata["dca"]["version"], 1);
        assert_eq!(metadata["opus"]["sample_rate"], 48_000);
        assert_eq!(metadata["opus"]["frame_size"], 960);
        assert_eq!(metadata["opus"]["channels"], 2);
    }

    #[test]
    fn packets_are_length_prefixed() {
        let framed = frame(&[9, 8, 7]).unwrap();
        assert_eq!(&framed[..], &[3, 0, 9, 8, 7]);

        let too_big = vec![0u8; i16::MAX as usize + 1];
        assert!(matches!(frame(&too_big), Err(VoiceError::Transport(_))));
    }
}
