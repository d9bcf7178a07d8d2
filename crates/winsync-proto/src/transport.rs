//! Newline-delimited transport codec for wire messages.
//!
//! Each message is one JSON object terminated by `\n`. The decoder
//! yields raw lines rather than parsed messages so that malformed JSON
//! can be answered with an error ack instead of tearing the connection
//! down; parsing happens in [`crate::envelope::decode_line`].

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::{ClientMessage, ServerMessage};

/// Maximum line size (4 MB). A peer exceeding this is hung up on.
const MAX_LINE_SIZE: usize = 4 * 1024 * 1024;

/// Codec for newline-delimited JSON messages.
#[derive(Debug, Default)]
pub struct WireCodec {
    // Scan resume offset, so a long partial line is not rescanned.
    scanned: usize,
}

impl WireCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn encode_json<T: serde::Serialize>(
        &mut self,
        item: &T,
        dst: &mut BytesMut,
    ) -> Result<(), CodecError> {
        let json = serde_json::to_vec(item)?;
        if json.len() > MAX_LINE_SIZE {
            return Err(CodecError::LineTooLong(json.len()));
        }
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Decoder for WireCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(pos) = src[self.scanned..].iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_LINE_SIZE {
                return Err(CodecError::LineTooLong(src.len()));
            }
            self.scanned = src.len();
            return Ok(None);
        };

        let newline = self.scanned + pos;
        if newline > MAX_LINE_SIZE {
            return Err(CodecError::LineTooLong(newline));
        }

        let mut line = src.split_to(newline + 1);
        self.scanned = 0;

        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        let text = std::str::from_utf8(&line)?;
        Ok(Some(text.to_string()))
    }
}

impl Encoder<ServerMessage> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_json(&item, dst)
    }
}

impl Encoder<ClientMessage> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_json(&item, dst)
    }
}

/// Raw line encoding, used by tests and tooling to send arbitrary
/// (possibly malformed) frames.
impl Encoder<String> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_LINE_SIZE {
            return Err(CodecError::LineTooLong(item.len()));
        }
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("line too long: {0} bytes (max: {MAX_LINE_SIZE})")]
    LineTooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use winsync_types::{CommandResult, State};

    fn empty_state() -> State {
        State {
            windows: vec![],
            desktops: vec![],
            monitors: vec![],
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_encode_terminates_with_newline() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(ServerMessage::state(empty_state()), &mut buf)
            .unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
        // No embedded newlines: the payload itself must stay one line.
        assert_eq!(buf.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::new();

        let msg = ServerMessage::ack(CommandResult::ok(serde_json::json!({"name": "Minimize"})));
        codec.encode(msg, &mut buf).unwrap();

        let line = codec.decode(&mut buf).unwrap().unwrap();
        let parsed: ServerMessage = serde_json::from_str(&line).unwrap();
        assert!(parsed.is_ack());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::from(&b"{\"type\":\"comm"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"and\"}\n");
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line, "{\"type\":\"command\"}");
    }

    #[test]
    fn test_decode_multiple_lines() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::from(&b"first\nsecond\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "first");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "second");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_strips_carriage_return() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::from(&b"{}\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "{}");
    }

    #[test]
    fn test_decode_empty_buffer() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_line_too_long() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::new();
        buf.resize(MAX_LINE_SIZE + 1, b'a');

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::LineTooLong(_))));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::Utf8(_))));
    }

    #[test]
    fn test_encode_raw_line() {
        let mut codec = WireCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("not json".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"not json\n");
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::LineTooLong(5_000_000);
        let msg = err.to_string();
        assert!(msg.contains("5000000"));
        assert!(msg.contains("too long"));
    }
}
