//! Binary frame format for RDTP.
//!
//! Frame layout (16 bytes header + payload):
//!
//! ```text
//! +--------+---------+------+----------+-------------+--------+
//! | magic  | version | kind | reserved | payload_len | crc32c |
//! | 4 bytes| 2 bytes |1 byte| 1 byte   |   4 bytes   | 4 bytes|
//! +--------+---------+------+----------+-------------+--------+
//! | payload                                                   |
//! | payload_len bytes                                         |
//! +-----------------------------------------------------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_PAYLOAD_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Magic bytes identifying RDTP frames.
pub const MAGIC: [u8; 4] = *b"RDTP";

/// Size of the fixed frame header in bytes (4+2+1+1+4+4 = 16).
pub const FRAME_HEADER_SIZE: usize = 16;

/// Frame classification, carried as a one-byte tag in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Client-issued command: `C`.
    Command,
    /// Correlated reply to a command: `R`.
    Response,
    /// Unsolicited server-pushed chat message: `M`.
    Push,
}

impl FrameKind {
    /// Returns the wire tag byte for this kind.
    pub fn tag(&self) -> u8 {
        match self {
            FrameKind::Command => b'C',
            FrameKind::Response => b'R',
            FrameKind::Push => b'M',
        }
    }

    /// Parses a wire tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            b'C' => Ok(FrameKind::Command),
            b'R' => Ok(FrameKind::Response),
            b'M' => Ok(FrameKind::Push),
            other => Err(ProtocolError::InvalidKind(other)),
        }
    }
}

/// A parsed RDTP frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Protocol version.
    pub version: u16,
    /// Frame kind.
    pub kind: FrameKind,
    /// Frame payload (JSON data).
    pub payload: Bytes,
}

impl Frame {
    /// Creates a new frame with the given kind and payload.
    pub fn new(kind: FrameKind, payload: Bytes) -> Self {
        Self {
            version: crate::PROTOCOL_VERSION,
            kind,
            payload,
        }
    }

    /// Creates a new frame from a JSON-serializable value.
    pub fn from_json<T: serde::Serialize>(kind: FrameKind, value: &T) -> Result<Self, ProtocolError> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::new(kind, Bytes::from(payload)))
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let payload_len = self.payload.len() as u32;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());

        // Magic (4 bytes)
        buf.put_slice(&MAGIC);

        // Version (2 bytes)
        buf.put_u16(self.version);

        // Kind tag (1 byte)
        buf.put_u8(self.kind.tag());

        // Reserved (1 byte)
        buf.put_u8(0);

        // Payload length (4 bytes)
        buf.put_u32(payload_len);

        // CRC32C of payload (4 bytes)
        buf.put_u32(crc32c::crc32c(&self.payload));

        // Payload
        buf.put_slice(&self.payload);

        Ok(buf)
    }

    /// Decodes a frame from bytes.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    /// Header-level errors do not consume the buffer; see
    /// [`ProtocolError::consumed_frame`].
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at header without consuming
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let version = u16::from_be_bytes([buf[4], buf[5]]);
        if version != crate::PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let kind = FrameKind::from_tag(buf[6])?;

        if buf[7] != 0 {
            return Err(ProtocolError::ReservedByte(buf[7]));
        }

        let payload_len = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
        if payload_len > MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len as u32,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let crc_expected = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);

        if buf.len() < FRAME_HEADER_SIZE + payload_len {
            return Ok(None);
        }

        // Consume header and payload
        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(payload_len).freeze();

        let crc_actual = crc32c::crc32c(&payload);
        if crc_actual != crc_expected {
            return Err(ProtocolError::CrcMismatch {
                expected: crc_expected,
                actual: crc_actual,
            });
        }

        Ok(Some(Self {
            version,
            kind,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let payload = Bytes::from(r#"{"action":"login","args":["alice","hunter2"]}"#);
        let frame = Frame::new(FrameKind::Command, payload.clone());

        let encoded = frame.encode().unwrap();
        let mut buf = encoded;
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded.version, crate::PROTOCOL_VERSION);
        assert_eq!(decoded.kind, FrameKind::Command);
        assert_eq!(decoded.payload, payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(FrameKind::Command.tag(), b'C');
        assert_eq!(FrameKind::Response.tag(), b'R');
        assert_eq!(FrameKind::Push.tag(), b'M');

        assert_eq!(FrameKind::from_tag(b'C').unwrap(), FrameKind::Command);
        assert_eq!(FrameKind::from_tag(b'R').unwrap(), FrameKind::Response);
        assert_eq!(FrameKind::from_tag(b'M').unwrap(), FrameKind::Push);
        assert!(matches!(
            FrameKind::from_tag(b'Z'),
            Err(ProtocolError::InvalidKind(b'Z'))
        ));
    }

    #[test]
    fn test_crc_validation() {
        let frame = Frame::new(FrameKind::Push, Bytes::from(r#"{"payload":"hi"}"#));
        let mut encoded = frame.encode().unwrap();

        // Corrupt the payload
        let len = encoded.len();
        encoded[len - 1] ^= 0xFF;

        let result = Frame::decode(&mut encoded);
        assert!(matches!(result, Err(ProtocolError::CrcMismatch { .. })));
    }

    #[test]
    fn test_invalid_magic() {
        let mut buf =
            BytesMut::from(&b"BADX\x00\x01C\x00\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        let result = Frame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidMagic(_))));
        // Header-level error leaves the buffer untouched
        assert_eq!(buf.len(), FRAME_HEADER_SIZE);
    }

    #[test]
    fn test_incomplete_frame() {
        // Less than header size
        let mut buf = BytesMut::from(&b"RDTP\x00\x01C"[..]);
        assert!(Frame::decode(&mut buf).unwrap().is_none());

        // Complete header, truncated payload
        let frame = Frame::new(FrameKind::Response, Bytes::from(r#"{"status":0,"args":[]}"#));
        let encoded = frame.encode().unwrap();
        let mut buf = BytesMut::from(&encoded[..encoded.len() - 3]);
        assert!(Frame::decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf =
            BytesMut::from(&b"RDTP\x00\x63C\x00\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        let result = Frame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_invalid_kind_tag() {
        let mut buf =
            BytesMut::from(&b"RDTP\x00\x01Z\x00\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        let result = Frame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::InvalidKind(b'Z'))));
    }

    #[test]
    fn test_reserved_byte_must_be_zero() {
        let mut buf =
            BytesMut::from(&b"RDTP\x00\x01C\x07\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        let result = Frame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::ReservedByte(0x07))));
    }

    #[test]
    fn test_frame_too_large() {
        let huge_payload = vec![0u8; (MAX_PAYLOAD_SIZE + 1) as usize];
        let frame = Frame::new(FrameKind::Push, Bytes::from(huge_payload));
        let result = frame.encode();
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let frame1 = Frame::new(FrameKind::Response, Bytes::from(r#"{"status":0}"#));
        let frame2 = Frame::new(FrameKind::Push, Bytes::from(r#"{"payload":"x"}"#));

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&frame1.encode().unwrap());
        buf.extend_from_slice(&frame2.encode().unwrap());

        let decoded1 = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded1.kind, FrameKind::Response);

        let decoded2 = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded2.kind, FrameKind::Push);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_crc_error_consumes_frame() {
        let bad = Frame::new(FrameKind::Push, Bytes::from(r#"{"payload":"bad"}"#));
        let good = Frame::new(FrameKind::Push, Bytes::from(r#"{"payload":"good"}"#));

        let mut encoded_bad = bad.encode().unwrap();
        let len = encoded_bad.len();
        encoded_bad[len - 1] ^= 0xFF;

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encoded_bad);
        buf.extend_from_slice(&good.encode().unwrap());

        // Bad frame errors out but is consumed; the next decode succeeds
        assert!(Frame::decode(&mut buf).is_err());
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.payload, Bytes::from(r#"{"payload":"good"}"#));
    }

    #[test]
    fn test_frame_from_json() {
        #[derive(serde::Serialize)]
        struct TestMsg {
            value: i32,
        }
        let frame = Frame::from_json(FrameKind::Push, &TestMsg { value: 42 }).unwrap();
        let payload_str = std::str::from_utf8(&frame.payload).unwrap();
        assert!(payload_str.contains("42"));
    }
}
