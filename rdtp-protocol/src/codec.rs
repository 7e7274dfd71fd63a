//! Encoder and decoder for RDTP frames and messages.

use crate::error::ProtocolError;
use crate::frame::{Frame, FrameKind};
use crate::message::{Command, Message, Push, Response};
use bytes::BytesMut;

/// Encodes messages into framed bytes.
pub struct Encoder;

impl Encoder {
    /// Encodes a command into a frame.
    pub fn encode_command(command: &Command) -> Result<BytesMut, ProtocolError> {
        let frame = Frame::from_json(FrameKind::Command, command)?;
        frame.encode()
    }

    /// Encodes a response into a frame.
    pub fn encode_response(response: &Response) -> Result<BytesMut, ProtocolError> {
        let frame = Frame::from_json(FrameKind::Response, response)?;
        frame.encode()
    }

    /// Encodes a push message into a frame.
    pub fn encode_push(push: &Push) -> Result<BytesMut, ProtocolError> {
        let frame = Frame::from_json(FrameKind::Push, push)?;
        frame.encode()
    }
}

/// Decodes framed bytes into classified messages.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode(&mut self.buffer)
    }

    /// Attempts to decode the next message from the buffer, classified by
    /// the frame's kind tag.
    pub fn decode_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        let frame = match self.decode_frame()? {
            Some(frame) => frame,
            None => return Ok(None),
        };

        let payload =
            std::str::from_utf8(&frame.payload).map_err(|_| ProtocolError::InvalidUtf8)?;

        let message = match frame.kind {
            FrameKind::Command => Message::Command(serde_json::from_str(payload)?),
            FrameKind::Response => Message::Response(serde_json::from_str(payload)?),
            FrameKind::Push => Message::Push(serde_json::from_str(payload)?),
        };

        Ok(Some(message))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    ///
    /// Used to resynchronize after a header-level decode error; see
    /// [`ProtocolError::consumed_frame`].
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
