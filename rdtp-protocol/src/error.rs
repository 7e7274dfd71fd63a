//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid magic bytes: expected 'RDTP', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    #[error("unknown frame kind tag: {0:#04x}")]
    InvalidKind(u8),

    #[error("reserved header byte must be zero, got {0:#04x}")]
    ReservedByte(u8),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("unknown response status code: {0}")]
    InvalidStatus(u8),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Returns whether the decode buffer is still positioned at the failing
    /// frame header after this error.
    ///
    /// Header-level errors leave the bad bytes in the buffer; the reader must
    /// discard buffered data to resynchronize. Payload-level errors consume
    /// the whole frame, so reading can simply continue.
    pub fn consumed_frame(&self) -> bool {
        matches!(
            self,
            ProtocolError::CrcMismatch { .. }
                | ProtocolError::InvalidStatus(_)
                | ProtocolError::Json(_)
                | ProtocolError::InvalidUtf8
        )
    }
}
