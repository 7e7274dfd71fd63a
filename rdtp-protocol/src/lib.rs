//! # rdtp-protocol
//!
//! Wire protocol implementation for RDTP (the chat service's request/push
//! protocol over a raw TCP socket).
//!
//! This crate provides:
//! - Binary framing with a one-byte kind tag and CRC32C validation
//! - JSON message serialization/deserialization
//! - Command/Response/Push message types
//! - Protocol error types and constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use frame::{Frame, FrameKind, FRAME_HEADER_SIZE, MAGIC};
pub use message::{Action, Command, Message, Push, Response, Status};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for the RDTP chat server.
pub const DEFAULT_PORT: u16 = 7667;

/// Maximum frame payload size (1 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;
