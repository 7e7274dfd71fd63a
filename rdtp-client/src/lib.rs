//! # rdtp-client
//!
//! Chat client library for the RDTP protocol.
//!
//! This crate provides:
//! - Connection lifecycle over a single persistent TCP socket
//! - A background listener that classifies responses and push messages
//! - Single-slot request/response correlation with timeout
//! - Session (login token) state management
//! - A REST/HTTP backend behind the same operation surface

pub mod client;
pub mod connection;
pub mod error;
pub mod mailbox;
pub mod rest;
pub mod session;
pub mod transport;

pub use client::RdtpClient;
pub use connection::{ConnectConfig, Connection};
pub use error::ClientError;
pub use mailbox::Mailbox;
pub use rest::RestClient;
pub use session::SessionState;
pub use transport::ChatTransport;
