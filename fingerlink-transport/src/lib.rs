//! Transport layer for fingerprint modules
//!
//! Provides the byte channel frames travel over: a native serial port, or the
//! same serial stream bridged over TCP.

pub mod error;
pub mod reply;
pub mod serial;
pub mod tcp;

pub use error::{Error, Result};
pub use reply::ReplyBuffer;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
///
/// The protocol is half-duplex with no correlation ids: each `send` is one
/// request followed by exactly one reply. Callers must not overlap calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn open(&mut self) -> Result<()>;

    /// Release the channel; closing a closed transport is a no-op
    async fn close(&mut self) -> Result<()>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Write a frame, then wait for the reply
    ///
    /// Returns every byte that arrived for the reply: at least one complete
    /// frame, plus any data packets the module streamed right behind it.
    async fn send(&mut self, frame: &[u8]) -> Result<BytesMut>;

    /// Write bytes without waiting for a reply
    async fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Set how long `send` waits for a complete reply
    ///
    /// Channels without a read deadline of their own ignore it.
    fn set_read_timeout(&mut self, _timeout: Duration) {}

    /// Human-readable channel name (port path or bridge address)
    fn name(&self) -> String;
}
