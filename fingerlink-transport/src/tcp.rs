//! TCP transport
//!
//! Talks to a module whose UART is exposed through a serial-to-TCP bridge
//! (ser2net, ESP-Link and similar). The byte stream is the raw serial stream.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use fingerlink_core::constants::{DEFAULT_IDLE_GAP_MS, DEFAULT_READ_TIMEOUT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use crate::{error::*, ReplyBuffer, Transport};

/// TCP transport for bridged fingerprint modules
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    read_timeout: Duration,
    idle_gap: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            stream: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT),
            idle_gap: Duration::from_millis(DEFAULT_IDLE_GAP_MS),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the quiet period that ends a reply
    pub fn with_idle_gap(mut self, gap: Duration) -> Self {
        self.idle_gap = gap;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        self.socket_addr = Some(*addr);
        Ok(*addr)
    }

    /// Drop bytes that arrived outside of any exchange
    fn discard_stale(stream: &TcpStream) -> Result<()> {
        let mut scratch = [0u8; 256];
        loop {
            match stream.try_read(&mut scratch) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => warn!("Discarding {} stale bytes", n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    async fn read_reply(&mut self) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let deadline = Instant::now() + self.read_timeout;
        let mut reply = ReplyBuffer::new();

        loop {
            let wait = if reply.is_complete() {
                self.idle_gap
            } else {
                deadline.saturating_duration_since(Instant::now())
            };

            match timeout(wait, stream.read_buf(reply.buf_mut())).await {
                Err(_) if reply.is_complete() => break,
                Err(_) => {
                    warn!("Read timeout after {:?} ({} bytes buffered)", self.read_timeout, reply.len());
                    return Err(Error::ReadTimeout);
                }
                Ok(Ok(0)) if reply.is_complete() => break,
                Ok(Ok(0)) => return Err(Error::ConnectionClosed),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(Error::Io(e)),
            }
        }

        let buf = reply.into_inner();
        trace!("Received {} bytes: {}", buf.len(), hex::encode_upper(&buf[..buf.len().min(32)]));

        Ok(buf)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Frames are small; do not let Nagle hold them back
        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}...", self.name());

            let _ = stream.shutdown().await;
        }

        self.socket_addr = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, frame: &[u8]) -> Result<BytesMut> {
        self.write(frame).await?;
        self.read_reply().await
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        Self::discard_stale(stream)?;

        trace!("Sending {} bytes: {}", frame.len(), hex::encode_upper(&frame[..frame.len().min(32)]));

        stream.write_all(frame).await?;
        stream.flush().await?;

        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    fn name(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("TCP transport dropped while still connected");
        }
    }
}
