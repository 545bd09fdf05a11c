//! Native serial port transport
//!
//! The module speaks 8N1 without flow control. Port I/O is blocking, so every
//! exchange runs on the blocking pool with the port locked for its duration.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use fingerlink_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_IDLE_GAP_MS, DEFAULT_READ_TIMEOUT};
use parking_lot::Mutex;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace, warn};

use crate::{error::*, ReplyBuffer, Transport};

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial transport for directly attached modules
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    idle_gap: Duration,
    port: Option<SharedPort>,
}

impl SerialTransport {
    /// Create a transport for the given device path (`/dev/ttyUSB0`, `COM3`)
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT),
            idle_gap: Duration::from_millis(DEFAULT_IDLE_GAP_MS),
            port: None,
        }
    }

    /// Set baud rate (multiples of 9600 up to 115200)
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set how long to wait for the first reply frame
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the quiet period that ends a reply
    pub fn with_idle_gap(mut self, gap: Duration) -> Self {
        self.idle_gap = gap;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&self) -> Result<SharedPort> {
        self.port.clone().ok_or(Error::NotConnected)
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> Result<T> + Send + 'static,
    {
        let port = self.port()?;

        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            job(&mut **port)
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
    }
}

/// Discard stale input, then write the whole frame
fn write_frame(port: &mut dyn SerialPort, frame: &[u8]) -> Result<()> {
    port.clear(ClearBuffer::Input)?;

    trace!("Sending {} bytes: {}", frame.len(), hex::encode_upper(&frame[..frame.len().min(32)]));

    port.write_all(frame)?;
    port.flush()?;
    Ok(())
}

/// Read one reply from a blocking reader
///
/// The reader's own timeout acts as the idle gap: a read that times out or
/// returns nothing means the line went quiet. Reading stops on the first quiet
/// period after a complete frame, and fails with [`Error::ReadTimeout`] if no
/// complete frame arrived within `read_timeout`.
pub fn read_reply<R: Read + ?Sized>(reader: &mut R, read_timeout: Duration) -> Result<BytesMut> {
    let deadline = Instant::now() + read_timeout;
    let mut reply = ReplyBuffer::new();
    let mut scratch = [0u8; 256];

    loop {
        match reader.read(&mut scratch) {
            Ok(0) => {}
            Ok(n) => {
                reply.extend(&scratch[..n]);
                continue;
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }

        if reply.is_complete() {
            break;
        }

        if Instant::now() >= deadline {
            warn!("Read timeout after {:?} ({} bytes buffered)", read_timeout, reply.len());
            return Err(Error::ReadTimeout);
        }
    }

    let buf = reply.into_inner();
    trace!("Received {} bytes: {}", buf.len(), hex::encode_upper(&buf[..buf.len().min(32)]));

    Ok(buf)
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let port = serialport::new(self.path.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.idle_gap)
            .open()?;

        debug!("Opened {}", self.path);

        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn send(&mut self, frame: &[u8]) -> Result<BytesMut> {
        let frame = frame.to_vec();
        let read_timeout = self.read_timeout;

        self.run_blocking(move |port| {
            write_frame(port, &frame)?;
            read_reply(port, read_timeout)
        })
        .await
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let frame = frame.to_vec();

        self.run_blocking(move |port| write_frame(port, &frame)).await
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    fn name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}
