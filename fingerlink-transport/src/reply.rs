//! Reply accumulation shared by the transports
//!
//! The module answers a command with one acknowledge frame, and for uploads
//! streams data packets right behind it. A reply is therefore read until the
//! first frame is complete and the line then stays quiet for an idle gap.

use bytes::BytesMut;
use fingerlink_core::frame;

/// Bytes received for one reply
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    buf: BytesMut,
}

impl ReplyBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Buffer to read into directly
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Check if at least the first frame has fully arrived
    pub fn is_complete(&self) -> bool {
        frame::is_complete(&self.buf)
    }

    /// Number of bytes received
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing was received
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the received bytes
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACK: [u8; 12] = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0A];

    #[test]
    fn test_reply_completes_on_full_frame() {
        let mut reply = ReplyBuffer::new();
        assert!(!reply.is_complete());

        reply.extend(&ACK[..7]);
        assert!(!reply.is_complete());

        reply.extend(&ACK[7..]);
        assert!(reply.is_complete());
        assert_eq!(reply.len(), 12);
    }

    #[test]
    fn test_garbage_is_complete() {
        let mut reply = ReplyBuffer::new();
        reply.extend(&[0x00, 0x00, 0x00]);
        assert!(reply.is_complete());
    }
}
