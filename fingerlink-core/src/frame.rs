//! Fingerprint module frame structure and encoding/decoding

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    constants::{offsets, packet_id, START_CODE},
    error::{Error, Result},
};

/// One protocol message
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬───────────┬──────────┬───────────┬──────────────────────┬───────────┐
/// │  Start   │  Address  │   PID    │  Length   │ Instruction / Status │ Checksum  │
/// │ 2 bytes  │  4 bytes  │  1 byte  │  2 bytes  │  1 byte + operands   │  2 bytes  │
/// │ (0xEF01) │  (BE u32) │          │ (BE u16)  │                      │ (BE u16)  │
/// └──────────┴───────────┴──────────┴───────────┴──────────────────────┴───────────┘
/// ```
///
/// The length field counts everything from the instruction byte through the
/// checksum. The checksum covers everything after the address.
///
/// Outgoing frames are built with a fixed capacity and a write cursor;
/// received frames are wrapped as-is and read at fixed offsets.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use fingerlink_core::{Frame, constants::DEFAULT_ADDRESS};
///
/// let mut frame = Frame::build(DEFAULT_ADDRESS, 12).unwrap();
/// frame.write_bytes(&[0x01, 0x00, 0x03, 0x1D]).unwrap();
/// frame.finish().unwrap();
///
/// let parsed = Frame::from_raw(BytesMut::from(frame.as_bytes())).unwrap();
/// assert_eq!(parsed.status_byte().unwrap(), 0x1D);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buf: BytesMut,
    cursor: usize,
    address: [u8; 4],
}

impl Frame {
    /// Start code plus address
    pub const PREFIX_LEN: usize = 6;

    /// Start code through length field
    pub const HEADER_LEN: usize = offsets::HEADER_LEN;

    /// Checksum field size
    pub const CHECKSUM_LEN: usize = 2;

    /// Create an outgoing frame of exactly `capacity` bytes
    ///
    /// The start code and address are written immediately and the cursor is
    /// left just past the address.
    pub fn build(address: [u8; 4], capacity: usize) -> Result<Self> {
        if capacity < Self::PREFIX_LEN {
            return Err(Error::BufferOverrun {
                capacity,
                attempted: Self::PREFIX_LEN,
            });
        }

        let mut buf = BytesMut::with_capacity(capacity);
        buf.put_slice(&START_CODE);
        buf.put_slice(&address);
        buf.resize(capacity, 0);

        Ok(Self {
            buf,
            cursor: Self::PREFIX_LEN,
            address,
        })
    }

    /// Wrap bytes received from the module
    ///
    /// Only the address is extracted. Header, length and checksum are not
    /// checked here; see [`Frame::verify`].
    pub fn from_raw(raw: BytesMut) -> Result<Self> {
        if raw.len() < Self::PREFIX_LEN {
            return Err(Error::FrameTooShort {
                expected: Self::PREFIX_LEN,
                actual: raw.len(),
            });
        }

        let mut address = [0u8; 4];
        address.copy_from_slice(&raw[offsets::ADDRESS..offsets::ADDRESS + 4]);

        Ok(Self {
            cursor: raw.len(),
            buf: raw,
            address,
        })
    }

    /// Append one byte at the cursor
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.ensure_room(1)?;
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        Ok(())
    }

    /// Append bytes at the cursor
    ///
    /// Nothing is written if the bytes do not all fit.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_room(bytes.len())?;
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    /// Append a big-endian u16
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Checksum field for everything written after the address so far
    ///
    /// The high byte is always `0x00`.
    pub fn checksum(&self) -> [u8; 2] {
        checksum::calculate(&self.buf[Self::PREFIX_LEN..self.cursor])
    }

    /// Full 16-bit checksum field for everything written after the address so far
    pub fn wide_checksum(&self) -> [u8; 2] {
        checksum::calculate_wide(&self.buf[Self::PREFIX_LEN..self.cursor])
    }

    /// Append [`Frame::checksum`]
    pub fn finish(&mut self) -> Result<()> {
        let checksum = self.checksum();
        self.write_bytes(&checksum)
    }

    /// Append [`Frame::wide_checksum`]
    pub fn finish_wide(&mut self) -> Result<()> {
        let checksum = self.wide_checksum();
        self.write_bytes(&checksum)
    }

    /// Device address
    pub fn address(&self) -> [u8; 4] {
        self.address
    }

    /// Read the byte at `index`
    pub fn read(&self, index: usize) -> Result<u8> {
        self.buf.get(index).copied().ok_or(Error::FrameTooShort {
            expected: index + 1,
            actual: self.buf.len(),
        })
    }

    /// Packet identifier at offset 6
    pub fn packet_id(&self) -> Result<u8> {
        self.read(offsets::PACKET_ID)
    }

    /// Status code of a reply (instruction code of a request), offset 9
    pub fn status_byte(&self) -> Result<u8> {
        self.read(offsets::STATUS)
    }

    /// `len` bytes starting at `offset`
    pub fn payload_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.buf
            .get(offset..offset + len)
            .ok_or(Error::FrameTooShort {
                expected: offset + len,
                actual: self.buf.len(),
            })
    }

    /// Big-endian u16 at `offset`
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.payload_bytes(offset, 2)?;
        Ok(BigEndian::read_u16(bytes))
    }

    /// Big-endian u32 at `offset`
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.payload_bytes(offset, 4)?;
        Ok(BigEndian::read_u32(bytes))
    }

    /// Everything after the first `prefix` bytes (empty if the frame is shorter)
    pub fn tail(&self, prefix: usize) -> Bytes {
        self.buf
            .get(prefix..)
            .map(Bytes::copy_from_slice)
            .unwrap_or_default()
    }

    /// Check the start code, the declared length and the checksum of the
    /// first frame in the buffer
    pub fn verify(&self) -> Result<()> {
        let start = self.read_u16(0)?;
        if start.to_be_bytes() != START_CODE {
            return Err(Error::InvalidHeader(start));
        }

        let total = declared_len(&self.buf).ok_or(Error::FrameTooShort {
            expected: Self::HEADER_LEN,
            actual: self.buf.len(),
        })?;
        if total < Self::HEADER_LEN + Self::CHECKSUM_LEN || self.buf.len() < total {
            return Err(Error::FrameTooShort {
                expected: total.max(Self::HEADER_LEN + Self::CHECKSUM_LEN),
                actual: self.buf.len(),
            });
        }

        let received = self.read_u16(total - Self::CHECKSUM_LEN)?;
        let covered = &self.buf[Self::PREFIX_LEN..total - Self::CHECKSUM_LEN];
        if !checksum::verify(covered, received) {
            return Err(Error::ChecksumMismatch {
                expected: checksum::sum16(covered),
                received,
            });
        }

        Ok(())
    }

    /// Frame bytes; for a built frame this is the whole fixed-size buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the frame into an immutable buffer
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    /// Total frame size in bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the frame holds no bytes beyond the prefix
    pub fn is_empty(&self) -> bool {
        self.buf.len() <= Self::PREFIX_LEN
    }

    fn ensure_room(&self, additional: usize) -> Result<()> {
        let attempted = self.cursor + additional;
        if attempted > self.buf.len() {
            return Err(Error::BufferOverrun {
                capacity: self.buf.len(),
                attempted,
            });
        }
        Ok(())
    }
}

/// Total size the first frame in `bytes` declares for itself
///
/// `None` until the start code, address, identifier and length field have
/// arrived.
pub fn declared_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < Frame::HEADER_LEN {
        return None;
    }
    let length = BigEndian::read_u16(&bytes[offsets::LENGTH..]);
    Some(Frame::HEADER_LEN + usize::from(length))
}

/// Check whether `bytes` holds at least one whole frame
///
/// A buffer that does not start with the start code is reported complete as
/// soon as two bytes are present, so the caller can reject it instead of
/// waiting on a length field that means nothing.
pub fn is_complete(bytes: &[u8]) -> bool {
    if bytes.len() >= 2 && bytes[..2] != START_CODE {
        return true;
    }
    declared_len(bytes).is_some_and(|total| bytes.len() >= total)
}

/// Split `payload` into data packets of at most `chunk` bytes
///
/// Every packet but the last is a data packet (0x02); the last one is an
/// end-of-data packet (0x08). Data packets use the full 16-bit checksum.
pub fn data_frames(address: [u8; 4], payload: &[u8], chunk: usize) -> Result<BytesMut> {
    if chunk == 0 {
        return Err(Error::InvalidArgument("data chunk size must be non-zero".into()));
    }

    let mut out = BytesMut::with_capacity(
        payload.len() + (payload.len() / chunk + 1) * (Frame::HEADER_LEN + Frame::CHECKSUM_LEN),
    );

    let mut chunks = payload.chunks(chunk).peekable();
    if chunks.peek().is_none() {
        out.put_slice(encode_data_frame(address, packet_id::END_OF_DATA, &[])?.as_bytes());
        return Ok(out);
    }

    while let Some(part) = chunks.next() {
        let id = if chunks.peek().is_some() {
            packet_id::DATA
        } else {
            packet_id::END_OF_DATA
        };
        out.put_slice(encode_data_frame(address, id, part)?.as_bytes());
    }

    Ok(out)
}

fn encode_data_frame(address: [u8; 4], id: u8, part: &[u8]) -> Result<Frame> {
    let length = u16::try_from(part.len() + Frame::CHECKSUM_LEN).map_err(|_| {
        Error::InvalidArgument(format!("data packet of {} bytes is too large", part.len()))
    })?;

    let mut frame = Frame::build(address, Frame::HEADER_LEN + usize::from(length))?;
    frame.write_byte(id)?;
    frame.write_u16(length)?;
    frame.write_bytes(part)?;
    frame.finish_wide()?;
    Ok(frame)
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("address", &hex::encode_upper(self.address))
            .field("len", &self.buf.len())
            .field("cursor", &self.cursor)
            .field("bytes", &hex::encode_upper(&self.buf[..self.buf.len().min(32)]))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](len={}, code={})",
            hex::encode_upper(self.address),
            self.buf.len(),
            self.status_byte()
                .map(|code| format!("0x{:02X}", code))
                .unwrap_or_else(|_| "-".into())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ADDRESS;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn verify_password_frame() -> Frame {
        let mut frame = Frame::build(DEFAULT_ADDRESS, 16).unwrap();
        frame.write_byte(packet_id::COMMAND).unwrap();
        frame.write_u16(0x0007).unwrap();
        frame.write_byte(0x13).unwrap();
        frame.write_bytes(&[0x00, 0x00, 0x00, 0x00]).unwrap();
        frame.finish().unwrap();
        frame
    }

    #[test]
    fn test_frame_build_prefix() {
        let frame = Frame::build([0x12, 0x34, 0x56, 0x78], 12).unwrap();
        assert_eq!(&frame.as_bytes()[..6], &[0xEF, 0x01, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(frame.len(), 12);
    }

    #[test]
    fn test_verify_password_bytes() {
        let frame = verify_password_frame();
        assert_eq!(
            frame.as_bytes(),
            &[
                0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x07, 0x13, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x1B
            ]
        );
        assert!(frame.verify().is_ok());
    }

    #[test]
    fn test_write_past_capacity() {
        let mut frame = Frame::build(DEFAULT_ADDRESS, 8).unwrap();
        frame.write_bytes(&[1, 2]).unwrap();

        let result = frame.write_byte(3);
        assert_eq!(result, Err(Error::BufferOverrun { capacity: 8, attempted: 9 }));
    }

    #[test]
    fn test_write_bytes_is_all_or_nothing() {
        let mut frame = Frame::build(DEFAULT_ADDRESS, 8).unwrap();
        assert!(frame.write_bytes(&[1, 2, 3]).is_err());

        // Cursor did not move, so two bytes still fit
        frame.write_bytes(&[1, 2]).unwrap();
        assert_eq!(&frame.as_bytes()[6..], &[1, 2]);
    }

    #[test]
    fn test_capacity_smaller_than_prefix() {
        assert!(matches!(
            Frame::build(DEFAULT_ADDRESS, 4),
            Err(Error::BufferOverrun { capacity: 4, .. })
        ));
    }

    #[test]
    fn test_from_raw_too_short() {
        let result = Frame::from_raw(BytesMut::from(&[0xEF, 0x01, 0xFF][..]));
        assert!(matches!(result, Err(Error::FrameTooShort { expected: 6, actual: 3 })));
    }

    #[test]
    fn test_from_raw_does_not_validate() {
        // Bad start code and checksum are accepted by the parser itself
        let raw = BytesMut::from(&[0x00, 0x00, 1, 2, 3, 4, 0x07, 0x00, 0x03, 0x09, 0xAA, 0xBB][..]);
        let frame = Frame::from_raw(raw).unwrap();

        assert_eq!(frame.address(), [1, 2, 3, 4]);
        assert_eq!(frame.status_byte().unwrap(), 0x09);
        assert!(matches!(frame.verify(), Err(Error::InvalidHeader(0x0000))));
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut raw = BytesMut::from(verify_password_frame().as_bytes());
        raw[15] ^= 0xFF;

        let frame = Frame::from_raw(raw).unwrap();
        assert!(matches!(frame.verify(), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_verify_truncated() {
        let raw = BytesMut::from(&verify_password_frame().as_bytes()[..12]);
        let frame = Frame::from_raw(raw).unwrap();
        assert!(matches!(frame.verify(), Err(Error::FrameTooShort { expected: 16, .. })));
    }

    #[test]
    fn test_payload_bytes_out_of_range() {
        let frame = verify_password_frame();
        assert_eq!(frame.payload_bytes(10, 4).unwrap(), &[0, 0, 0, 0]);
        assert!(frame.payload_bytes(14, 4).is_err());
    }

    #[test]
    fn test_read_fields_big_endian() {
        let raw = BytesMut::from(
            &[
                0xEF, 0x01, 0x12, 0x34, 0x56, 0x78, 0x07, 0x00, 0x07, 0x00, 0x01, 0x2C, 0x00,
                0x8C, 0x01, 0x0A,
            ][..],
        );
        let frame = Frame::from_raw(raw).unwrap();

        assert_eq!(frame.address(), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(frame.read_u16(10).unwrap(), 300);
        assert_eq!(frame.read_u32(10).unwrap(), 0x012C_008C);
        assert_eq!(declared_len(frame.as_bytes()), Some(16));
        assert!(frame.read_u32(13).is_err());
    }

    #[test]
    fn test_tail_strips_prefix() {
        let frame = verify_password_frame();
        assert_eq!(frame.tail(12).as_ref(), &[0x00, 0x00, 0x00, 0x1B]);
        assert!(frame.tail(40).is_empty());
    }

    #[test]
    fn test_is_complete() {
        let bytes = verify_password_frame().to_bytes();
        assert!(!is_complete(&bytes[..8]));
        assert!(!is_complete(&bytes[..15]));
        assert!(is_complete(&bytes));
        assert!(is_complete(&[0x55, 0xAA]));
    }

    #[test]
    fn test_data_frames_split() {
        let payload: Vec<u8> = (0..=9).collect();
        let out = data_frames(DEFAULT_ADDRESS, &payload, 4).unwrap();

        // 4 + 4 + 2 data bytes, 11 bytes of framing each
        assert_eq!(out.len(), 10 + 3 * 11);

        let first = Frame::from_raw(BytesMut::from(&out[..15])).unwrap();
        assert_eq!(first.packet_id().unwrap(), packet_id::DATA);
        assert_eq!(first.read_u16(7).unwrap(), 6);
        assert!(first.verify().is_ok());

        let last = Frame::from_raw(BytesMut::from(&out[30..])).unwrap();
        assert_eq!(last.packet_id().unwrap(), packet_id::END_OF_DATA);
        assert_eq!(last.payload_bytes(9, 2).unwrap(), &[8, 9]);
        assert!(last.verify().is_ok());
    }

    #[test]
    fn test_data_frames_empty_payload() {
        let out = data_frames(DEFAULT_ADDRESS, &[], 128).unwrap();
        assert_eq!(out.len(), 11);
        assert_eq!(out[6], packet_id::END_OF_DATA);
    }

    #[test]
    fn test_data_frames_zero_chunk() {
        assert!(matches!(
            data_frames(DEFAULT_ADDRESS, &[1], 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_checksum_matches_trailing_bytes(
            instruction in any::<u8>(),
            operands in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            let length = (operands.len() + 3) as u16;
            let mut frame = Frame::build(DEFAULT_ADDRESS, 9 + length as usize).unwrap();
            frame.write_byte(packet_id::COMMAND).unwrap();
            frame.write_u16(length).unwrap();
            frame.write_byte(instruction).unwrap();
            frame.write_bytes(&operands).unwrap();
            frame.finish().unwrap();

            let bytes = frame.as_bytes();
            let covered = &bytes[6..bytes.len() - 2];
            prop_assert_eq!(&bytes[bytes.len() - 2..], &checksum::calculate(covered)[..]);
        }

        #[test]
        fn prop_build_then_parse_keeps_address_and_code(
            address in any::<[u8; 4]>(),
            instruction in any::<u8>(),
        ) {
            let mut frame = Frame::build(address, 12).unwrap();
            frame.write_byte(packet_id::COMMAND).unwrap();
            frame.write_u16(3).unwrap();
            frame.write_byte(instruction).unwrap();
            frame.finish().unwrap();

            let parsed = Frame::from_raw(BytesMut::from(frame.as_bytes())).unwrap();
            prop_assert_eq!(parsed.address(), address);
            prop_assert_eq!(parsed.status_byte().unwrap(), instruction);
        }
    }
}
