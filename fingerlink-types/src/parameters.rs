//! System parameter snapshot returned by `ReadSysPara`

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

bitflags! {
    /// Contents of the module's system status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u16 {
        /// Module is executing a command
        const BUSY = 1 << 0;
        /// Found a matching finger
        const PASS = 1 << 1;
        /// Handshake password verified
        const PASSWORD_VERIFIED = 1 << 2;
        /// Image buffer contains a valid image
        const IMAGE_BUFFER_VALID = 1 << 3;
    }
}

/// Basic module configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicParameters {
    /// System status register
    pub status_register: StatusRegister,

    /// System identifier code (fixed 0x0009)
    pub system_identifier: u16,

    /// Finger library size
    pub library_size: u16,

    /// Security level (1..=5)
    pub security_level: u16,

    /// 32-bit device address
    pub device_address: u32,

    /// Data packet size code (0..=3)
    pub packet_size_code: u16,

    /// Baud multiplier N (baud = 9600 * N)
    pub baud_multiplier: u16,
}

impl BasicParameters {
    /// Offset of the first parameter in a reply frame
    pub const OFFSET: usize = 10;

    /// Size of the parameter block
    pub const LEN: usize = 16;

    /// Parse the parameter block from a complete reply frame
    ///
    /// Fields are read at fixed offsets, big-endian.
    pub fn parse(reply: &[u8]) -> Result<Self> {
        let end = Self::OFFSET + Self::LEN;
        let block = reply.get(Self::OFFSET..end).ok_or_else(|| {
            Error::Parse(format!(
                "system parameters need {} bytes, reply has {}",
                end,
                reply.len()
            ))
        })?;

        Ok(Self {
            status_register: StatusRegister::from_bits_retain(BigEndian::read_u16(&block[0..2])),
            system_identifier: BigEndian::read_u16(&block[2..4]),
            library_size: BigEndian::read_u16(&block[4..6]),
            security_level: BigEndian::read_u16(&block[6..8]),
            device_address: BigEndian::read_u32(&block[8..12]),
            packet_size_code: BigEndian::read_u16(&block[12..14]),
            baud_multiplier: BigEndian::read_u16(&block[14..16]),
        })
    }

    /// Data packet size in bytes (32, 64, 128 or 256)
    pub fn packet_size_bytes(&self) -> Result<usize> {
        match self.packet_size_code {
            code @ 0..=3 => Ok(32 << code),
            code => Err(Error::Validation(format!("unknown packet size code {}", code))),
        }
    }

    /// Serial baud rate
    pub fn baud_rate(&self) -> u32 {
        9600 * u32::from(self.baud_multiplier)
    }

    /// Device address as it appears on the wire
    pub fn address_bytes(&self) -> [u8; 4] {
        self.device_address.to_be_bytes()
    }
}

impl fmt::Display for BasicParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module[addr: 0x{:08X}, library: {}, security: {}, baud: {}]",
            self.device_address,
            self.library_size,
            self.security_level,
            self.baud_rate()
        )
    }
}
