//! Protocol constants

/// Start code at the beginning of every frame (high byte first)
pub const START_CODE: [u8; 2] = [0xEF, 0x01];

/// Default module address (factory setting, accepted by any module)
pub const DEFAULT_ADDRESS: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Default handshake password
pub const DEFAULT_PASSWORD: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// Default serial baud rate (9600 * 6)
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Default wait for a reply (seconds)
pub const DEFAULT_TIMEOUT: u64 = 50;

/// Default transport read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT: u64 = 5;

/// Default quiet period that ends a reply once a whole frame is buffered (milliseconds)
pub const DEFAULT_IDLE_GAP_MS: u64 = 40;

/// Default settle delay between the two enrollment captures (milliseconds)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Default data packet size (packet size code 2 = 128 bytes)
pub const DEFAULT_DATA_CHUNK: usize = 128;

/// Notepad pages available on the module (0..=15)
pub const NOTEPAD_PAGES: u8 = 16;

/// Size of one notepad page in bytes
pub const NOTEPAD_PAGE_SIZE: usize = 32;

/// Fixed offsets inside a frame
pub mod offsets {
    /// Device address (4 bytes)
    pub const ADDRESS: usize = 2;

    /// Packet identifier
    pub const PACKET_ID: usize = 6;

    /// Big-endian length field (2 bytes)
    pub const LENGTH: usize = 7;

    /// Instruction code (requests) or status code (replies)
    pub const STATUS: usize = 9;

    /// First reply data byte after the status code
    pub const DATA: usize = 10;

    /// Everything up to and including the length field
    pub const HEADER_LEN: usize = 9;

    /// Size of an acknowledge frame carrying only a status: header, status, checksum
    pub const ACK_PREFIX_LEN: usize = 12;
}

/// Packet identifiers at offset 6
pub mod packet_id {
    /// Command packet
    pub const COMMAND: u8 = 0x01;

    /// Data packet; always follows a command or acknowledge packet
    pub const DATA: u8 = 0x02;

    /// Acknowledge packet
    pub const ACK: u8 = 0x07;

    /// Last data packet of a transfer
    pub const END_OF_DATA: u8 = 0x08;
}
