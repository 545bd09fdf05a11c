//! Error types for fingerlink-core

/// Result type alias for fingerlink-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame codec errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A write would move the cursor past the frame's fixed capacity
    #[error("Buffer overrun: frame capacity is {capacity} bytes, write needs {attempted} bytes")]
    BufferOverrun {
        capacity: usize,
        attempted: usize,
    },

    /// Frame is too short for the requested read
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Frame does not start with the 0xEF01 start code
    #[error("Invalid frame header: 0x{0:04X}")]
    InvalidHeader(u16),

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Operand outside the range the module accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Check if the error was caused by bytes received from the module
    /// (as opposed to a locally built frame)
    pub fn is_corrupt_reply(&self) -> bool {
        matches!(
            self,
            Self::FrameTooShort { .. } | Self::InvalidHeader(_) | Self::ChecksumMismatch { .. }
        )
    }
}
