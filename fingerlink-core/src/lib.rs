//! # fingerlink-core
//!
//! Core protocol implementation for R30x-family fingerprint modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Checksum calculation
//! - Instruction and request definitions
//! - Status (confirmation) codes
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod session;
pub mod status;

pub use command::{BufferId, Instruction, Request};
pub use error::{Error, Result};
pub use frame::Frame;
pub use session::{Session, SessionState};
pub use status::Status;

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

/// Largest frame the length field can describe
pub const MAX_FRAME_SIZE: usize = Frame::HEADER_LEN + u16::MAX as usize;
