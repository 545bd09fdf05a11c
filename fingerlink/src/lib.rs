//! # fingerlink
//!
//! Async driver for R30x-family fingerprint modules (R300, R303, R305, R307
//! and compatibles) over their half-duplex serial protocol.
//!
//! ## Features
//!
//! - Every module command as a typed async method
//! - Native serial ports, or the same stream bridged over TCP
//! - Enrollment and identification workflows with progress and cancellation
//! - Reply checksum verification
//!
//! ## Quick Start
//!
//! ```no_run
//! use fingerlink::{BufferId, Sensor, SerialTransport};
//! use fingerlink::constants::DEFAULT_PASSWORD;
//!
//! #[tokio::main]
//! async fn main() -> fingerlink::Result<()> {
//!     let sensor = Sensor::new(SerialTransport::new("/dev/ttyUSB0"));
//!     sensor.open().await?;
//!
//!     if !sensor.verify_password(DEFAULT_PASSWORD).await? {
//!         eprintln!("Wrong password");
//!         return Ok(());
//!     }
//!
//!     let parameters = sensor.read_system_parameters().await?;
//!     println!("{}", parameters);
//!
//!     let result = sensor.search(BufferId::One, 0, parameters.library_size).await?;
//!     println!("{}", result);
//!
//!     sensor.close().await?;
//!     Ok(())
//! }
//! ```

mod capture;
pub mod enroll;
pub mod error;
pub mod identify;
pub mod sensor;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use capture::CancelHandle;
pub use enroll::{EnrollHandle, EnrollState, Enrollment};
pub use error::{Error, InsertPhase, Result};
pub use identify::Identification;
pub use sensor::{ReplyPolicy, Sensor};

// Re-export protocol and transport types
pub use fingerlink_core::{constants, BufferId, Frame, Instruction, Request, Status};
pub use fingerlink_transport::{SerialTransport, TcpTransport, Transport};
pub use fingerlink_types::{BasicParameters, EnrollReport, MatchResult, SearchResult, StatusRegister};
