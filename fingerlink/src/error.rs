//! High-level error types

use std::fmt;

use fingerlink_core::Status;

use crate::enroll::EnrollState;

pub type Result<T> = std::result::Result<T, Error>;

/// Which half of a two-phase download was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPhase {
    /// The command frame announcing the download
    Command,
    /// The data packets themselves
    Data,
}

impl fmt::Display for InsertPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Data => write!(f, "data"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{operation}: frame error: {source}")]
    Frame {
        operation: &'static str,
        #[source]
        source: fingerlink_core::Error,
    },

    #[error("{operation}: no reply within {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("{operation}: transport is closed")]
    TransportClosed { operation: &'static str },

    #[error("{operation}: transport error: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: fingerlink_transport::Error,
    },

    #[error("{operation} rejected by device: {status}")]
    DeviceRejected { operation: &'static str, status: Status },

    #[error("{operation} rejected in {phase} phase: {status}")]
    ReceiveRejected {
        operation: &'static str,
        phase: InsertPhase,
        status: Status,
    },

    #[error("Type error: {0}")]
    Types(#[from] fingerlink_types::Error),

    #[error("No finger image after {attempts} capture attempts")]
    CaptureAttemptsExhausted { attempts: u32 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Enrollment failed at {state}: {source}")]
    Enrollment {
        state: EnrollState,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn frame(operation: &'static str, source: fingerlink_core::Error) -> Self {
        Self::Frame { operation, source }
    }

    pub(crate) fn transport(operation: &'static str, source: fingerlink_transport::Error) -> Self {
        if source.is_closed() {
            Self::TransportClosed { operation }
        } else {
            Self::Transport { operation, source }
        }
    }

    /// Device status carried by the error, if the device answered at all
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::DeviceRejected { status, .. } | Self::ReceiveRejected { status, .. } => {
                Some(*status)
            }
            Self::Enrollment { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Operation that failed, if the error came from one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Frame { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::TransportClosed { operation }
            | Self::Transport { operation, .. }
            | Self::DeviceRejected { operation, .. }
            | Self::ReceiveRejected { operation, .. } => Some(*operation),
            Self::Enrollment { source, .. } => source.operation(),
            _ => None,
        }
    }

    /// Check if the device refused the request
    pub fn is_device_rejected(&self) -> bool {
        match self {
            Self::DeviceRejected { .. } | Self::ReceiveRejected { .. } => true,
            Self::Enrollment { source, .. } => source.is_device_rejected(),
            _ => false,
        }
    }

    /// Check if a system parameter write named a register the module lacks
    pub fn is_wrong_register(&self) -> bool {
        self.status() == Some(Status::WrongRegisterNumber)
    }

    /// Check if no reply arrived in time
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport { source, .. } => source.is_timeout(),
            Self::Enrollment { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Check if repeating the operation can reasonably succeed
    ///
    /// Timeouts, corrupted replies, line errors reported by the module and
    /// poor finger images qualify. A closed transport or a logical refusal
    /// does not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Frame { source, .. } => source.is_corrupt_reply(),
            Self::DeviceRejected { status, .. } => {
                status.is_capture_quality() || *status == Status::CommunicationError
            }
            Self::ReceiveRejected { status, .. } => *status == Status::CommunicationError,
            Self::Enrollment { source, .. } => source.is_recoverable(),
            Self::CaptureAttemptsExhausted { .. } => true,
            _ => self.is_timeout(),
        }
    }
}
