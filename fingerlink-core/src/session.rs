//! Session state for one fingerprint module
//!
//! A session tracks:
//! - The address frames are sent to (changes after `SetAdder`)
//! - Whether the handshake password has been verified
//! - A running exchange counter, used to correlate log lines

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::DEFAULT_ADDRESS;
use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport closed
    Closed,

    /// Transport open, password not verified
    Open,

    /// Password verified
    Verified,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Module address used for outgoing frames
    address: parking_lot::RwLock<[u8; 4]>,

    /// Exchanges issued in this session
    exchanges: AtomicU64,

    /// Current session state
    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a session for the module at `address`, in the open state
    pub fn new(address: [u8; 4]) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                address: parking_lot::RwLock::new(address),
                exchanges: AtomicU64::new(0),
                state: parking_lot::RwLock::new(SessionState::Open),
            }),
        }
    }

    /// Address frames are currently sent to
    pub fn address(&self) -> [u8; 4] {
        *self.inner.address.read()
    }

    /// Adopt a new module address
    pub fn set_address(&self, address: [u8; 4]) {
        *self.inner.address.write() = address;
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if the transport is still open
    pub fn is_open(&self) -> bool {
        !matches!(self.state(), SessionState::Closed)
    }

    /// Check if the password was verified
    pub fn is_verified(&self) -> bool {
        matches!(self.state(), SessionState::Verified)
    }

    /// Mark the password as verified
    pub fn verify(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state == SessionState::Closed {
            return Err(Error::InvalidArgument(
                "cannot verify a closed session".into(),
            ));
        }

        *state = SessionState::Verified;
        Ok(())
    }

    /// Drop back to unverified, e.g. after a rejected password
    pub fn unverify(&self) {
        let mut state = self.inner.state.write();
        if *state == SessionState::Verified {
            *state = SessionState::Open;
        }
    }

    /// Reopen a closed session; the password must be verified again
    pub fn reopen(&self) {
        let mut state = self.inner.state.write();
        if *state == SessionState::Closed {
            *state = SessionState::Open;
        }
    }

    /// Close session
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Closed;
    }

    /// Get the sequence number of the next exchange
    pub fn next_exchange(&self) -> u64 {
        self.inner.exchanges.fetch_add(1, Ordering::AcqRel)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}
