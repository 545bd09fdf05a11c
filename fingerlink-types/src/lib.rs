//! Type definitions for fingerlink

pub mod error;
pub mod outcome;
pub mod parameters;

pub use error::{Error, Result};
pub use outcome::{EnrollReport, MatchResult, SearchResult};
pub use parameters::{BasicParameters, StatusRegister};
