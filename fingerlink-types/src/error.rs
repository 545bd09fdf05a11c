//! Errors raised while interpreting reply data

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A decoded value is outside the range the module documents
    #[error("Validation error: {0}")]
    Validation(String),

    /// A reply is too short for the fields it should carry
    #[error("Parse error: {0}")]
    Parse(String),
}
