use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Transaction-level decoding failures (malformed envelope)
    #[error("Decode error: {0}")]
    Decode(#[from] crate::decode::DecodeError),

    /// Address encoding/decoding failures
    #[error("Address error: {0}")]
    Address(#[from] crate::address::AddressError),

    /// Previous-transaction lookup failures
    #[error("Lookup error: {0}")]
    Lookup(#[from] crate::lookup::LookupError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Script parsing error
    #[error("Script parsing error: {0}")]
    ScriptParse(String),
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(err: hex::FromHexError) -> Self {
        AppError::InvalidData(format!("Hex error: {}", err))
    }
}
