//! Previous-transaction lookup
//!
//! The decoder needs the raw bytes of every transaction referenced by an
//! input to recover the spent locking scripts. `TxSource` is the seam: the
//! HTTP client implements it for real use, tests substitute a stub.

pub mod http;

pub use http::HttpTxSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Network;

#[derive(Debug, Error)]
pub enum LookupError {
    /// The source answered but does not know the transaction
    #[error("transaction not found: {txid}")]
    NotFound { txid: String },
    /// Network-level failure: connection, timeout, non-JSON body
    #[error("transport error: {0}")]
    Transport(String),
    /// The source answered with something the client cannot use
    #[error("lookup failed: {0}")]
    Failed(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

/// A source of raw transaction hex, keyed by txid
#[async_trait]
pub trait TxSource: Send + Sync {
    /// Fetch the raw serialized transaction, hex-encoded
    async fn raw_transaction(&self, txid: &str, network: Network) -> Result<String, LookupError>;
}
