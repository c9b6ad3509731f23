//! UTXO transaction decoder with FT token-tape protocol recognition
//!
//! Decodes raw transactions into a structured detail record: script
//! disassembly and classification, per-input resolution of spent outputs
//! through a pluggable `TxSource`, and recognition of the token-tape
//! protocol (Code Script / Tape Script pairs) riding inside the outputs.

pub mod address;
pub mod cache;
pub mod cli;
pub mod decode;
pub mod errors;
pub mod lookup;
pub mod script;
pub mod token;
pub mod types;

pub use types::{Network, ProtocolGeneration, TransactionDetail};

/// Fetch a transaction by id and decode it in one call
pub async fn decode_txid(
    txid: &str,
    network: Network,
    generation: ProtocolGeneration,
    source: &dyn lookup::TxSource,
) -> errors::AppResult<TransactionDetail> {
    let raw_hex = source.raw_transaction(txid, network).await?;
    Ok(decode::decode_transaction(&raw_hex, network, generation, source).await?)
}
