//! Transaction decoding pipeline
//!
//! Raw hex goes in, a fully decoded `TransactionDetail` comes out: envelope
//! fields, per-input resolution of the spent outputs (fetched concurrently
//! through a `TxSource`), per-output script classification, and one token
//! protocol identification pass over the whole transaction.

use bitcoin::consensus;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info};

use crate::lookup::{LookupError, TxSource};
use crate::script::{classify, Script};
use crate::token::{self, identify, tape};
use crate::types::{
    subunits_to_coins, DecodedInput, DecodedOutput, InputResolveError, Network,
    ProtocolGeneration, RawOutput, ScriptDetail, TransactionDetail, TransactionType,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid transaction envelope: {0}")]
    Envelope(String),
}

/// Deserialize the consensus envelope from raw hex
fn parse_envelope(raw_hex: &str) -> Result<bitcoin::Transaction, DecodeError> {
    let bytes = hex::decode(raw_hex.trim())?;
    consensus::deserialize(&bytes).map_err(|e| DecodeError::Envelope(e.to_string()))
}

/// Decode a raw transaction into its full detail record
///
/// Input resolution failures never abort the decode: every input appears in
/// the result, failed ones carrying a precise `InputResolveError` instead of
/// the spent-output fields.
pub async fn decode_transaction(
    raw_hex: &str,
    network: Network,
    generation: ProtocolGeneration,
    source: &dyn TxSource,
) -> Result<TransactionDetail, DecodeError> {
    let tx = parse_envelope(raw_hex)?;
    let txid = tx.compute_txid().to_string();
    debug!(%txid, inputs = tx.input.len(), outputs = tx.output.len(), "decoding transaction");

    let input_futures = tx.input.iter().map(|txin| async {
        let unlock = Script::from_bytes(txin.script_sig.as_bytes());
        let mut input = DecodedInput {
            txid: txin.previous_output.txid.to_string(),
            output_index: txin.previous_output.vout,
            asm: unlock.to_asm(),
            prev_script: None,
            value: None,
            error: None,
        };

        if txin.previous_output.is_null() {
            // Coinbase: there is no previous output to resolve
            return input;
        }

        match resolve_spent_output(
            source,
            &input.txid,
            input.output_index,
            network,
        )
        .await
        {
            Ok((value, detail)) => {
                input.value = Some(value);
                input.prev_script = Some(detail);
            }
            Err(e) => input.error = Some(e),
        }
        input
    });
    let inputs = join_all(input_futures).await;

    let raw_outputs: Vec<RawOutput> = tx
        .output
        .iter()
        .map(|txout| RawOutput {
            value: txout.value.to_sat(),
            script: Script::from_bytes(txout.script_pubkey.as_bytes()),
        })
        .collect();

    let outputs: Vec<DecodedOutput> = raw_outputs
        .iter()
        .map(|raw| DecodedOutput {
            value: subunits_to_coins(raw.value),
            script: classify::parse_script(&raw.script, network),
            tape: tape_record(raw),
        })
        .collect();

    let unlock_scripts: Vec<Script> = tx
        .input
        .iter()
        .map(|txin| Script::from_bytes(txin.script_sig.as_bytes()))
        .collect();
    let tx_type = identify::identify(generation, &unlock_scripts, &raw_outputs);
    let token = match tx_type {
        TransactionType::Unknown => None,
        _ => {
            info!(%txid, ?tx_type, "token protocol recognised");
            Some(identify::summarize(&raw_outputs, tx_type, network))
        }
    };

    Ok(TransactionDetail {
        txid,
        version: tx.version.0,
        lock_time: tx.lock_time.to_consensus_u32(),
        inputs,
        outputs,
        token,
    })
}

/// Attach the decoded tape record to an output that has the tape shape
fn tape_record(output: &RawOutput) -> Option<crate::types::TapeRecord> {
    if identify::is_tape_script(output, token::FT_TAPE_MARKER) {
        tape::decode_tape(&output.script, token::FT_TAPE_MARKER)
    } else if identify::is_tape_script(output, token::NFT_TAPE_MARKER) {
        tape::decode_tape(&output.script, token::NFT_TAPE_MARKER)
    } else {
        None
    }
}

/// Fetch and decode the output a given input spends
async fn resolve_spent_output(
    source: &dyn TxSource,
    txid: &str,
    index: u32,
    network: Network,
) -> Result<(f64, ScriptDetail), InputResolveError> {
    let raw_hex = source
        .raw_transaction(txid, network)
        .await
        .map_err(|e| match e {
            LookupError::NotFound { txid } => InputResolveError::NotFound { txid },
            LookupError::Transport(message) => InputResolveError::Transport { message },
            LookupError::Failed(message) => InputResolveError::Lookup { message },
        })?;

    let prev_tx = parse_envelope(&raw_hex).map_err(|e| InputResolveError::Lookup {
        message: format!("previous transaction undecodable: {}", e),
    })?;

    let output = prev_tx
        .output
        .get(index as usize)
        .ok_or(InputResolveError::IndexOutOfRange {
            index,
            available: prev_tx.output.len(),
        })?;

    let script = Script::from_bytes(output.script_pubkey.as_bytes());
    Ok((
        subunits_to_coins(output.value.to_sat()),
        classify::parse_script(&script, network),
    ))
}
