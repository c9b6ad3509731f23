//! Shared fixtures: transaction builders and a stub lookup source
#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::consensus;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use token_tape_decoder::lookup::{LookupError, TxSource};
use token_tape_decoder::script::opcodes::OP_NOP;
use token_tape_decoder::script::Script;
use token_tape_decoder::token::transfer::CODE_SCRIPT_HASH_OFFSET;
use token_tape_decoder::token::TAPE_AMOUNT_LEN;
use token_tape_decoder::types::Network;

/// A Tape Script: carrier prologue, 48-byte ledger, decimal, name, symbol,
/// closing marker
pub fn tape_script(supply: u64, decimal: u8, name: &str, symbol: &str, marker: &[u8]) -> Script {
    let mut ledger = [0u8; TAPE_AMOUNT_LEN];
    ledger[..8].copy_from_slice(&supply.to_le_bytes());
    let asm = format!(
        "0 OP_RETURN {} {:02x} {} {} {}",
        hex::encode(ledger),
        decimal,
        hex::encode(name.as_bytes()),
        hex::encode(symbol.as_bytes()),
        hex::encode(marker),
    );
    Script::from_asm(&asm).expect("fixture tape script")
}

/// A Code Script body: filler up to the recipient field, then hash + tag
pub fn code_script(hash: &[u8; 20], tag: u8) -> Script {
    let mut bytes = vec![OP_NOP; CODE_SCRIPT_HASH_OFFSET];
    bytes.extend_from_slice(hash);
    bytes.push(tag);
    Script::from_vec(bytes)
}

/// An OP_RETURN output carrying a bare flag string
pub fn flag_script(flag: &[u8]) -> Script {
    Script::from_asm(&format!("0 OP_RETURN {}", hex::encode(flag))).expect("fixture flag script")
}

pub fn p2pkh_script() -> Script {
    Script::from_hex("76a914b770377041443c7eac4a93b721ab7093bdbccaba88ac").unwrap()
}

pub fn txout(value: u64, script: &Script) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey: ScriptBuf::from_bytes(script.as_bytes().to_vec()),
    }
}

pub fn build_tx(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version(2),
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    }
}

/// Consensus encoding needs at least one input, so fixture source
/// transactions get a coinbase-style one
pub fn coinbase_input() -> TxIn {
    TxIn {
        previous_output: OutPoint::null(),
        script_sig: ScriptBuf::from_bytes(vec![0x51]),
        sequence: Sequence::MAX,
        witness: Witness::new(),
    }
}

/// An input spending `vout` of `prev` with an unlocking script of the given
/// byte length
pub fn spending_input(prev: &Transaction, vout: u32, unlock_len: usize) -> TxIn {
    TxIn {
        previous_output: OutPoint {
            txid: prev.compute_txid(),
            vout,
        },
        script_sig: ScriptBuf::from_bytes(vec![0x00; unlock_len]),
        sequence: Sequence::MAX,
        witness: Witness::new(),
    }
}

pub fn raw_hex(tx: &Transaction) -> String {
    hex::encode(consensus::encode::serialize(tx))
}

/// In-memory transaction source keyed by txid
#[derive(Default)]
pub struct StubSource {
    transactions: HashMap<String, String>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tx: &Transaction) -> Self {
        self.transactions
            .insert(tx.compute_txid().to_string(), raw_hex(tx));
        self
    }
}

#[async_trait]
impl TxSource for StubSource {
    async fn raw_transaction(&self, txid: &str, _network: Network) -> Result<String, LookupError> {
        self.transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                txid: txid.to_string(),
            })
    }
}
