//! Shared data model for decoded transactions
//!
//! Every externally visible record lives here with serde derives so the
//! final `TransactionDetail` is directly renderable or storable. Tagged
//! unions replace the original ad hoc object shapes: one closed enum per
//! concept (`ScriptShape`, `TransactionType`, `InputResolveError`) so that
//! exhaustive matching is enforced by the compiler.

use serde::{Deserialize, Serialize};

/// Minor units per display coin (the chain uses 10^6 subunits)
pub const SUBUNITS_PER_COIN: u64 = 1_000_000;

/// Convert an integer subunit amount to the display unit
pub fn subunits_to_coins(subunits: u64) -> f64 {
    subunits as f64 / SUBUNITS_PER_COIN as f64
}

/// Network tag threading through lookup, address encoding and the
/// Code-Script address fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// The other network, used as the address-decoding fallback
    pub fn fallback(self) -> Network {
        match self {
            Network::Mainnet => Network::Testnet,
            Network::Testnet => Network::Mainnet,
        }
    }
}

impl std::str::FromStr for Network {
    type Err = std::convert::Infallible;

    /// Unrecognised strings fall back to mainnet
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "testnet" | "test" => Network::Testnet,
            _ => Network::Mainnet,
        })
    }
}

/// Script shape classification - exactly one variant per script,
/// `Unknown` is the catch-all, never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptShape {
    /// Pay-to-PubKey-Hash; hash is the 20-byte pubkey hash, hex-encoded
    PubKeyHash { hash: String },
    /// Pay-to-PubKey; pubkey is 33 or 65 bytes, hex-encoded
    PubKey { pubkey: String },
    /// Pay-to-Script-Hash; hash is the 20-byte script hash, hex-encoded
    ScriptHash { hash: String },
    /// Multisignature; thresholds are extracted when the template exposes them
    Multisig {
        required: Option<u8>,
        total: Option<u8>,
    },
    /// Data carrier (OP_RETURN); pushes are the hex-encoded data pushes
    /// following the carrier opcode, in script order
    DataCarrier { pushes: Vec<String> },
    Unknown,
}

/// Fully parsed script: disassembly plus classification
///
/// `data` carries the auxiliary OP_RETURN payload of a script that is
/// simultaneously P2PKH and a data carrier - the shape stays `PubKeyHash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDetail {
    pub asm: String,
    pub shape: ScriptShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An output as carried on the wire: subunit value plus raw locking script
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub value: u64,
    pub script: crate::script::Script,
}

/// Precise per-input resolution failure - distinguishes "field absent
/// because decoding failed" from "not applicable"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputResolveError {
    /// The referenced transaction id does not exist
    NotFound { txid: String },
    /// The referenced output index exceeds the previous tx output count
    IndexOutOfRange { index: u32, available: usize },
    /// The lookup failed at the transport level
    Transport { message: String },
    /// Any other lookup or parse failure for the previous transaction
    Lookup { message: String },
}

impl std::fmt::Display for InputResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputResolveError::NotFound { txid } => {
                write!(f, "transaction {} not found", txid)
            }
            InputResolveError::IndexOutOfRange { index, available } => {
                write!(f, "output index {} out of range ({} outputs)", index, available)
            }
            InputResolveError::Transport { message } => write!(f, "transport failure: {}", message),
            InputResolveError::Lookup { message } => write!(f, "lookup failure: {}", message),
        }
    }
}

/// A decoded transaction input
///
/// The unlocking script ASM is always present, even when resolving the
/// spent output failed - a failed lookup still leaves the input inspectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedInput {
    /// Id of the transaction whose output this input spends
    pub txid: String,
    /// Index of the spent output in that transaction
    pub output_index: u32,
    /// Disassembly of this input's unlocking script
    pub asm: String,
    /// Classification of the spent output's locking script, when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_script: Option<ScriptDetail>,
    /// Value of the spent output in display units, when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InputResolveError>,
}

/// A decoded transaction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedOutput {
    /// Value in display units (subunits / 10^6)
    pub value: f64,
    pub script: ScriptDetail,
    /// Tape record decoded from this output, when it is a Tape Script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tape: Option<TapeRecord>,
}

/// Decoded token mint metadata (the "tape record")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeRecord {
    pub name: String,
    pub symbol: String,
    /// Total supply scaled by 10^-decimal
    pub amount: f64,
    pub decimal: u8,
    /// Unscaled sum of the six little-endian ledger words
    pub raw_supply: u128,
}

/// Recipient of a token transfer, as recovered from the Code Script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", content = "value")]
pub enum Recipient {
    /// Tag byte 0: the hash is a spendable address
    Address(String),
    /// Tag byte 1 (or address encoding failed): opaque 20-byte hash, hex
    Hash(String),
}

/// Decoded token transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub recipient: Recipient,
    /// Tape balance scaled by 10^-decimal
    pub amount: f64,
    pub decimal: u8,
    /// Token contract reference, when the auxiliary payload names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

/// Transaction-level token protocol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    FtMint,
    FtTransfer,
    NftCreate,
    NftTransfer,
    CollectionCreate,
    Unknown,
}

/// Protocol generation selector
///
/// The `FtNft` generation identifies purely from outputs and additionally
/// recognises NFT/collection records; the `Ft` generation is FT-only and
/// uses the unlocking-script-length evidence to split mint from transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolGeneration {
    FtNft,
    Ft,
}

impl std::str::FromStr for ProtocolGeneration {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ftnft" | "ft-nft" | "v1" => ProtocolGeneration::FtNft,
            _ => ProtocolGeneration::Ft,
        })
    }
}

/// Token protocol interpretation attached to a decoded transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSummary {
    pub tx_type: TransactionType,
    /// Mint/create record (FT mint, NFT create, collection create)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint: Option<TapeRecord>,
    /// Transfer record (FT or NFT transfer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferRecord>,
    /// Set when the type was identified but payload decoding failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The externally visible aggregate: one fully decoded transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub txid: String,
    pub version: i32,
    pub lock_time: u32,
    pub inputs: Vec<DecodedInput>,
    pub outputs: Vec<DecodedOutput>,
    /// Token protocol payload, absent when no protocol was recognised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenSummary>,
}
