//! Token protocol recognition and decoding
//!
//! The protocol rides inside ordinary outputs: a large "Code Script" output
//! carrying the contract logic is paired with a zero-value "Tape Script"
//! data carrier holding the metadata tape. This module decodes the tape
//! (`tape`), the transfer half (`transfer`), and classifies whole
//! transactions (`identify`).

pub mod identify;
pub mod tape;
pub mod transfer;

/// Marker closing a fungible-token tape record ("FTape")
pub const FT_TAPE_MARKER: &[u8] = b"FTape";
/// Marker closing an NFT tape record ("NTape"), FtNft generation only
pub const NFT_TAPE_MARKER: &[u8] = b"NTape";

/// Flag embedded in the OP_RETURN of a token mint source transaction
pub const FT_MINT_FLAG: &[u8] = b"for ft mint";
/// Flag embedded by transfers that carry an auxiliary info payload
pub const FT_TRANSFER_FLAG: &[u8] = b"FT_TRANSFER";
/// NFT creation flag, FtNft generation only
pub const NFT_MINT_FLAG: &[u8] = b"for nft mint";
/// Collection creation flag, FtNft generation only
pub const COLLECTION_CREATE_FLAG: &[u8] = b"for collection create";

/// Width of the sharded amount ledger: six little-endian u64 words
pub const TAPE_AMOUNT_LEN: usize = 48;
pub const TAPE_AMOUNT_WORDS: usize = 6;
