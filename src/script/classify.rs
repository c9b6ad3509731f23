//! Script shape classification
//!
//! Classification is total: every script maps to exactly one `ScriptShape`,
//! with `Unknown` as the catch-all. Matching order is load-bearing for
//! ambiguous inputs: P2PKH first (a P2PKH script may also carry a trailing
//! data payload and must stay P2PKH), then P2PK, P2SH, data carrier, and
//! finally multisig by bare presence of OP_CHECKMULTISIG.

use tracing::debug;

use super::opcodes::{
    OP_0, OP_16, OP_1, OP_CHECKMULTISIG, OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY,
    OP_HASH160, OP_RETURN,
};
use super::{Chunk, Script};
use crate::address;
use crate::types::{Network, ScriptDetail, ScriptShape};

const HASH_LEN: usize = 20;
const PUBKEY_COMPRESSED_LEN: usize = 33;
const PUBKEY_UNCOMPRESSED_LEN: usize = 65;

/// Classify a chunk sequence into its script shape
pub fn classify(chunks: &[Chunk]) -> ScriptShape {
    if let Some(hash) = p2pkh_hash(chunks) {
        return ScriptShape::PubKeyHash {
            hash: hex::encode(hash),
        };
    }

    if let Some(pubkey) = p2pk_pubkey(chunks) {
        return ScriptShape::PubKey {
            pubkey: hex::encode(pubkey),
        };
    }

    if let Some(hash) = p2sh_hash(chunks) {
        return ScriptShape::ScriptHash {
            hash: hex::encode(hash),
        };
    }

    if let Some(pushes) = carrier_pushes(chunks) {
        return ScriptShape::DataCarrier { pushes };
    }

    if chunks.iter().any(|c| c.opcode == OP_CHECKMULTISIG) {
        let (required, total) = multisig_thresholds(chunks);
        return ScriptShape::Multisig { required, total };
    }

    ScriptShape::Unknown
}

/// The 20-byte hash of a P2PKH script, if the 5-token prefix pattern holds
///
/// Trailing chunks (e.g. an appended OP_RETURN payload) are permitted.
fn p2pkh_hash(chunks: &[Chunk]) -> Option<&[u8]> {
    if chunks.len() < 5 {
        return None;
    }
    if chunks[0].opcode != OP_DUP
        || chunks[1].opcode != OP_HASH160
        || chunks[3].opcode != OP_EQUALVERIFY
        || chunks[4].opcode != OP_CHECKSIG
    {
        return None;
    }
    // A miscounted hash length forces Unknown rather than a wrong extraction
    match chunks[2].data.as_deref() {
        Some(hash) if hash.len() == HASH_LEN => Some(hash),
        _ => None,
    }
}

/// The pubkey of a P2PK script: exactly `<pubkey> OP_CHECKSIG`
fn p2pk_pubkey(chunks: &[Chunk]) -> Option<&[u8]> {
    if chunks.len() != 2 || chunks[1].opcode != OP_CHECKSIG {
        return None;
    }
    match chunks[0].data.as_deref() {
        Some(key) if key.len() == PUBKEY_COMPRESSED_LEN || key.len() == PUBKEY_UNCOMPRESSED_LEN => {
            Some(key)
        }
        _ => None,
    }
}

/// The 20-byte hash of a P2SH script: exactly `OP_HASH160 <hash> OP_EQUAL`
fn p2sh_hash(chunks: &[Chunk]) -> Option<&[u8]> {
    if chunks.len() != 3 || chunks[0].opcode != OP_HASH160 || chunks[2].opcode != OP_EQUAL {
        return None;
    }
    match chunks[1].data.as_deref() {
        Some(hash) if hash.len() == HASH_LEN => Some(hash),
        _ => None,
    }
}

/// Hex-encoded data pushes following the data-carrier opcode, in order
///
/// Handles both the bare `OP_RETURN ...` form and the spendable-data-output
/// idiom `OP_0 OP_RETURN ...`. Collection stops at the first chunk that is
/// not a data push. Returns `None` when no carrier opcode is present.
pub fn carrier_pushes(chunks: &[Chunk]) -> Option<Vec<String>> {
    let pos = chunks.iter().position(|c| c.opcode == OP_RETURN)?;
    if pos > 0 && chunks[pos - 1].opcode == OP_0 {
        debug!("data carrier uses the spendable false-push prologue");
    }
    let pushes = chunks[pos + 1..]
        .iter()
        .map_while(|c| c.data.as_deref().map(hex::encode))
        .collect();
    Some(pushes)
}

/// Extract (required, total) from a multisig-bearing chunk sequence when the
/// surrounding small-number opcodes expose them
fn multisig_thresholds(chunks: &[Chunk]) -> (Option<u8>, Option<u8>) {
    let small = |c: &Chunk| -> Option<u8> {
        if c.data.is_none() && (OP_1..=OP_16).contains(&c.opcode) {
            Some(c.opcode - OP_1 + 1)
        } else {
            None
        }
    };
    let required = chunks.first().and_then(small);
    let total = chunks
        .iter()
        .position(|c| c.opcode == OP_CHECKMULTISIG)
        .and_then(|pos| pos.checked_sub(1))
        .and_then(|prev| small(&chunks[prev]));
    (required, total)
}

/// Parse a script: disassemble, classify and derive the display address
pub fn parse_script(script: &Script, network: Network) -> ScriptDetail {
    let chunks = script.chunks();
    let asm = script.to_asm();
    let shape = classify(&chunks);

    let address = match &shape {
        ScriptShape::PubKeyHash { hash } => hex::decode(hash)
            .ok()
            .and_then(|h| address::hash_to_address(&h, network).ok()),
        ScriptShape::PubKey { pubkey } => hex::decode(pubkey)
            .ok()
            .map(|k| address::pubkey_to_address(&k, network)),
        ScriptShape::Multisig { .. } => address::multisig::address_from_asm(&asm),
        _ => None,
    };

    // A P2PKH script can simultaneously carry a data payload; surface it
    // through the auxiliary field instead of folding it into DataCarrier
    let data = match &shape {
        ScriptShape::PubKeyHash { .. } => {
            carrier_pushes(&chunks).map(|pushes| pushes.join(" "))
        }
        _ => None,
    };

    ScriptDetail {
        asm,
        shape,
        address,
        data,
    }
}
