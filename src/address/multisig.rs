//! Custom multi-signature addresses
//!
//! The scheme packs the signature threshold pair into the address version
//! byte: `(required << 4) | total`, ahead of a hash160 over the concatenated
//! pubkeys. The locking script is a fixed parametric template (split/pick/
//! concatenate/hash-check) sized by the total key count, so the address can
//! be reconstructed from the script without the pubkeys themselves.

use bitcoin::base58;
use bitcoin::hashes::{hash160, sha256, Hash};

use super::AddressError;
use crate::script::opcodes::small_number_name;
use crate::script::Script;

/// Legal signature-threshold range
const REQUIRED_RANGE: std::ops::RangeInclusive<u8> = 1..=6;
/// Legal total-key range
const TOTAL_RANGE: std::ops::RangeInclusive<u8> = 3..=10;

fn validate_thresholds(required: u8, total: u8) -> Result<(), AddressError> {
    if !REQUIRED_RANGE.contains(&required)
        || !TOTAL_RANGE.contains(&total)
        || required > total
    {
        return Err(AddressError::InvalidThresholds { required, total });
    }
    Ok(())
}

fn encode_with_thresholds(required: u8, total: u8, hash: &[u8; 20]) -> String {
    let prefix = (required << 4) | (total & 0x0f);
    let mut payload = Vec::with_capacity(21);
    payload.push(prefix);
    payload.extend_from_slice(hash);
    base58::encode_check(&payload)
}

/// Derive the multisig address for an ordered pubkey set
///
/// The caller supplies the pubkeys in canonical order; the hash commits to
/// that order. Thresholds outside [1,6] x [3,10], or required > total, are
/// rejected before any encoding happens.
pub fn derive_multisig_address<S: AsRef<str>>(
    pubkeys: &[S],
    required: u8,
    total: u8,
) -> Result<String, AddressError> {
    validate_thresholds(required, total)?;

    let mut combined = Vec::new();
    for pubkey in pubkeys {
        let bytes = hex::decode(pubkey.as_ref())
            .map_err(|_| AddressError::InvalidPubkey(pubkey.as_ref().to_string()))?;
        combined.extend_from_slice(&bytes);
    }

    let hash = hash160::Hash::hash(&combined).to_byte_array();
    Ok(encode_with_thresholds(required, total, &hash))
}

/// Extract the (required, total) threshold pair from a multisig address
///
/// The checksum is verified; the two 4-bit fields come from the decoded
/// version byte.
pub fn parse_thresholds(address: &str) -> Result<(u8, u8), AddressError> {
    let payload =
        base58::decode_check(address).map_err(|e| AddressError::Base58(e.to_string()))?;
    if payload.len() != 21 {
        return Err(AddressError::WrongLength(payload.len()));
    }
    let prefix = payload[0];
    Ok(((prefix >> 4) & 0x0f, prefix & 0x0f))
}

/// The canonical unlocking-script template for a threshold pair and hash
fn template_asm(required: u8, total: u8, hash_hex: &str) -> Result<String, AddressError> {
    validate_thresholds(required, total)?;
    let op_m = small_number_name(required)
        .ok_or(AddressError::InvalidThresholds { required, total })?;
    let op_n = small_number_name(total)
        .ok_or(AddressError::InvalidThresholds { required, total })?;
    let op_pick_depth = small_number_name(total - 1)
        .ok_or(AddressError::InvalidThresholds { required, total })?;

    let mut parts: Vec<String> = vec![op_m.to_string(), "OP_SWAP".to_string()];
    // Split the concatenated-pubkey blob into 33-byte (0x21) segments
    for _ in 0..total - 1 {
        parts.push("21".to_string());
        parts.push("OP_SPLIT".to_string());
    }
    for _ in 0..total {
        parts.push(op_pick_depth.to_string());
        parts.push("OP_PICK".to_string());
    }
    for _ in 0..total - 1 {
        parts.push("OP_CAT".to_string());
    }
    parts.push("OP_HASH160".to_string());
    parts.push(hash_hex.to_string());
    parts.push("OP_EQUALVERIFY".to_string());
    parts.push(op_n.to_string());
    parts.push("OP_CHECKMULTISIG".to_string());

    Ok(parts.join(" "))
}

/// Reconstruct the canonical locking-script ASM for a multisig address
pub fn lock_script_asm(address: &str) -> Result<String, AddressError> {
    let payload =
        base58::decode_check(address).map_err(|e| AddressError::Base58(e.to_string()))?;
    if payload.len() != 21 {
        return Err(AddressError::WrongLength(payload.len()));
    }
    let (required, total) = ((payload[0] >> 4) & 0x0f, payload[0] & 0x0f);
    template_asm(required, total, &hex::encode(&payload[1..21]))
}

/// Parse the canonical template back out of an ASM string
///
/// Only the fixed, parametrized grammar is recognised: the (m, n, hash)
/// triple is extracted, the template regenerated from it, and the token
/// sequences compared. A generic pubkey-list multisig form returns `None`.
pub fn address_from_asm(asm: &str) -> Option<String> {
    let tokens: Vec<&str> = asm.split_whitespace().collect();
    if tokens.last() != Some(&"OP_CHECKMULTISIG") {
        return None;
    }

    let hash160_pos = tokens.iter().position(|t| *t == "OP_HASH160")?;
    let hash_hex = tokens.get(hash160_pos + 1)?;
    if hash_hex.len() != 40 || !hash_hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    if tokens.get(hash160_pos + 2) != Some(&"OP_EQUALVERIFY") {
        return None;
    }

    let required = small_number_value(tokens.first()?)?;
    let total = small_number_value(tokens.get(hash160_pos + 3)?)?;

    // Accept only the exact parametric grammar
    let expected = template_asm(required, total, &hash_hex.to_ascii_lowercase()).ok()?;
    let expected_tokens: Vec<&str> = expected.split_whitespace().collect();
    let lowered: Vec<String> = tokens
        .iter()
        .map(|t| {
            if t.starts_with("OP_") || *t == "0" || *t == "-1" {
                t.to_string()
            } else {
                t.to_ascii_lowercase()
            }
        })
        .collect();
    if lowered != expected_tokens {
        return None;
    }

    let hash_bytes = hex::decode(hash_hex).ok()?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&hash_bytes);
    Some(encode_with_thresholds(required, total, &hash))
}

/// Hash used to reference the multisig contract: hash160 over the sha256 of
/// the locking script bytes, hex-encoded with a trailing `01` tag
pub fn combine_hash(address: &str) -> Result<String, AddressError> {
    let asm = lock_script_asm(address)?;
    let script = Script::from_asm(&asm).map_err(|e| AddressError::Script(e.to_string()))?;
    let sha = sha256::Hash::hash(script.as_bytes()).to_byte_array();
    let hash = hash160::Hash::hash(&sha).to_byte_array();
    Ok(format!("{}01", hex::encode(hash)))
}

fn small_number_value(token: &str) -> Option<u8> {
    token.strip_prefix("OP_")?.parse::<u8>().ok().filter(|n| (1..=16).contains(n))
}
