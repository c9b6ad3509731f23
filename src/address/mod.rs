//! Base58Check address codec
//!
//! Converts between 20-byte hashes and checksummed display addresses.
//! Encode/decode are mutual inverses for well-formed inputs; a corrupted
//! checksum is rejected, never silently accepted.

pub mod multisig;

use bitcoin::base58;
use bitcoin::hashes::{hash160, Hash};
use thiserror::Error;

use crate::types::Network;

/// Version byte for mainnet pubkey-hash addresses
const VERSION_MAINNET: u8 = 0x00;
/// Version byte for testnet pubkey-hash addresses
const VERSION_TESTNET: u8 = 0x6f;

/// Address encoding/decoding failures
#[derive(Debug, Error)]
pub enum AddressError {
    /// Base58 decoding or checksum verification failed
    #[error("base58 decode failed: {0}")]
    Base58(String),

    /// Payload is not the expected version + 20-byte hash
    #[error("decoded payload has wrong length: {0} bytes")]
    WrongLength(usize),

    /// Hash input is not 20 bytes
    #[error("hash must be 20 bytes, got {0}")]
    WrongHashLength(usize),

    /// Version byte does not belong to a known network
    #[error("unknown address version byte: 0x{0:02x}")]
    UnknownVersion(u8),

    /// Multisig thresholds outside [1,6] x [3,10] or required > total
    #[error("invalid multisig thresholds: {required} of {total}")]
    InvalidThresholds { required: u8, total: u8 },

    /// A supplied pubkey was not valid hex
    #[error("invalid pubkey hex: {0}")]
    InvalidPubkey(String),

    /// Internal script assembly failure
    #[error("script assembly failed: {0}")]
    Script(String),
}

fn version_byte(network: Network) -> u8 {
    match network {
        Network::Mainnet => VERSION_MAINNET,
        Network::Testnet => VERSION_TESTNET,
    }
}

/// Encode a 20-byte hash as a checksummed display address
pub fn hash_to_address(hash: &[u8], network: Network) -> Result<String, AddressError> {
    if hash.len() != 20 {
        return Err(AddressError::WrongHashLength(hash.len()));
    }
    let mut payload = Vec::with_capacity(21);
    payload.push(version_byte(network));
    payload.extend_from_slice(hash);
    Ok(base58::encode_check(&payload))
}

/// Decode a display address back to its 20-byte hash and network tag
///
/// Fails on checksum mismatch, wrong payload length or unknown version.
pub fn address_to_hash(address: &str) -> Result<([u8; 20], Network), AddressError> {
    let payload =
        base58::decode_check(address).map_err(|e| AddressError::Base58(e.to_string()))?;
    if payload.len() != 21 {
        return Err(AddressError::WrongLength(payload.len()));
    }
    let network = match payload[0] {
        VERSION_MAINNET => Network::Mainnet,
        VERSION_TESTNET => Network::Testnet,
        v => return Err(AddressError::UnknownVersion(v)),
    };
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..21]);
    Ok((hash, network))
}

/// Derive the display address of a public key (hash160 then Base58Check)
pub fn pubkey_to_address(pubkey: &[u8], network: Network) -> String {
    let hash = hash160::Hash::hash(pubkey).to_byte_array();
    let mut payload = Vec::with_capacity(21);
    payload.push(version_byte(network));
    payload.extend_from_slice(&hash);
    base58::encode_check(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_HEX: &str = "b770377041443c7eac4a93b721ab7093bdbccaba";

    #[test]
    fn test_round_trip_mainnet() {
        let hash = hex::decode(HASH_HEX).unwrap();
        let addr = hash_to_address(&hash, Network::Mainnet).unwrap();
        let (decoded, network) = address_to_hash(&addr).unwrap();
        assert_eq!(decoded.as_slice(), hash.as_slice());
        assert_eq!(network, Network::Mainnet);
    }

    #[test]
    fn test_round_trip_testnet() {
        let hash = hex::decode(HASH_HEX).unwrap();
        let addr = hash_to_address(&hash, Network::Testnet).unwrap();
        let (decoded, network) = address_to_hash(&addr).unwrap();
        assert_eq!(decoded.as_slice(), hash.as_slice());
        assert_eq!(network, Network::Testnet);
    }

    #[test]
    fn test_known_genesis_address() {
        // hash160 of the genesis coinbase pubkey
        let hash = hex::decode("62e907b15cbf27d5425399ebf6f0fb50ebb88f18").unwrap();
        let addr = hash_to_address(&hash, Network::Mainnet).unwrap();
        assert_eq!(addr, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
    }

    #[test]
    fn test_corrupted_checksum_is_rejected() {
        let hash = hex::decode(HASH_HEX).unwrap();
        let addr = hash_to_address(&hash, Network::Mainnet).unwrap();
        // Flip the final character (part of the checksum region)
        let mut corrupted: Vec<char> = addr.chars().collect();
        let last = *corrupted.last().unwrap();
        *corrupted.last_mut().unwrap() = if last == '1' { '2' } else { '1' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(address_to_hash(&corrupted).is_err());
    }

    #[test]
    fn test_wrong_hash_length_is_rejected() {
        let short = vec![0u8; 19];
        assert!(matches!(
            hash_to_address(&short, Network::Mainnet),
            Err(AddressError::WrongHashLength(19))
        ));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut payload = vec![0x42u8];
        payload.extend_from_slice(&[0u8; 20]);
        let addr = base58::encode_check(&payload);
        assert!(matches!(
            address_to_hash(&addr),
            Err(AddressError::UnknownVersion(0x42))
        ));
    }
}
