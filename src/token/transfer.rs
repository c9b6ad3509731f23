//! Transfer-record decoding from Code Script / Tape Script pairs
//!
//! The Code Script embeds the recipient as a 21-byte field (20-byte hash
//! plus a tag byte) at a fixed offset near its end; the adjacent Tape
//! Script carries the transferred balance in its amount ledger.

use tracing::debug;

use super::identify::{is_code_script, is_tape_script};
use super::tape::{normalize_decimal, scale_amount, sum_ledger_words};
use super::TAPE_AMOUNT_LEN;
use crate::address;
use crate::script::{classify, Script};
use crate::types::{Network, RawOutput, Recipient, TransferRecord};

/// Byte offset of the recipient field inside the Code Script
pub const CODE_SCRIPT_HASH_OFFSET: usize = 1537;
/// Recipient field width: 20-byte hash + 1 tag byte
const RECIPIENT_FIELD_LEN: usize = 21;
/// Tag byte marking the hash as a spendable address
const TAG_ADDRESS: u8 = 0x00;
/// Tag byte marking the hash as an opaque reference
const TAG_HASH: u8 = 0x01;

/// Byte offset of the amount ledger inside the Tape Script buffer
/// (two carrier opcodes plus the push-length byte)
const TAPE_BALANCE_OFFSET: usize = 3;

/// Extract the recipient from a Code Script
///
/// Tag 0 means the hash encodes as an address - the hint network is tried
/// first, then the fallback network, then the raw hash is surfaced. Tag 1
/// means the hash is an opaque reference and is passed through verbatim.
pub fn recipient_from_code_script(script: &Script, network: Network) -> Option<Recipient> {
    let bytes = script.as_bytes();
    if bytes.len() < CODE_SCRIPT_HASH_OFFSET + RECIPIENT_FIELD_LEN {
        return None;
    }

    let field = &bytes[CODE_SCRIPT_HASH_OFFSET..CODE_SCRIPT_HASH_OFFSET + RECIPIENT_FIELD_LEN];
    let hash = &field[..20];
    let tag = field[20];

    match tag {
        TAG_ADDRESS => {
            let encoded = address::hash_to_address(hash, network)
                .or_else(|_| address::hash_to_address(hash, network.fallback()));
            Some(match encoded {
                Ok(addr) => Recipient::Address(addr),
                Err(_) => Recipient::Hash(hex::encode(hash)),
            })
        }
        TAG_HASH => Some(Recipient::Hash(hex::encode(hash))),
        _ => None,
    }
}

/// Read the balance ledger of a Tape Script at its fixed buffer offset
pub fn balance_from_tape(script: &Script) -> u128 {
    let bytes = script.as_bytes();
    let end = TAPE_BALANCE_OFFSET + TAPE_AMOUNT_LEN;
    if bytes.len() < end {
        return 0;
    }
    sum_ledger_words(&bytes[TAPE_BALANCE_OFFSET..end])
}

/// The decimal field of a Tape Script, when the structured layout exposes it
pub fn decimal_from_tape(script: &Script) -> Option<u8> {
    let chunks = script.chunks();
    let pushes = classify::carrier_pushes(&chunks)?;
    let decimal = hex::decode(pushes.get(1)?).ok()?;
    if decimal.len() == 1 {
        Some(decimal[0])
    } else {
        None
    }
}

/// Decode a transfer record from the output set
///
/// The first adjacent Code+Tape pair is the recipient's (change pairs come
/// later); when no adjacent pair exists the two halves are searched for
/// independently. An auxiliary OP_RETURN carrying a transfer-info JSON
/// payload overrides the extracted fields.
pub fn decode_transfer(
    outputs: &[RawOutput],
    network: Network,
    tape_marker: &[u8],
) -> Option<TransferRecord> {
    let (code, tape) = find_pair(outputs, tape_marker)?;

    let recipient = code.and_then(|o| recipient_from_code_script(&o.script, network));
    let (amount, decimal) = match tape {
        Some(o) => {
            let decimal = normalize_decimal(decimal_from_tape(&o.script));
            (scale_amount(balance_from_tape(&o.script), decimal), decimal)
        }
        None => (0.0, normalize_decimal(None)),
    };

    if let Some(record) = auxiliary_transfer_info(outputs, recipient.clone(), amount, decimal) {
        return Some(record);
    }

    let recipient = recipient?;
    Some(TransferRecord {
        recipient,
        amount,
        decimal,
        contract: None,
    })
}

/// Locate the recipient's Code and Tape outputs
///
/// Prefers the first adjacent (Code, Tape) pair; falls back to the first
/// output matching each shape anywhere in the set. Returns `None` when
/// neither half is present.
fn find_pair<'a>(
    outputs: &'a [RawOutput],
    tape_marker: &[u8],
) -> Option<(Option<&'a RawOutput>, Option<&'a RawOutput>)> {
    for pair in outputs.windows(2) {
        if is_code_script(&pair[0]) && is_tape_script(&pair[1], tape_marker) {
            return Some((Some(&pair[0]), Some(&pair[1])));
        }
    }

    let code = outputs.iter().find(|o| is_code_script(o));
    let tape = outputs.iter().find(|o| is_tape_script(o, tape_marker));
    if code.is_none() && tape.is_none() {
        return None;
    }
    Some((code, tape))
}

/// Scan for an auxiliary OP_RETURN whose payload is a transfer-info JSON
/// object, and merge it with the script-extracted fields
fn auxiliary_transfer_info(
    outputs: &[RawOutput],
    recipient: Option<Recipient>,
    amount: f64,
    decimal: u8,
) -> Option<TransferRecord> {
    for output in outputs {
        let chunks = output.script.chunks();
        let Some(pushes) = classify::carrier_pushes(&chunks) else {
            continue;
        };
        let bytes = match hex::decode(pushes.concat()) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let Ok(text) = std::str::from_utf8(&bytes) else {
            continue;
        };
        if !text.trim_start().starts_with('{') {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
            continue;
        };
        if value.get("flag").and_then(|f| f.as_str()) != Some("FT_TRANSFER") {
            continue;
        }

        debug!("transfer decoded from auxiliary info payload");
        let aux_recipient = value
            .get("address")
            .and_then(|a| a.as_str())
            .filter(|a| !a.is_empty())
            .map(|a| Recipient::Address(a.to_string()))
            .or(recipient);
        let aux_amount = value.get("ft_amount").and_then(|a| a.as_f64());
        let contract = value
            .get("ft_contract_address")
            .and_then(|c| c.as_str())
            .map(str::to_string);

        return Some(TransferRecord {
            recipient: aux_recipient?,
            amount: aux_amount.unwrap_or(amount),
            decimal,
            contract,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::opcodes::OP_NOP;

    /// A Code Script body: filler opcodes up to the recipient field offset,
    /// then hash + tag
    pub fn build_code_script(hash: &[u8; 20], tag: u8) -> Script {
        let mut bytes = vec![OP_NOP; CODE_SCRIPT_HASH_OFFSET];
        bytes.extend_from_slice(hash);
        bytes.push(tag);
        Script::from_vec(bytes)
    }

    fn build_balance_tape(balance: u64, decimal: u8) -> Script {
        let mut ledger = [0u8; TAPE_AMOUNT_LEN];
        ledger[..8].copy_from_slice(&balance.to_le_bytes());
        let asm = format!(
            "0 OP_RETURN {} {:02x} {} {} {}",
            hex::encode(ledger),
            decimal,
            hex::encode(b"Test"),
            hex::encode(b"TST"),
            hex::encode(crate::token::FT_TAPE_MARKER),
        );
        Script::from_asm(&asm).unwrap()
    }

    #[test]
    fn test_recipient_tag_zero_is_address() {
        let hash = [0x11u8; 20];
        let script = build_code_script(&hash, 0x00);
        let recipient = recipient_from_code_script(&script, Network::Mainnet).unwrap();
        match recipient {
            Recipient::Address(addr) => {
                let (decoded, _) = address::address_to_hash(&addr).unwrap();
                assert_eq!(decoded, hash);
            }
            other => panic!("expected address, got {:?}", other),
        }
    }

    #[test]
    fn test_recipient_tag_one_is_opaque_hash() {
        let hash = [0x22u8; 20];
        let script = build_code_script(&hash, 0x01);
        assert_eq!(
            recipient_from_code_script(&script, Network::Mainnet),
            Some(Recipient::Hash(hex::encode(hash)))
        );
    }

    #[test]
    fn test_recipient_unknown_tag_is_none() {
        let script = build_code_script(&[0x33u8; 20], 0x02);
        assert!(recipient_from_code_script(&script, Network::Mainnet).is_none());
    }

    #[test]
    fn test_short_code_script_is_none() {
        let script = Script::from_vec(vec![OP_NOP; 100]);
        assert!(recipient_from_code_script(&script, Network::Mainnet).is_none());
    }

    #[test]
    fn test_balance_from_tape() {
        let tape = build_balance_tape(123_450_000, 6);
        assert_eq!(balance_from_tape(&tape), 123_450_000);
        assert_eq!(decimal_from_tape(&tape), Some(6));
    }

    #[test]
    fn test_balance_of_short_script_is_zero() {
        let script = Script::from_hex("006a").unwrap();
        assert_eq!(balance_from_tape(&script), 0);
    }

    #[test]
    fn test_decode_transfer_from_adjacent_pair() {
        let hash = [0x44u8; 20];
        let outputs = vec![
            RawOutput {
                value: 500,
                script: build_code_script(&hash, 0x00),
            },
            RawOutput {
                value: 0,
                script: build_balance_tape(1_500_000, 6),
            },
        ];
        let record =
            decode_transfer(&outputs, Network::Mainnet, crate::token::FT_TAPE_MARKER).unwrap();
        assert!(matches!(record.recipient, Recipient::Address(_)));
        assert_eq!(record.amount, 1.5);
        assert_eq!(record.decimal, 6);
        assert!(record.contract.is_none());
    }

    #[test]
    fn test_auxiliary_info_overrides_fields() {
        let info = serde_json::json!({
            "flag": "FT_TRANSFER",
            "address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "ft_amount": 42.5,
            "ft_contract_address": "abcdef".repeat(5),
        });
        let payload = hex::encode(info.to_string().as_bytes());
        let outputs = vec![
            RawOutput {
                value: 500,
                script: build_code_script(&[0x55u8; 20], 0x00),
            },
            RawOutput {
                value: 0,
                script: build_balance_tape(9_000_000, 6),
            },
            RawOutput {
                value: 0,
                script: Script::from_asm(&format!("0 OP_RETURN {}", payload)).unwrap(),
            },
        ];
        let record =
            decode_transfer(&outputs, Network::Mainnet, crate::token::FT_TAPE_MARKER).unwrap();
        assert_eq!(
            record.recipient,
            Recipient::Address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string())
        );
        assert_eq!(record.amount, 42.5);
        assert_eq!(record.contract.as_deref(), Some("abcdefabcdefabcdefabcdefabcdef"));
    }

    #[test]
    fn test_decode_transfer_without_any_half_is_none() {
        let outputs = vec![RawOutput {
            value: 1_000_000,
            script: Script::from_hex("76a914b770377041443c7eac4a93b721ab7093bdbccaba88ac")
                .unwrap(),
        }];
        assert!(decode_transfer(&outputs, Network::Mainnet, crate::token::FT_TAPE_MARKER).is_none());
    }
}
