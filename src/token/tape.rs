//! Tape Script decoding
//!
//! A tape is a data-carrier script of the form
//! `OP_0 OP_RETURN <amount:48> <decimal:1> <name> <symbol> <marker:5>`.
//! Decoding tries the structured chunk match first and falls back to fixed
//! byte offsets on the raw buffer - a short-circuiting pipeline of fallible
//! strategies, never an error.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use super::{TAPE_AMOUNT_LEN, TAPE_AMOUNT_WORDS};
use crate::script::{classify, Script};
use crate::types::TapeRecord;

/// Decimal used when the tape does not carry a valid one
pub const DEFAULT_DECIMAL: u8 = 6;
/// Upper bound the decimal field is clamped to
pub const MAX_DECIMAL: u8 = 100;

/// Decode a tape record from a script, trying the structured chunk match
/// then the fixed-offset buffer fallback
pub fn decode_tape(script: &Script, marker: &[u8]) -> Option<TapeRecord> {
    if let Some(record) = decode_structured(script, marker) {
        return Some(record);
    }
    decode_buffer(script, marker)
}

/// Structured match over the data-carrier pushes
///
/// Requires at least four pushes with the amount ledger, decimal, name and
/// symbol at fixed positions. A fifth push, when present, must be the tape
/// marker for the requested protocol generation.
fn decode_structured(script: &Script, marker: &[u8]) -> Option<TapeRecord> {
    let chunks = script.chunks();
    let pushes = classify::carrier_pushes(&chunks)?;
    if pushes.len() < 4 {
        return None;
    }

    let amount = hex::decode(&pushes[0]).ok()?;
    let decimal_bytes = hex::decode(&pushes[1]).ok()?;
    let name_bytes = hex::decode(&pushes[2]).ok()?;
    let symbol_bytes = hex::decode(&pushes[3]).ok()?;

    if amount.len() < TAPE_AMOUNT_LEN || decimal_bytes.len() != 1 {
        return None;
    }
    if let Some(tail) = pushes.get(4) {
        if hex::decode(tail).ok()? != marker {
            return None;
        }
    }

    let raw_supply = sum_ledger_words(&amount);
    let decimal = normalize_decimal(Some(decimal_bytes[0]));
    Some(build_record(raw_supply, decimal, &name_bytes, &symbol_bytes))
}

/// Fixed-offset fallback on the raw script buffer
///
/// Skips the two-opcode carrier prologue plus the push-length byte, skips
/// the 48-byte ledger, reads the decimal, then searches forward for the
/// marker and splits the bytes in between evenly into name and symbol.
fn decode_buffer(script: &Script, marker: &[u8]) -> Option<TapeRecord> {
    let bytes = script.as_bytes();
    if bytes.len() < 3 {
        return None;
    }

    // OP_0 OP_RETURN, then the ledger starts after its push-length byte
    let ledger_start = 3;
    let decimal_pos = ledger_start + TAPE_AMOUNT_LEN;
    if decimal_pos >= bytes.len() {
        return None;
    }
    let decimal = normalize_decimal(Some(bytes[decimal_pos]));

    let search_from = decimal_pos + 1;
    let marker_pos = find_subslice(&bytes[search_from..], marker)? + search_from;

    // No delimiter between name and symbol at this level - split evenly
    let middle = &bytes[search_from..marker_pos];
    let mid = middle.len() / 2;
    let (name_bytes, symbol_bytes) = middle.split_at(mid);

    let raw_supply = sum_ledger_words(&bytes[ledger_start..decimal_pos]);
    debug!(raw_supply, decimal, "tape decoded via buffer fallback");

    // The even split is a last resort; report hex rather than risk garbled
    // text from misaligned field boundaries
    let name = non_empty_or(hex::encode(name_bytes), "Unknown");
    let symbol = non_empty_or(hex::encode(symbol_bytes), "UNK");
    Some(TapeRecord {
        name,
        symbol,
        amount: scale_amount(raw_supply, decimal),
        decimal,
        raw_supply,
    })
}

/// Sum the six little-endian u64 ledger words into one unsigned total
pub fn sum_ledger_words(ledger: &[u8]) -> u128 {
    let mut total: u128 = 0;
    for word in 0..TAPE_AMOUNT_WORDS {
        let offset = word * 8;
        if offset + 8 > ledger.len() {
            break;
        }
        total += LittleEndian::read_u64(&ledger[offset..offset + 8]) as u128;
    }
    total
}

/// Clamp the decimal field to [0,100], defaulting to 6 when absent
pub fn normalize_decimal(decimal: Option<u8>) -> u8 {
    match decimal {
        Some(d) => d.min(MAX_DECIMAL),
        None => DEFAULT_DECIMAL,
    }
}

/// Scale a raw ledger total by 10^-decimal, rounded to `decimal` places
pub fn scale_amount(raw: u128, decimal: u8) -> f64 {
    let divisor = 10f64.powi(decimal as i32);
    let value = raw as f64 / divisor;
    if !value.is_finite() {
        return 0.0;
    }
    value
}

/// Render a raw ledger total in the display unit without scientific notation
pub fn format_token_amount(raw: u128, decimal: u8) -> String {
    let decimal = decimal as usize;
    if decimal == 0 {
        return raw.to_string();
    }
    let digits = raw.to_string();
    let (int_part, frac_part) = if digits.len() > decimal {
        let (i, f) = digits.split_at(digits.len() - decimal);
        (i.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimal))
    };
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Decode a pushed byte string as Latin text
///
/// Trailing NULs are stripped and surrounding whitespace trimmed. When the
/// bytes are not reasonably printable (under a 1:2 printable-ASCII ratio),
/// the raw hex is reported instead of fabricating garbled text.
pub fn decode_text_field(bytes: &[u8]) -> String {
    let stripped: &[u8] = {
        let mut end = bytes.len();
        while end > 0 && bytes[end - 1] == 0 {
            end -= 1;
        }
        &bytes[..end]
    };
    if stripped.is_empty() {
        return String::new();
    }

    let printable = stripped
        .iter()
        .filter(|b| (0x20..=0x7e).contains(*b))
        .count();
    if printable * 2 < stripped.len() {
        return hex::encode(stripped);
    }

    stripped
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}

/// First occurrence of `needle` inside `haystack`
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn build_record(raw_supply: u128, decimal: u8, name_bytes: &[u8], symbol_bytes: &[u8]) -> TapeRecord {
    let name = non_empty_or(decode_text_field(name_bytes), "Unknown");
    let symbol = non_empty_or(decode_text_field(symbol_bytes), "UNK");
    TapeRecord {
        name,
        symbol,
        amount: scale_amount(raw_supply, decimal),
        decimal,
        raw_supply,
    }
}

/// The default record reported for a mint source transaction whose tape is
/// not present in this transaction
pub fn placeholder_record() -> TapeRecord {
    TapeRecord {
        name: "Unknown".to_string(),
        symbol: "UNK".to_string(),
        amount: 0.0,
        decimal: DEFAULT_DECIMAL,
        raw_supply: 0,
    }
}
