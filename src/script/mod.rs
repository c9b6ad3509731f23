//! Script disassembly: byte serialization to chunks and ASM
//!
//! The disassembler is the leaf dependency for everything else. It must
//! tolerate truncated or malformed scripts: chunk extraction stops at the
//! first inconsistency and returns what was decoded so far, so callers that
//! need fields beyond the truncation point see absence, not a panic.

pub mod classify;
pub mod opcodes;

use self::opcodes::{opcode_from_name, opcode_name, OP_0, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};

/// A single opcode or data push extracted from a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub opcode: u8,
    /// Payload for data-push chunks; `None` for bare opcodes
    pub data: Option<Vec<u8>>,
}

impl Chunk {
    pub fn op(opcode: u8) -> Self {
        Chunk { opcode, data: None }
    }

    /// ASM token for this chunk
    pub fn to_asm_token(&self) -> String {
        if let Some(data) = &self.data {
            return hex::encode(data);
        }
        match self.opcode {
            OP_0 => "0".to_string(),
            op => opcode_name(op)
                .map(str::to_string)
                .unwrap_or_else(|| format!("OP_UNKNOWN_0x{:02x}", op)),
        }
    }
}

/// A script, represented as a byte vector newtype
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        Ok(Script(hex::decode(hex_str.trim())?))
    }

    /// Assemble a script from a space-separated ASM string
    ///
    /// Known mnemonics become opcodes; every other token is treated as a
    /// hex data push with a minimal push prefix.
    pub fn from_asm(asm: &str) -> Result<Self, crate::errors::AppError> {
        let mut bytes = Vec::new();
        for token in asm.split_whitespace() {
            if let Some(op) = opcode_from_name(token) {
                bytes.push(op);
            } else {
                let data = hex::decode(token).map_err(|_| {
                    crate::errors::AppError::ScriptParse(format!("invalid ASM token: {}", token))
                })?;
                push_data_prefix(data.len(), &mut bytes);
                bytes.extend_from_slice(&data);
            }
        }
        Ok(Script(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decompose into ordered chunks, stopping at the first inconsistency
    ///
    /// A push whose declared length exceeds the remaining bytes terminates
    /// extraction; the chunks decoded so far are returned.
    pub fn chunks(&self) -> Vec<Chunk> {
        let bytes = &self.0;
        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let op = bytes[pos];
            pos += 1;

            let declared = match op {
                0x01..=0x4b => Some(op as usize),
                OP_PUSHDATA1 => {
                    if pos >= bytes.len() {
                        break;
                    }
                    let len = bytes[pos] as usize;
                    pos += 1;
                    Some(len)
                }
                OP_PUSHDATA2 => {
                    if pos + 2 > bytes.len() {
                        break;
                    }
                    let len = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
                    pos += 2;
                    Some(len)
                }
                OP_PUSHDATA4 => {
                    if pos + 4 > bytes.len() {
                        break;
                    }
                    let len = u32::from_le_bytes([
                        bytes[pos],
                        bytes[pos + 1],
                        bytes[pos + 2],
                        bytes[pos + 3],
                    ]) as usize;
                    pos += 4;
                    Some(len)
                }
                _ => None,
            };

            match declared {
                Some(len) => {
                    if pos + len > bytes.len() {
                        // Truncated push - stop here, keep what we have
                        break;
                    }
                    chunks.push(Chunk {
                        opcode: op,
                        data: Some(bytes[pos..pos + len].to_vec()),
                    });
                    pos += len;
                }
                None => chunks.push(Chunk::op(op)),
            }
        }

        chunks
    }

    /// Space-separated mnemonic rendering of the script
    pub fn to_asm(&self) -> String {
        self.chunks()
            .iter()
            .map(Chunk::to_asm_token)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Append the minimal push-length prefix for `len` bytes of data
fn push_data_prefix(len: usize, out: &mut Vec<u8>) {
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_asm() {
        let script =
            Script::from_hex("76a914b770377041443c7eac4a93b721ab7093bdbccaba88ac").unwrap();
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 b770377041443c7eac4a93b721ab7093bdbccaba OP_EQUALVERIFY OP_CHECKSIG"
        );
        assert_eq!(script.chunks().len(), 5);
    }

    #[test]
    fn test_false_return_renders_as_zero() {
        let script = Script::from_hex("006a0548656c6c6f").unwrap();
        assert_eq!(script.to_asm(), "0 OP_RETURN 48656c6c6f");
    }

    #[test]
    fn test_pushdata1_and_2() {
        let mut bytes = vec![OP_PUSHDATA1, 0x4c];
        bytes.extend(std::iter::repeat(0xaa).take(0x4c));
        let script = Script::from_vec(bytes);
        let chunks = script.chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data.as_ref().unwrap().len(), 0x4c);

        let mut bytes = vec![OP_PUSHDATA2, 0x00, 0x01];
        bytes.extend(std::iter::repeat(0xbb).take(256));
        let script = Script::from_vec(bytes);
        let chunks = script.chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data.as_ref().unwrap().len(), 256);
    }

    #[test]
    fn test_truncated_final_push_returns_partial_chunks() {
        // OP_DUP OP_HASH160 then a 20-byte push with only 4 bytes present
        let script = Script::from_hex("76a914deadbeef").unwrap();
        let chunks = script.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].opcode, opcodes::OP_DUP);
        assert_eq!(chunks[1].opcode, opcodes::OP_HASH160);
        // ASM of a truncated script still renders what was decodable
        assert_eq!(script.to_asm(), "OP_DUP OP_HASH160");
    }

    #[test]
    fn test_truncated_pushdata_length_byte() {
        let script = Script::from_vec(vec![OP_PUSHDATA1]);
        assert!(script.chunks().is_empty());
    }

    #[test]
    fn test_from_asm_round_trip() {
        let asm = "OP_DUP OP_HASH160 b770377041443c7eac4a93b721ab7093bdbccaba OP_EQUALVERIFY OP_CHECKSIG";
        let script = Script::from_asm(asm).unwrap();
        assert_eq!(script.to_asm(), asm);
        assert_eq!(
            script.to_hex(),
            "76a914b770377041443c7eac4a93b721ab7093bdbccaba88ac"
        );
    }

    #[test]
    fn test_from_asm_rejects_bad_token() {
        assert!(Script::from_asm("OP_DUP not_hex").is_err());
    }

    #[test]
    fn test_unknown_opcode_rendering() {
        let script = Script::from_vec(vec![0xff]);
        assert_eq!(script.to_asm(), "OP_UNKNOWN_0xff");
    }
}
