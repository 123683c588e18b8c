//! Contract function resolution and call-data encoding.
//!
//! Only what the registration call needs is supported: a function whose
//! inputs are `string` or `bytes32`, fed from the three registration
//! arguments in order.

use docchain_types::FileHash;
use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::error::LedgerError;

/// Default registration function name on the registry contract.
pub const DEFAULT_METHOD: &str = "registerDocument";

const WORD: usize = 32;

/// A contract function, as declared in the registry contract's ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: String,
    pub inputs: Vec<String>,
}

impl FunctionSpec {
    /// Find `name` among the `function` entries of a JSON ABI.
    pub fn from_abi(abi: &Value, name: &str) -> Result<Self, LedgerError> {
        let entries = abi
            .as_array()
            .ok_or_else(|| LedgerError::Encoding("contract ABI is not a JSON array".into()))?;

        let entry = entries
            .iter()
            .find(|e| {
                e.get("type").and_then(Value::as_str).unwrap_or("function") == "function"
                    && e.get("name").and_then(Value::as_str) == Some(name)
            })
            .ok_or_else(|| LedgerError::Encoding(format!("function {name} not found in ABI")))?;

        let inputs = entry
            .get("inputs")
            .and_then(Value::as_array)
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|i| {
                        i.get("type")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if let Some(bad) = inputs.iter().find(|t| !matches!(t.as_str(), "string" | "bytes32")) {
            return Err(LedgerError::Encoding(format!(
                "unsupported parameter type {bad} in {name}"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            inputs,
        })
    }

    /// The canonical signature, e.g. `registerDocument(string,string,string)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }

    /// The 4-byte function selector.
    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    /// Encode a call with one argument per input.
    ///
    /// `string` inputs take the argument verbatim; `bytes32` inputs require
    /// a 64-hex-digit argument (prefix and case tolerated).
    pub fn encode(&self, args: &[&str]) -> Result<Vec<u8>, LedgerError> {
        if args.len() != self.inputs.len() {
            return Err(LedgerError::Encoding(format!(
                "{} expects {} arguments, got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }

        let mut head = Vec::with_capacity(self.inputs.len() * WORD);
        let mut tail = Vec::new();
        let head_len = self.inputs.len() * WORD;

        for (ty, arg) in self.inputs.iter().zip(args) {
            match ty.as_str() {
                "bytes32" => {
                    let hash = FileHash::parse(arg)
                        .map_err(|e| LedgerError::Encoding(format!("bytes32 argument: {e}")))?;
                    head.extend_from_slice(hash.as_bytes());
                }
                _ => {
                    head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                    tail.extend_from_slice(&uint_word(arg.len() as u64));
                    tail.extend_from_slice(arg.as_bytes());
                    let pad = (WORD - arg.len() % WORD) % WORD;
                    tail.extend(std::iter::repeat(0u8).take(pad));
                }
            }
        }

        let mut out = Vec::with_capacity(4 + head.len() + tail.len());
        out.extend_from_slice(&self.selector());
        out.extend_from_slice(&head);
        out.extend_from_slice(&tail);
        Ok(out)
    }
}

/// Keccak-256 of a function signature, truncated to 4 bytes.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_abi() -> Value {
        json!([
            {"type": "event", "name": "DocumentRegistered", "inputs": []},
            {
                "type": "function",
                "name": "registerDocument",
                "inputs": [
                    {"name": "documentID", "type": "string"},
                    {"name": "fileName", "type": "string"},
                    {"name": "fileHash", "type": "string"}
                ],
                "outputs": []
            }
        ])
    }

    #[test]
    fn known_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn resolves_function_from_abi() {
        let spec = FunctionSpec::from_abi(&registry_abi(), DEFAULT_METHOD).unwrap();
        assert_eq!(spec.signature(), "registerDocument(string,string,string)");
    }

    #[test]
    fn missing_function_is_an_error() {
        assert!(FunctionSpec::from_abi(&registry_abi(), "nope").is_err());
        assert!(FunctionSpec::from_abi(&json!({"not": "an array"}), DEFAULT_METHOD).is_err());
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let abi = json!([{"type": "function", "name": "f", "inputs": [{"type": "uint256"}]}]);
        assert!(FunctionSpec::from_abi(&abi, "f").is_err());
    }

    #[test]
    fn encodes_dynamic_strings() {
        let spec = FunctionSpec::from_abi(&registry_abi(), DEFAULT_METHOD).unwrap();
        let data = spec.encode(&["a", "bc", ""]).unwrap();
        assert_eq!(data.len(), 4 + 96 + 64 + 64 + 32);
        assert_eq!(&data[..4], &spec.selector());

        let word = |i: usize| &data[4 + i * 32..4 + (i + 1) * 32];
        assert_eq!(word(0), &uint_word(0x60));
        assert_eq!(word(1), &uint_word(0xa0));
        assert_eq!(word(2), &uint_word(0xe0));
        assert_eq!(word(3), &uint_word(1));
        assert_eq!(word(4)[0], b'a');
        assert!(word(4)[1..].iter().all(|b| *b == 0));
        assert_eq!(word(5), &uint_word(2));
        assert_eq!(&word(6)[..2], b"bc");
        assert_eq!(word(7), &uint_word(0));
    }

    #[test]
    fn encodes_bytes32_inline() {
        let abi = json!([{
            "type": "function",
            "name": "anchor",
            "inputs": [{"type": "string"}, {"type": "bytes32"}]
        }]);
        let spec = FunctionSpec::from_abi(&abi, "anchor").unwrap();
        let hash = "ab".repeat(32);
        let data = spec.encode(&["id", &format!("0x{hash}")]).unwrap();
        assert_eq!(&data[4 + 32..4 + 64], &[0xabu8; 32]);
        assert!(spec.encode(&["id", "not-a-hash"]).is_err());
        assert!(spec.encode(&["only-one"]).is_err());
    }
}
