//! Call types produced by the decoding pipeline

use alloy_primitives::{Address, Bytes};
use serde::{Serialize, Serializer};

use super::{DecodeError, DecodedValue};

/// 4-byte function selector
pub type Selector = [u8; 4];

/// Function name reported when no source could name the selector
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// One inner call extracted from a multicall envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    pub target: Address,
    pub call_data: Bytes,
}

/// A function parameter specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256", "(uint256,address)")
    #[serde(rename = "type")]
    pub kind: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// How much the resolved name/signature of a call can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionConfidence {
    /// The arguments decoded structurally against the reported signature
    Verified,
    /// Directory candidates existed but none decoded; the first one is reported
    Guessed,
    /// No source knows the selector
    Unknown,
}

/// Which lookup produced the reported signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Registry,
    Directory,
    None,
}

impl ResolutionConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Guessed => "guessed",
            Self::Unknown => "unknown",
        }
    }
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Directory => "directory",
            Self::None => "none",
        }
    }
}

/// Result of resolving one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    #[serde(serialize_with = "serialize_checksummed")]
    pub target: Address,
    /// Function name, or "unknown"
    pub function_name: String,
    /// Canonical `name(type,...)` form, or the 0x-prefixed selector when unresolved
    pub function_signature: String,
    /// Decoded arguments; a single opaque byte string when parameters could not be decoded
    pub args: Vec<DecodedValue>,
    /// Declared name/type of each entry in `args`
    pub params: Vec<ParamSpec>,
    pub confidence: ResolutionConfidence,
    pub source: ResolutionSource,
    pub raw_call_data: Bytes,
}

impl DecodedCall {
    /// A call whose arguments decoded against `function_signature`
    pub fn decoded(
        target: Address,
        function_name: impl Into<String>,
        function_signature: impl Into<String>,
        params: Vec<ParamSpec>,
        args: Vec<DecodedValue>,
        source: ResolutionSource,
        raw_call_data: &[u8],
    ) -> Self {
        Self {
            target,
            function_name: function_name.into(),
            function_signature: function_signature.into(),
            args,
            params,
            confidence: ResolutionConfidence::Verified,
            source,
            raw_call_data: Bytes::copy_from_slice(raw_call_data),
        }
    }

    /// A call whose arguments could not be decoded; the bytes after the
    /// selector are kept as a single opaque argument.
    pub fn opaque(
        target: Address,
        function_name: impl Into<String>,
        function_signature: impl Into<String>,
        confidence: ResolutionConfidence,
        source: ResolutionSource,
        raw_call_data: &[u8],
    ) -> Self {
        let payload = raw_call_data.get(4..).unwrap_or_default();
        Self {
            target,
            function_name: function_name.into(),
            function_signature: function_signature.into(),
            args: vec![DecodedValue::Bytes(Bytes::copy_from_slice(payload))],
            params: vec![ParamSpec::new("data", "bytes")],
            confidence,
            source,
            raw_call_data: Bytes::copy_from_slice(raw_call_data),
        }
    }

    /// Selector of the raw call data as 0x-prefixed lowercase hex
    pub fn selector_hex(&self) -> String {
        split_selector(&self.raw_call_data)
            .map(|(selector, _)| selector_hex(selector))
            .unwrap_or_default()
    }

    /// Display name for argument `index` ("arg{n}" if unnamed)
    pub fn arg_name(&self, index: usize) -> String {
        match self.params.get(index) {
            Some(param) if !param.name.trim().is_empty() => param.name.clone(),
            _ => format!("arg{index}"),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.confidence == ResolutionConfidence::Verified
    }
}

fn serialize_checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

/// Split call data into its selector and argument bytes
pub fn split_selector(call_data: &[u8]) -> Result<(Selector, &[u8]), DecodeError> {
    match call_data.split_first_chunk::<4>() {
        Some((selector, rest)) => Ok((*selector, rest)),
        None => Err(DecodeError::MalformedCallData {
            len: call_data.len(),
        }),
    }
}

/// Format a selector as 0x-prefixed lowercase hex
pub fn selector_hex(selector: Selector) -> String {
    format!("0x{}", hex::encode(selector))
}

/// Parse a hex string (0x prefix optional, surrounding whitespace ignored)
pub fn parse_hex(input: &str) -> Result<Bytes, DecodeError> {
    let trimmed = input.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(payload)
        .map(Bytes::from)
        .map_err(|err| DecodeError::InvalidHex(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_selector() {
        let data = [0xa9, 0x05, 0x9c, 0xbb, 0x01, 0x02];
        let (selector, rest) = split_selector(&data).unwrap();
        assert_eq!(selector, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(rest.to_vec(), vec![0x01, 0x02]);

        let (_, rest) = split_selector(&data[..4]).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn test_short_call_data_is_malformed() {
        assert_eq!(
            split_selector(&[0xa9, 0x05, 0x9c]),
            Err(DecodeError::MalformedCallData { len: 3 })
        );
        assert_eq!(
            split_selector(&[]),
            Err(DecodeError::MalformedCallData { len: 0 })
        );
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0xdeadbeef").unwrap().to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(parse_hex("  DEADBEEF\n").unwrap().to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_hex("0x").unwrap().is_empty());
        assert!(matches!(parse_hex("0xabc"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(parse_hex("zz"), Err(DecodeError::InvalidHex(_))));
    }

    #[test]
    fn test_opaque_call_keeps_payload() {
        let raw = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03];
        let call = DecodedCall::opaque(
            Address::ZERO,
            UNKNOWN_FUNCTION,
            "0xdeadbeef",
            ResolutionConfidence::Unknown,
            ResolutionSource::None,
            &raw,
        );

        assert_eq!(call.args, vec![DecodedValue::Bytes(Bytes::from(vec![1, 2, 3]))]);
        assert_eq!(call.params.len(), call.args.len());
        assert_eq!(call.selector_hex(), "0xdeadbeef");
        assert_eq!(call.arg_name(0), "data");
        assert!(!call.is_verified());
    }

    #[test]
    fn test_arg_name_fallback() {
        let call = DecodedCall::decoded(
            Address::ZERO,
            "transfer",
            "transfer(address,uint256)",
            vec![ParamSpec::new("", "address"), ParamSpec::new("amount", "uint256")],
            vec![
                DecodedValue::Address(Address::ZERO),
                DecodedValue::Uint(alloy_primitives::U256::from(1)),
            ],
            ResolutionSource::Directory,
            &[0xa9, 0x05, 0x9c, 0xbb],
        );

        assert_eq!(call.arg_name(0), "arg0");
        assert_eq!(call.arg_name(1), "amount");
        assert!(call.is_verified());
    }
}
