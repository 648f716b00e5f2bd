//! Decoding errors surfaced to callers of the decoding session

use thiserror::Error;

/// Errors produced while decoding an envelope or a single call.
///
/// Trial-decode failures against candidate signatures are reported with the
/// same type but are swallowed by the resolver; only `UnrecognizedEnvelope`,
/// the malformed-call variants and `InvalidHex` ever reach a caller of
/// [`DecodingSession`](crate::infrastructure::abi::DecodingSession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload does not match any known multicall envelope")]
    UnrecognizedEnvelope,

    #[error("call data too short: {len} bytes, need at least 4 for the selector")]
    MalformedCallData { len: usize },

    #[error("call #{index} in the batch is malformed: {len} bytes, need at least 4 for the selector")]
    MalformedInnerCall { index: usize, len: usize },

    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error("invalid function signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("selector mismatch: got {actual}, expected {expected}")]
    SelectorMismatch { actual: String, expected: String },

    #[error("abi decode failed: {0}")]
    Abi(String),

    #[error("arguments are not canonically encoded")]
    NonCanonical,
}
