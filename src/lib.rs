//! Multicall payload decoding
//!
//! [`DecodingSession`] detects the batch-call envelope of a payload and
//! resolves every inner call to a function name, canonical signature and
//! decoded arguments, using a contract-interface registry first and a public
//! signature directory as fallback.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::abi::{
    DecodeError, DecodedCall, DecodedValue, RawCall, ResolutionConfidence, ResolutionSource,
};
pub use infrastructure::abi::{detect, try_decode, DecodingSession};
