//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Multicall envelope detection and call resolution using alloy-dyn-abi
//! - Interface-registry and signature-directory gateways
//! - Alloy-based JSON-RPC transaction lookup

pub mod abi;
pub mod ethereum;
pub mod gateway;

pub use abi::DecodingSession;
