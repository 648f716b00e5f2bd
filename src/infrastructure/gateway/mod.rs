//! Lookup gateways
//!
//! - [`InterfaceRegistry`]: contract address -> verified interface (Etherscan)
//! - [`SignatureDirectory`]: selector -> candidate signatures (OpenChain)
//!
//! Both cache definitive answers for the lifetime of a decoding session and
//! never surface backend failures to callers; a failed lookup is simply absent.

mod directory;
mod etherscan;
mod openchain;
mod pacing;
mod registry;

use thiserror::Error;
use tracing::{debug, warn};

pub use directory::{normalize_selector, SignatureDirectory, SignatureSource};
pub use etherscan::{parse_source_response, EtherscanClient, DEFAULT_ETHERSCAN_URL};
pub use openchain::{parse_lookup_response, OpenChainClient, DEFAULT_OPENCHAIN_URL};
pub use pacing::RequestPacer;
pub use registry::{ContractRecord, ContractSource, InterfaceRegistry};

/// Why a backend request produced no usable answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("invalid API credential: {0}")]
    InvalidCredential(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("invalid response payload: {0}")]
    InvalidPayload(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl FetchError {
    /// Failures an operator should act on (quota or key problems)
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::RateLimited | Self::InvalidCredential(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::InvalidPayload(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Report a swallowed backend failure on the diagnostic log
pub(crate) fn report_fetch_error(gateway: &str, key: &str, err: &FetchError) {
    if err.needs_attention() {
        warn!(gateway, key, error = %err, "Lookup refused by upstream");
    } else {
        debug!(gateway, key, error = %err, "Lookup failed");
    }
}
