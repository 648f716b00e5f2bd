//! Signature-directory gateway: selector -> candidate signatures

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{report_fetch_error, FetchError};
use crate::domain::abi::SignatureCandidate;

/// Backend of the signature directory
///
/// `selector` is always normalized (`0x` + 8 lowercase hex digits). The
/// returned signatures keep the backend's order.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn fetch_signatures(&self, selector: &str) -> Result<Vec<String>, FetchError>;
}

/// Normalize a selector to `0x` + 8 lowercase hex digits
pub fn normalize_selector(selector: &str) -> Option<String> {
    let trimmed = selector.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    (digits.len() == 8 && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| format!("0x{}", digits.to_ascii_lowercase()))
}

/// Cached selector lookups
pub struct SignatureDirectory {
    source: Box<dyn SignatureSource>,
    cache: RwLock<HashMap<String, Vec<SignatureCandidate>>>,
}

impl SignatureDirectory {
    pub fn new(source: impl SignatureSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Candidate signatures for `selector`, in backend order. Empty when the
    /// selector is malformed, unknown, or the lookup failed.
    pub async fn lookup(&self, selector: &str) -> Vec<SignatureCandidate> {
        let Some(key) = normalize_selector(selector) else {
            debug!(selector, "Ignoring malformed selector");
            return Vec::new();
        };

        if let Some(candidates) = self.cache.read().await.get(&key) {
            return candidates.clone();
        }

        match self.source.fetch_signatures(&key).await {
            Ok(signatures) => {
                let candidates: Vec<SignatureCandidate> = signatures
                    .iter()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| SignatureCandidate::from_signature(s))
                    .collect();
                debug!(selector = %key, count = candidates.len(), "Fetched signature candidates");
                let mut cache = self.cache.write().await;
                cache.entry(key).or_insert(candidates).clone()
            }
            Err(err) => {
                report_fetch_error("directory", &key, &err);
                Vec::new()
            }
        }
    }

    pub async fn is_cached(&self, selector: &str) -> bool {
        match normalize_selector(selector) {
            Some(key) => self.cache.read().await.contains_key(&key),
            None => false,
        }
    }

    /// Drop every cached entry
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }
}
