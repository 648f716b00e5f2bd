//! Call resolution with registry -> directory -> raw-bytes fallback

use alloy_primitives::Address;
use anyhow::{Context, Result};
use tracing::{debug, trace};

use super::decoder::{decode_with_function, try_decode};
use super::envelope;
use crate::config::Config;
use crate::domain::abi::{
    parse_hex, selector_hex, split_selector, ContractMetadata, DecodeError, DecodedCall,
    ResolutionConfidence, ResolutionSource, Selector, UNKNOWN_FUNCTION,
};
use crate::infrastructure::gateway::{
    EtherscanClient, InterfaceRegistry, OpenChainClient, RequestPacer, SignatureDirectory,
};

/// Resolves one call against the interface registry, then the signature
/// directory, then degrades to the raw selector.
pub struct CallResolver {
    registry: InterfaceRegistry,
    directory: SignatureDirectory,
}

impl CallResolver {
    pub fn new(registry: InterfaceRegistry, directory: SignatureDirectory) -> Self {
        Self {
            registry,
            directory,
        }
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &SignatureDirectory {
        &self.directory
    }

    /// Resolve a call. Only call data shorter than a selector is an error.
    pub async fn resolve(&self, target: Address, call_data: &[u8]) -> Result<DecodedCall, DecodeError> {
        let (selector, _) = split_selector(call_data)?;

        if let Some(call) = self.resolve_from_registry(target, selector, call_data).await {
            return Ok(call);
        }
        Ok(self.resolve_from_directory(target, selector, call_data).await)
    }

    async fn resolve_from_registry(
        &self,
        target: Address,
        selector: Selector,
        call_data: &[u8],
    ) -> Option<DecodedCall> {
        let interface = self.registry.get_interface(target).await?;
        let function = interface.lookup(selector)?;

        match decode_with_function(function, call_data) {
            Ok(decoded) => {
                let name = decoded.name().to_string();
                let signature = decoded.signature();
                trace!(%target, %signature, "Resolved from registry");
                Some(DecodedCall::decoded(
                    target,
                    name,
                    signature,
                    decoded.params,
                    decoded.args,
                    ResolutionSource::Registry,
                    call_data,
                ))
            }
            Err(err) => {
                debug!(%target, function = %function.signature(), error = %err, "Registry function did not decode");
                None
            }
        }
    }

    async fn resolve_from_directory(
        &self,
        target: Address,
        selector: Selector,
        call_data: &[u8],
    ) -> DecodedCall {
        let selector = selector_hex(selector);
        let candidates = self.directory.lookup(&selector).await;

        for candidate in &candidates {
            match try_decode(&candidate.signature, call_data) {
                Ok(decoded) => {
                    trace!(%target, signature = %candidate.signature, "Resolved from directory");
                    return DecodedCall::decoded(
                        target,
                        candidate.name.clone(),
                        candidate.signature.clone(),
                        decoded.params,
                        decoded.args,
                        ResolutionSource::Directory,
                        call_data,
                    );
                }
                Err(err) => {
                    trace!(signature = %candidate.signature, error = %err, "Candidate rejected");
                }
            }
        }

        match candidates.first() {
            Some(first) => {
                debug!(%target, %selector, candidates = candidates.len(), "No candidate decoded, guessing first");
                DecodedCall::opaque(
                    target,
                    first.name.clone(),
                    first.signature.clone(),
                    ResolutionConfidence::Guessed,
                    ResolutionSource::Directory,
                    call_data,
                )
            }
            None => DecodedCall::opaque(
                target,
                UNKNOWN_FUNCTION,
                selector,
                ResolutionConfidence::Unknown,
                ResolutionSource::None,
                call_data,
            ),
        }
    }
}

/// Entry points consumed by the presentation layer.
///
/// Owns both gateways, so caches live as long as the session (or until
/// [`DecodingSession::reset`]).
pub struct DecodingSession {
    resolver: CallResolver,
}

impl DecodingSession {
    pub fn new(registry: InterfaceRegistry, directory: SignatureDirectory) -> Self {
        Self {
            resolver: CallResolver::new(registry, directory),
        }
    }

    /// Session backed by Etherscan and the OpenChain signature database
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key().map(str::to_string);
        let etherscan = EtherscanClient::new(
            config.registry.api_url.clone(),
            config.registry.chain_id,
            api_key,
            config.timeout(),
        )
        .context("Failed to create registry client")?;
        let openchain = OpenChainClient::new(config.directory.api_url.clone(), config.timeout())
            .context("Failed to create directory client")?;

        debug!(
            chain_id = config.registry.chain_id,
            keyed = etherscan.has_api_key(),
            interval_ms = config.request_interval().as_millis() as u64,
            "Decoding session ready"
        );

        Ok(Self::new(
            InterfaceRegistry::new(etherscan, RequestPacer::new(config.request_interval())),
            SignatureDirectory::new(openchain),
        ))
    }

    pub fn resolver(&self) -> &CallResolver {
        &self.resolver
    }

    /// Detect the envelope and resolve each inner call in order
    pub async fn decode_envelope(&self, payload: &[u8]) -> Result<Vec<DecodedCall>, DecodeError> {
        let calls = envelope::detect(payload)?;

        let mut decoded = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            let resolved = self
                .resolver
                .resolve(call.target, &call.call_data)
                .await
                .map_err(|err| match err {
                    DecodeError::MalformedCallData { len } => {
                        DecodeError::MalformedInnerCall { index, len }
                    }
                    other => other,
                })?;
            decoded.push(resolved);
        }
        Ok(decoded)
    }

    /// Resolve a single call without envelope detection
    pub async fn decode_one(&self, target: Address, call_data: &[u8]) -> Result<DecodedCall, DecodeError> {
        self.resolver.resolve(target, call_data).await
    }

    /// [`Self::decode_envelope`] on hex input (`0x` optional)
    pub async fn decode_envelope_hex(&self, payload: &str) -> Result<Vec<DecodedCall>, DecodeError> {
        let payload = parse_hex(payload)?;
        self.decode_envelope(&payload).await
    }

    /// [`Self::decode_one`] on hex input (`0x` optional)
    pub async fn decode_one_hex(&self, target: Address, call_data: &str) -> Result<DecodedCall, DecodeError> {
        let call_data = parse_hex(call_data)?;
        self.decode_one(target, &call_data).await
    }

    /// Presentation metadata for a call target
    pub async fn contract_metadata(&self, address: Address) -> ContractMetadata {
        self.resolver.registry.get_contract_metadata(address).await
    }

    /// Forget everything both gateways have cached
    pub async fn reset(&self) {
        self.resolver.registry.clear().await;
        self.resolver.directory.clear().await;
    }
}
