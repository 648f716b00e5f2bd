//! Interface-registry gateway: contract address -> verified interface

use std::collections::HashMap;
use std::sync::Arc;

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::{report_fetch_error, FetchError, RequestPacer};
use crate::domain::abi::{ContractMetadata, InterfaceDescription};

/// What the registry backend knows about one address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractRecord {
    /// Contract name; `None` when the source is not verified
    pub name: Option<String>,
    /// Verified ABI; `None` when the source is not verified
    pub abi: Option<JsonAbi>,
    pub proxy: bool,
    pub implementation: Option<Address>,
}

impl ContractRecord {
    /// Definitive "source code not verified" answer
    pub fn unverified() -> Self {
        Self::default()
    }

    pub fn is_verified(&self) -> bool {
        self.abi.is_some()
    }
}

/// Backend of the interface registry (one request per address)
#[async_trait]
pub trait ContractSource: Send + Sync {
    async fn fetch_contract(&self, address: Address) -> Result<ContractRecord, FetchError>;
}

/// Cached, paced interface lookups
pub struct InterfaceRegistry {
    source: Box<dyn ContractSource>,
    pacer: RequestPacer,
    records: RwLock<HashMap<Address, Arc<ContractRecord>>>,
}

impl InterfaceRegistry {
    pub fn new(source: impl ContractSource + 'static, pacer: RequestPacer) -> Self {
        Self {
            source: Box::new(source),
            pacer,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Verified interface of `address`, merged with its implementation's
    /// interface when it is a proxy. `None` when neither is verified or the
    /// lookup failed.
    pub async fn get_interface(&self, address: Address) -> Option<InterfaceDescription> {
        let record = self.record(address).await?;

        let mut interface = record
            .abi
            .as_ref()
            .map(InterfaceDescription::from_abi)
            .unwrap_or_default();

        if let Some(implementation) = self.implementation_of(address, &record) {
            if let Some(abi) = self.record(implementation).await.and_then(|r| r.abi.clone()) {
                trace!(%address, %implementation, "Merging implementation interface");
                interface.merge(InterfaceDescription::from_abi(&abi));
            }
        }

        (!interface.is_empty() || record.is_verified()).then_some(interface)
    }

    /// Presentation metadata for `address`
    pub async fn get_contract_metadata(&self, address: Address) -> ContractMetadata {
        let Some(record) = self.record(address).await else {
            return ContractMetadata::unknown(address);
        };

        let implementation = self.implementation_of(address, &record);
        let implementation_display_name = match implementation {
            Some(implementation) => Some(match self.record(implementation).await {
                Some(r) => r.name.clone().unwrap_or_else(|| implementation.to_checksum(None)),
                None => implementation.to_checksum(None),
            }),
            None => None,
        };

        ContractMetadata {
            display_name: record.name.clone().unwrap_or_else(|| address.to_checksum(None)),
            verified: record.is_verified(),
            is_proxy: record.proxy,
            implementation_address: implementation,
            implementation_display_name,
        }
    }

    /// Drop every cached record
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.records.read().await.len()
    }

    fn implementation_of(&self, address: Address, record: &ContractRecord) -> Option<Address> {
        record
            .implementation
            .filter(|implementation| record.proxy && *implementation != address && !implementation.is_zero())
    }

    async fn record(&self, address: Address) -> Option<Arc<ContractRecord>> {
        if let Some(record) = self.records.read().await.get(&address) {
            return Some(record.clone());
        }

        self.pacer.wait().await;
        match self.source.fetch_contract(address).await {
            Ok(record) => {
                debug!(
                    %address,
                    verified = record.is_verified(),
                    proxy = record.proxy,
                    "Fetched contract record"
                );
                let mut records = self.records.write().await;
                Some(records.entry(address).or_insert_with(|| Arc::new(record)).clone())
            }
            Err(err) => {
                report_fetch_error("registry", &address.to_checksum(None), &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_abi::Function;
    use alloy_primitives::address;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn abi_of(signatures: &[&str]) -> JsonAbi {
        let mut abi = JsonAbi::default();
        for sig in signatures {
            let function = Function::parse(sig).unwrap();
            abi.functions.entry(function.name.clone()).or_default().push(function);
        }
        abi
    }

    #[derive(Default)]
    struct MockSource {
        records: HashMap<Address, Result<ContractRecord, FetchError>>,
        calls: Arc<AtomicUsize>,
    }

    impl MockSource {
        fn with(mut self, address: Address, record: Result<ContractRecord, FetchError>) -> Self {
            self.records.insert(address, record);
            self
        }
    }

    #[async_trait]
    impl ContractSource for MockSource {
        async fn fetch_contract(&self, address: Address) -> Result<ContractRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records
                .get(&address)
                .cloned()
                .unwrap_or_else(|| Ok(ContractRecord::unverified()))
        }
    }

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const IMPL: Address = address!("43506849d7c04f9138d1a2050bbf3a0c054402dd");

    fn verified(name: &str, signatures: &[&str]) -> ContractRecord {
        ContractRecord {
            name: Some(name.to_string()),
            abi: Some(abi_of(signatures)),
            proxy: false,
            implementation: None,
        }
    }

    #[tokio::test]
    async fn test_verified_interface_is_cached() {
        let source = MockSource::default()
            .with(TOKEN, Ok(verified("Token", &["function transfer(address to, uint256 amount)"])));
        let calls = source.calls.clone();
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        let first = registry.get_interface(TOKEN).await.unwrap();
        let second = registry.get_interface(TOKEN).await.unwrap();

        assert_eq!(first, second);
        assert!(first.lookup([0xa9, 0x05, 0x9c, 0xbb]).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_unverified_is_cached_as_none() {
        let source = MockSource::default();
        let calls = source.calls.clone();
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        assert!(registry.get_interface(TOKEN).await.is_none());
        assert!(registry.get_interface(TOKEN).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = MockSource::default().with(TOKEN, Err(FetchError::RateLimited));
        let calls = source.calls.clone();
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        assert!(registry.get_interface(TOKEN).await.is_none());
        assert!(registry.get_interface(TOKEN).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_proxy_merges_implementation() {
        let proxy = ContractRecord {
            name: Some("TransparentUpgradeableProxy".into()),
            abi: Some(abi_of(&["function upgradeTo(address newImplementation)"])),
            proxy: true,
            implementation: Some(IMPL),
        };
        let source = MockSource::default()
            .with(TOKEN, Ok(proxy))
            .with(IMPL, Ok(verified("FiatTokenV2_2", &[
                "function transfer(address to, uint256 value)",
                "function upgradeTo(address impl_)",
            ])));
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        let interface = registry.get_interface(TOKEN).await.unwrap();
        assert_eq!(interface.len(), 2);
        let upgrade = interface.functions().find(|f| f.name == "upgradeTo").unwrap();
        assert_eq!(upgrade.inputs[0].name, "newImplementation");

        let metadata = registry.get_contract_metadata(TOKEN).await;
        assert_eq!(metadata.display_name, "TransparentUpgradeableProxy");
        assert!(metadata.is_proxy);
        assert_eq!(metadata.implementation_address, Some(IMPL));
        assert_eq!(metadata.implementation_display_name.as_deref(), Some("FiatTokenV2_2"));
    }

    #[tokio::test]
    async fn test_unverified_proxy_uses_implementation() {
        let proxy = ContractRecord {
            name: None,
            abi: None,
            proxy: true,
            implementation: Some(IMPL),
        };
        let source = MockSource::default()
            .with(TOKEN, Ok(proxy))
            .with(IMPL, Ok(verified("Impl", &["function transfer(address to, uint256 value)"])));
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        let interface = registry.get_interface(TOKEN).await.unwrap();
        assert_eq!(interface.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_metadata_uses_checksum() {
        let source = MockSource::default().with(TOKEN, Err(FetchError::Transport("timeout".into())));
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        let metadata = registry.get_contract_metadata(TOKEN).await;
        assert_eq!(metadata, ContractMetadata::unknown(TOKEN));
        assert_eq!(metadata.display_name, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    }

    #[tokio::test]
    async fn test_clear_refetches() {
        let source = MockSource::default()
            .with(TOKEN, Ok(verified("Token", &["function decimals()"])));
        let calls = source.calls.clone();
        let registry = InterfaceRegistry::new(source, RequestPacer::unpaced());

        registry.get_interface(TOKEN).await;
        registry.clear().await;
        registry.get_interface(TOKEN).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
