//! Contract interface descriptions and signature candidates

use std::collections::BTreeMap;

use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::Address;
use serde::Serialize;

use super::Selector;

/// Verified interface of a deployed contract, indexed by selector.
///
/// Overloads of one name are separate entries; each function keeps its
/// ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceDescription {
    functions: BTreeMap<Selector, Function>,
}

impl InterfaceDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON ABI, keeping only function entries
    pub fn from_abi(abi: &JsonAbi) -> Self {
        let mut interface = Self::new();
        for function in abi.functions() {
            interface.insert(function.clone());
        }
        interface
    }

    /// Insert a function
    ///
    /// Note: First function for a given selector wins (no overwrite)
    pub fn insert(&mut self, function: Function) {
        self.functions.entry(function.selector().0).or_insert(function);
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: Selector) -> Option<&Function> {
        self.functions.get(&selector)
    }

    /// Merge another interface into this one
    ///
    /// Functions from the other interface are only added if their
    /// selector is not already present (first wins).
    pub fn merge(&mut self, other: Self) {
        for (selector, function) in other.functions {
            self.functions.entry(selector).or_insert(function);
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Candidate signature for a selector from the signature directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureCandidate {
    /// Function name, e.g. "transfer"
    pub name: String,
    /// Textual signature, e.g. "transfer(address,uint256)"
    pub signature: String,
}

impl SignatureCandidate {
    pub fn from_signature(signature: &str) -> Self {
        let signature = signature.trim();
        let name = signature.split('(').next().unwrap_or(signature).trim();
        Self {
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }
}

/// Presentation metadata for a contract address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    /// Contract name, or the checksummed address when unknown
    pub display_name: String,
    pub verified: bool,
    pub is_proxy: bool,
    pub implementation_address: Option<Address>,
    pub implementation_display_name: Option<String>,
}

impl ContractMetadata {
    /// Metadata for an address no lookup could describe
    pub fn unknown(address: Address) -> Self {
        Self {
            display_name: address.to_checksum(None),
            verified: false,
            is_proxy: false,
            implementation_address: None,
            implementation_display_name: None,
        }
    }
}
