//! Decoded argument values

use std::fmt;

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::Param;
use alloy_primitives::{Address, Bytes, I256, U256};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A decoded ABI value.
///
/// Mirrors the decodable ABI value space: fixed and dynamic byte strings share
/// one variant, unnamed tuples become arrays, and tuples whose components are
/// all named become records that keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    Bytes(Bytes),
    String(String),
    Array(Vec<DecodedValue>),
    Record(Vec<(String, DecodedValue)>),
}

impl DecodedValue {
    /// Materialize a value decoded against `param`
    pub fn from_param(value: &DynSolValue, param: &Param) -> Self {
        Self::from_dyn(value, &param.components)
    }

    /// Materialize a value; `components` are the declared tuple components
    /// for tuple (or tuple-array) types and empty otherwise.
    pub fn from_dyn(value: &DynSolValue, components: &[Param]) -> Self {
        match value {
            DynSolValue::Bool(b) => Self::Bool(*b),
            DynSolValue::Int(i, _) => Self::Int(*i),
            DynSolValue::Uint(u, _) => Self::Uint(*u),
            // bytesN is right-padded in a 32-byte word
            DynSolValue::FixedBytes(word, size) => {
                Self::Bytes(Bytes::copy_from_slice(&word.as_slice()[..(*size).min(32)]))
            }
            DynSolValue::Address(addr) => Self::Address(*addr),
            DynSolValue::Function(func) => Self::Bytes(Bytes::copy_from_slice(func.as_slice())),
            DynSolValue::Bytes(bytes) => Self::Bytes(Bytes::copy_from_slice(bytes)),
            DynSolValue::String(s) => Self::String(s.clone()),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Self::Array(
                items
                    .iter()
                    .map(|item| Self::from_dyn(item, components))
                    .collect(),
            ),
            DynSolValue::Tuple(fields) => Self::from_tuple(fields, components),
            DynSolValue::CustomStruct {
                prop_names, tuple, ..
            } => Self::from_struct(prop_names, tuple, components),
        }
    }

    /// EIP-712 struct values carry their own field names
    fn from_struct(prop_names: &[String], fields: &[DynSolValue], components: &[Param]) -> Self {
        if prop_names.len() != fields.len() {
            return Self::from_tuple(fields, components);
        }
        Self::Record(
            prop_names
                .iter()
                .zip(fields)
                .map(|(name, field)| {
                    let nested = components
                        .iter()
                        .find(|c| &c.name == name)
                        .map(|c| c.components.as_slice())
                        .unwrap_or_default();
                    (name.clone(), Self::from_dyn(field, nested))
                })
                .collect(),
        )
    }

    fn from_tuple(fields: &[DynSolValue], components: &[Param]) -> Self {
        let named = components.len() == fields.len()
            && !components.is_empty()
            && components.iter().all(|c| !c.name.trim().is_empty());

        if named {
            Self::Record(
                fields
                    .iter()
                    .zip(components)
                    .map(|(field, component)| {
                        (component.name.clone(), Self::from_param(field, component))
                    })
                    .collect(),
            )
        } else {
            Self::Array(
                fields
                    .iter()
                    .enumerate()
                    .map(|(idx, field)| {
                        let nested = components
                            .get(idx)
                            .map(|c| c.components.as_slice())
                            .unwrap_or_default();
                        Self::from_dyn(field, nested)
                    })
                    .collect(),
            )
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }
}

/// JSON form: integers as decimal strings, addresses checksummed, bytes as
/// 0x-hex, records as objects in declaration order.
impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Uint(u) => serializer.serialize_str(&u.to_string()),
            Self::Int(i) => serializer.serialize_str(&i.to_string()),
            Self::Address(addr) => serializer.serialize_str(&addr.to_checksum(None)),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Bytes(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Console form, abbreviating long byte strings, strings and arrays
impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(u) => write!(f, "{u}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Address(addr) => write!(f, "{}", addr.to_checksum(None)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes(bytes) => {
                if bytes.len() <= 32 {
                    write!(f, "0x{}", hex::encode(bytes))
                } else {
                    write!(f, "0x{}… ({} bytes)", hex::encode(&bytes[..32]), bytes.len())
                }
            }
            Self::String(s) => {
                if s.chars().count() <= 64 {
                    write!(f, "\"{s}\"")
                } else {
                    let head: String = s.chars().take(64).collect();
                    write!(f, "\"{head}…\" ({} chars)", s.chars().count())
                }
            }
            Self::Array(items) => {
                let max_items = 10;
                let shown: Vec<String> = items.iter().take(max_items).map(|v| v.to_string()).collect();
                if items.len() > max_items {
                    write!(f, "[{}, …] ({} items)", shown.join(", "), items.len())
                } else {
                    write!(f, "[{}]", shown.join(", "))
                }
            }
            Self::Record(fields) => {
                let shown: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", shown.join(", "))
            }
        }
    }
}
