//! ABI domain models
//!
//! Plain data shared by the envelope detector, the call resolver and the
//! lookup gateways. Nothing in here performs I/O.

mod call;
mod error;
mod interface;
mod value;

pub use call::{
    parse_hex, selector_hex, split_selector, DecodedCall, ParamSpec, RawCall,
    ResolutionConfidence, ResolutionSource, Selector, UNKNOWN_FUNCTION,
};
pub use error::DecodeError;
pub use interface::{ContractMetadata, InterfaceDescription, SignatureCandidate};
pub use value::DecodedValue;
