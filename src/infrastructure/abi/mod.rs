//! ABI infrastructure - envelope detection, structural decoding and call resolution

pub mod decoder;
pub mod envelope;
mod resolver;

pub use decoder::{decode_with_function, parse_signature, try_decode, DecodedFunction};
pub use envelope::{detect, detect_with_kind, EnvelopeKind};
pub use resolver::{CallResolver, DecodingSession};
