//! Domain layer - decoding models independent of transport and lookup services

pub mod abi;
