//! Ethereum infrastructure - Alloy JSON-RPC access

mod provider;

pub use provider::{fetch_transaction_input, parse_transaction_input, TransactionInput};
