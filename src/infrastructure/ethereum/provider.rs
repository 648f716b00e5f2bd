//! Transaction input lookup over JSON-RPC
//!
//! Uses a raw `eth_getTransactionByHash` request so that chains with
//! non-standard transaction types (Optimism/Base deposits, etc.) still parse.

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

/// The parts of a transaction the decoder needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub hash: B256,
    /// `None` for contract creations
    pub to: Option<Address>,
    pub input: Bytes,
}

/// Fetch recipient and input data of a transaction
pub async fn fetch_transaction_input(rpc_url: &str, tx_hash: B256) -> Result<TransactionInput> {
    let url = rpc_url.parse().context("Invalid HTTP URL")?;
    let provider = ProviderBuilder::new().connect_http(url);

    debug!(%tx_hash, rpc_url, "Fetching transaction");
    let json: serde_json::Value = provider
        .raw_request("eth_getTransactionByHash".into(), (tx_hash,))
        .await
        .context("eth_getTransactionByHash failed")?;

    if json.is_null() {
        bail!("Transaction {tx_hash} not found");
    }
    parse_transaction_input(&json)
}

/// Parse an `eth_getTransactionByHash` result object
pub fn parse_transaction_input(json: &serde_json::Value) -> Result<TransactionInput> {
    let hash = json
        .get("hash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Transaction has no hash"))?
        .parse::<B256>()
        .context("Invalid transaction hash")?;

    let to = match json.get("to").and_then(|v| v.as_str()) {
        Some(to) => Some(to.parse::<Address>().context("Invalid recipient address")?),
        None => None,
    };

    // some nodes still return the legacy `data` field
    let input_str = json
        .get("input")
        .or_else(|| json.get("data"))
        .and_then(|v| v.as_str())
        .unwrap_or("0x");
    let input = hex::decode(input_str.strip_prefix("0x").unwrap_or(input_str))
        .context("Invalid transaction input")?;

    Ok(TransactionInput {
        hash,
        to,
        input: Bytes::from(input),
    })
}
