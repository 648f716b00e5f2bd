use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use unravel::config::{self, Config};
use unravel::domain::abi::{ContractMetadata, DecodeError, DecodedCall};
use unravel::infrastructure::ethereum::fetch_transaction_input;
use unravel::DecodingSession;

#[derive(Debug, Parser)]
#[command(
    name = "unravel",
    version,
    about = "Unravel: decode multicall batches into individual contract calls"
)]
struct Args {
    /// Hex envelope data, call data (with --target) or a transaction hash (with --tx)
    input: String,

    /// Treat INPUT as a single call to this address instead of a batch
    #[arg(long)]
    target: Option<Address>,

    /// Treat INPUT as a transaction hash and fetch its input data over JSON-RPC
    #[arg(long, conflicts_with = "target")]
    tx: bool,

    /// HTTP JSON-RPC endpoint used with --tx (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// Chain id for registry lookups
    #[arg(long)]
    chain_id: Option<u64>,

    /// Etherscan API key (shorter request pacing)
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    etherscan_key: Option<String>,

    /// Print decoded calls as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = config_from_args_and_file(&args);
    let session = DecodingSession::from_config(&config)?;

    let calls = if args.tx {
        decode_transaction(&session, &args, &config).await?
    } else if let Some(target) = args.target {
        vec![session
            .decode_one_hex(target, &args.input)
            .await
            .context("Failed to decode call data")?]
    } else {
        session
            .decode_envelope_hex(&args.input)
            .await
            .context("Failed to decode multicall payload")?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&calls)?);
    } else {
        print_calls(&session, &calls).await;
    }
    Ok(())
}

fn config_from_args_and_file(args: &Args) -> Config {
    let mut config = config::load();
    if let Some(key) = args.etherscan_key.clone().filter(|k| !k.trim().is_empty()) {
        config.registry.api_key = Some(key);
    }
    if let Some(chain_id) = args.chain_id {
        config.registry.chain_id = chain_id;
    }
    if let Some(rpc) = args.rpc.clone() {
        config.rpc_url = Some(rpc);
    }
    config
}

async fn decode_transaction(
    session: &DecodingSession,
    args: &Args,
    config: &Config,
) -> Result<Vec<DecodedCall>> {
    let hash = args
        .input
        .trim()
        .parse::<B256>()
        .context("Invalid transaction hash")?;
    let rpc_url = config.rpc_url.as_deref().unwrap_or("http://localhost:8545");

    let tx = fetch_transaction_input(rpc_url, hash).await?;
    let Some(to) = tx.to else {
        bail!("Transaction {hash} is a contract creation");
    };

    match session.decode_envelope(&tx.input).await {
        Ok(calls) => Ok(calls),
        Err(DecodeError::UnrecognizedEnvelope) => {
            debug!(%hash, "Not a multicall, decoding as a single call");
            Ok(vec![session
                .decode_one(to, &tx.input)
                .await
                .context("Failed to decode transaction input")?])
        }
        Err(err) => Err(err).context("Failed to decode multicall payload"),
    }
}

async fn print_calls(session: &DecodingSession, calls: &[DecodedCall]) {
    if calls.is_empty() {
        println!("(empty batch)");
        return;
    }

    let mut names: HashMap<Address, String> = HashMap::new();
    for (index, call) in calls.iter().enumerate() {
        if !names.contains_key(&call.target) {
            let metadata = session.contract_metadata(call.target).await;
            names.insert(call.target, target_label(call.target, &metadata));
        }
        let label = names.get(&call.target).cloned().unwrap_or_default();

        println!("[{index}] {label}");
        println!(
            "    {}  ({}, {})",
            call.function_signature,
            call.confidence.as_str(),
            call.source.as_str(),
        );
        for (i, arg) in call.args.iter().enumerate() {
            let kind = call.params.get(i).map(|p| p.kind.as_str()).unwrap_or("?");
            println!("      {} ({kind}): {arg}", call.arg_name(i));
        }
    }
}

fn target_label(address: Address, metadata: &ContractMetadata) -> String {
    let checksum = address.to_checksum(None);
    let name = match (&metadata.implementation_display_name, metadata.is_proxy) {
        (Some(implementation), true) => format!("{} -> {implementation}", metadata.display_name),
        _ => metadata.display_name.clone(),
    };
    if name == checksum {
        checksum
    } else {
        format!("{checksum} ({name})")
    }
}
