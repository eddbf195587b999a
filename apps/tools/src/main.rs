use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    raw_rate_from_percent, GatewayClient, IssuanceClient, IssuanceHandle, RateNormalizer,
    StateStore,
};
use shared::{
    codec::{parse_address, parse_u256},
    domain::{Address, PolicyId},
    protocol::TransactionReceipt,
};
use storage::{CheckpointStore, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/issuance.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GatewayArgs {
    #[arg(long, env = "GATEWAY_URL", default_value = "http://127.0.0.1:8545")]
    gateway_url: String,
    #[arg(long, env = "APP_ADDRESS")]
    app_address: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored checkpoint of an app as JSON.
    ShowCheckpoint { app_address: String },
    ClearCheckpoint { app_address: String },
    /// List every app with a stored checkpoint.
    List,
    /// Annualize a raw per-block rate (decimal or 0x hex).
    Annualize {
        raw_rate: String,
        #[arg(long)]
        blocks_per_year: Option<u64>,
    },
    /// Convert a per-block percentage into the raw on-chain rate.
    RateFromPercent { percent: String },
    AddPolicy {
        #[command(flatten)]
        gateway: GatewayArgs,
        beneficiary: String,
        /// Per-block rate in percent, e.g. `0.0001`.
        percent: String,
    },
    RemovePolicy {
        #[command(flatten)]
        gateway: GatewayArgs,
        policy_id: u64,
    },
    ExecuteIssuance {
        #[command(flatten)]
        gateway: GatewayArgs,
    },
}

fn address(raw: &str) -> Result<Address> {
    Ok(parse_address(raw)?)
}

/// A write-only client; the tools never follow the feed, so its store stays empty.
fn issuance_client(args: &GatewayArgs) -> Result<IssuanceClient> {
    let gateway = GatewayClient::new(&args.gateway_url, address(&args.app_address)?)?;
    Ok(IssuanceClient::new(
        Arc::new(StateStore::default()),
        Arc::new(gateway),
        RateNormalizer::default(),
    ))
}

fn print_receipt(receipt: &TransactionReceipt) {
    println!(
        "submitted tx_hash={:?} at={}",
        receipt.tx_hash,
        receipt.submitted_at.to_rfc3339()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::ShowCheckpoint { app_address } => {
            let storage = Storage::new(&cli.database_url).await?;
            match storage.load_checkpoint(address(&app_address)?).await? {
                Some(checkpoint) => {
                    println!(
                        "last_sequence={:?} updated_at={}",
                        checkpoint.last_sequence,
                        checkpoint.updated_at.to_rfc3339()
                    );
                    println!("{}", serde_json::to_string_pretty(&checkpoint.state)?);
                }
                None => println!("no checkpoint for {app_address}"),
            }
        }
        Command::ClearCheckpoint { app_address } => {
            let storage = Storage::new(&cli.database_url).await?;
            let removed = storage.clear_checkpoint(address(&app_address)?).await?;
            println!("removed={removed}");
        }
        Command::List => {
            let storage = Storage::new(&cli.database_url).await?;
            for checkpoint in storage.list_checkpoints().await? {
                println!(
                    "{:?} policies={} last_sequence={:?} updated_at={}",
                    checkpoint.app_address,
                    checkpoint.state.policies.len(),
                    checkpoint.last_sequence,
                    checkpoint.updated_at.to_rfc3339()
                );
            }
        }
        Command::Annualize {
            raw_rate,
            blocks_per_year,
        } => {
            let rate = parse_u256(&raw_rate).context("invalid rate")?;
            let normalizer = blocks_per_year
                .map(RateNormalizer::with_blocks_per_year)
                .unwrap_or_default();
            println!("{}%", normalizer.annualized_rate(rate));
        }
        Command::RateFromPercent { percent } => {
            println!("{}", raw_rate_from_percent(&percent)?);
        }
        Command::AddPolicy {
            gateway: args,
            beneficiary,
            percent,
        } => {
            let receipt = issuance_client(&args)?
                .add_policy_percent(address(&beneficiary)?, &percent)
                .await?;
            print_receipt(&receipt);
        }
        Command::RemovePolicy {
            gateway: args,
            policy_id,
        } => {
            let receipt = issuance_client(&args)?
                .remove_policy(PolicyId(policy_id))
                .await?;
            print_receipt(&receipt);
        }
        Command::ExecuteIssuance { gateway: args } => {
            let receipt = issuance_client(&args)?.execute_issuance().await?;
            print_receipt(&receipt);
        }
    }

    Ok(())
}
