use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{
    AppView, BackgroundSync, GatewayClient, IssuanceClient, IssuanceHandle, SyncSummary,
};
use storage::Storage;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url, Settings};

/// Follow an issuance app's event feed and keep a local checkpoint of its policies.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    gateway_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    app_address: Option<String>,
    #[arg(long)]
    checkpoint_every: Option<u64>,
    /// Print the policy table as JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.gateway_url {
            settings.gateway_url = v.clone();
        }
        if let Some(v) = &self.database_url {
            settings.database_url = v.clone();
        }
        if let Some(v) = &self.app_address {
            settings.app_address = Some(v.clone());
        }
        if let Some(v) = self.checkpoint_every.filter(|v| *v > 0) {
            settings.checkpoint_every = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    args.apply(&mut settings);
    let app_address = settings.app_address()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    info!(
        app = ?app_address,
        gateway = %settings.gateway_url,
        database_url = %database_url,
        "starting issuance sync"
    );

    let storage = Arc::new(Storage::new(&database_url).await?);
    let gateway = Arc::new(GatewayClient::new(&settings.gateway_url, app_address)?);
    let sync = BackgroundSync::new(
        app_address,
        gateway.clone(),
        gateway,
        storage,
        settings.sync_options(),
    );
    let client = Arc::new(IssuanceClient::read_only(sync.store(), settings.normalizer()));
    let printer = tokio::spawn(print_updates(client, args.json));

    let outcome = tokio::select! {
        outcome = sync.run() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    printer.abort();

    match outcome {
        Some(Ok(SyncSummary {
            applied_events,
            last_sequence,
            ..
        })) => {
            info!(applied_events, last_sequence, "event feed closed");
            Ok(())
        }
        Some(Err(err)) => {
            error!("issuance sync stopped: {err}");
            Err(err.into())
        }
        None => {
            info!("interrupted; writing checkpoint");
            sync.persist().await?;
            Ok(())
        }
    }
}

async fn print_updates(client: Arc<IssuanceClient>, json: bool) {
    let mut updates = BroadcastStream::new(client.subscribe_state());
    while let Some(update) = updates.next().await {
        match update {
            Ok(_) => {
                let view = client.view().await;
                if json {
                    match serde_json::to_string(&view) {
                        Ok(encoded) => println!("{encoded}"),
                        Err(err) => warn!("failed to encode view: {err}"),
                    }
                } else {
                    print!("{}", render_table(&view));
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "display fell behind the event feed");
            }
        }
    }
}

fn render_table(view: &AppView) -> String {
    let symbol = view.token_symbol.as_deref().unwrap_or("?");
    let status = if view.is_syncing { "syncing" } else { "synced" };
    let mut out = format!("== {} policies ({symbol}, {status}) ==\n", view.policies.len());
    for policy in &view.policies {
        out.push_str(&format!(
            "{:>5}  {:?}  {:>10}%/block  {:>16}%/year  {}\n",
            policy.id,
            policy.beneficiary,
            policy.block_rate,
            policy.annual_rate,
            if policy.executed { "executed" } else { "pending" },
        ));
    }
    out
}
