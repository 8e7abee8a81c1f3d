//! MEV-Share CLI
//!
//! Watches the matchmaker event stream and queries the event history.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mev_share_client::{ConnectionState, MevShareClient, MevShareConfig};
use mev_share_types::{EventHistoryParams, EventKind, PendingEvent};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Network preset
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Network {
    Mainnet,
    Sepolia,
    Holesky,
}

/// Event kinds to watch
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindFilter {
    Transaction,
    Bundle,
    All,
}

impl KindFilter {
    fn kinds(self) -> &'static [EventKind] {
        match self {
            KindFilter::Transaction => &[EventKind::Transaction],
            KindFilter::Bundle => &[EventKind::Bundle],
            KindFilter::All => &EventKind::ALL,
        }
    }
}

/// MEV-Share matchmaker client
#[derive(Parser, Debug)]
#[command(name = "mev-share")]
#[command(about = "Watch and query the MEV-Share event stream", long_about = None)]
struct Args {
    /// Network preset
    #[arg(long, value_enum, default_value = "mainnet")]
    network: Network,

    /// JSON config file; replaces the network preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the relay JSON-RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the event stream URL
    #[arg(long)]
    stream_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print pending transactions and bundles as they arrive
    Watch {
        #[arg(long, value_enum, default_value = "all")]
        kind: KindFilter,

        /// Give up after this many failed reconnects (default: retry forever)
        #[arg(long)]
        max_reconnects: Option<u32>,
    },
    /// Show the range covered by the event history
    HistoryInfo,
    /// Print past events
    History {
        #[arg(long)]
        block_start: Option<u64>,
        #[arg(long)]
        block_end: Option<u64>,
        #[arg(long)]
        timestamp_start: Option<u64>,
        #[arg(long)]
        timestamp_end: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
    },
}

impl Args {
    fn config(&self) -> Result<MevShareConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => match self.network {
                Network::Mainnet => MevShareConfig::mainnet(),
                Network::Sepolia => MevShareConfig::sepolia(),
                Network::Holesky => MevShareConfig::holesky(),
            },
        };

        if let Some(url) = &self.rpc_url {
            config = config.with_rpc_url(url);
        }
        if let Some(url) = &self.stream_url {
            config = config.with_stream_url(url);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_request_timeout(Duration::from_millis(ms));
        }
        if let Command::Watch {
            max_reconnects: Some(max),
            ..
        } = self.command
        {
            config.reconnect.max_attempts = Some(max);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.config()?;
    tracing::info!("Relay: {}", config.rpc_url);
    tracing::info!("Stream: {}", config.stream_url);

    let client = MevShareClient::new(config)?;

    match args.command {
        Command::Watch { kind, .. } => watch(&client, kind).await,
        Command::HistoryInfo => history_info(&client).await,
        Command::History {
            block_start,
            block_end,
            timestamp_start,
            timestamp_end,
            limit,
            offset,
        } => {
            let params = EventHistoryParams {
                block_start,
                block_end,
                timestamp_start,
                timestamp_end,
                limit,
                offset,
            };
            history(&client, &params).await
        }
    }
}

fn print_event(event: PendingEvent) {
    match event {
        PendingEvent::Transaction(tx) => println!(
            "tx     {} to={} selector={} mevGasPrice={}",
            tx.hash,
            tx.to.as_deref().unwrap_or("-"),
            tx.function_selector.as_deref().unwrap_or("-"),
            tx.mev_gas_price.map_or_else(|| "-".to_string(), |p| p.to_string()),
        ),
        PendingEvent::Bundle(bundle) => println!(
            "bundle {} txs={} logs={}",
            bundle.hash,
            bundle.txs.as_ref().map_or(0, Vec::len),
            bundle.logs.as_ref().map_or(0, Vec::len),
        ),
    }
}

/// Stream events until Ctrl+C or the stream gives up
async fn watch(client: &MevShareClient, filter: KindFilter) -> Result<()> {
    let subscriptions = client.subscriptions();
    let mut handles = Vec::new();
    for &kind in filter.kinds() {
        handles.push(subscriptions.subscribe(kind, print_event)?);
    }
    tracing::info!("Watching {:?} events. Press Ctrl+C to stop.", filter);

    let mut state = subscriptions.watch_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
        _ = state.wait_for(|s| *s == ConnectionState::Closed) => {
            tracing::error!("Event stream closed");
        }
    }

    for handle in handles {
        subscriptions.unsubscribe(handle);
    }
    subscriptions.close();
    Ok(())
}

async fn history_info(client: &MevShareClient) -> Result<()> {
    let info = client.event_history_info().await?;
    println!("events:     {}", info.count);
    println!("blocks:     {} - {}", info.min_block, info.max_block);
    println!("timestamps: {} - {}", info.min_timestamp, info.max_timestamp);
    println!("max limit:  {}", info.max_limit);
    Ok(())
}

async fn history(client: &MevShareClient, params: &EventHistoryParams) -> Result<()> {
    let entries = client.event_history(params).await?;
    tracing::info!("{} events", entries.len());
    for entry in entries {
        print!("{} {} ", entry.block, entry.timestamp);
        print_event(entry.hint);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_preset_with_overrides() {
        let args = Args::try_parse_from([
            "mev-share",
            "--network",
            "sepolia",
            "--rpc-url",
            "http://localhost:8545",
            "--timeout-ms",
            "1500",
            "watch",
            "--kind",
            "bundle",
            "--max-reconnects",
            "4",
        ])
        .unwrap();

        let config = args.config().unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.stream_url, MevShareConfig::sepolia().stream_url);
        assert_eq!(config.request_timeout_ms, 1500);
        assert_eq!(config.reconnect.max_attempts, Some(4));
        assert!(matches!(args.command, Command::Watch { kind: KindFilter::Bundle, .. }));
    }

    #[test]
    fn test_history_defaults_to_mainnet() {
        let args = Args::try_parse_from([
            "mev-share",
            "history",
            "--block-start",
            "10",
            "--limit",
            "5",
        ])
        .unwrap();
        let config = args.config().unwrap();
        assert_eq!(config, MevShareConfig::mainnet());
        assert!(matches!(
            args.command,
            Command::History { block_start: Some(10), limit: Some(5), block_end: None, .. }
        ));
    }

    #[test]
    fn test_all_kinds() {
        assert_eq!(KindFilter::All.kinds(), &[EventKind::Transaction, EventKind::Bundle]);
    }
}
