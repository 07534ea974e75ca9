//! Transaction latency prober
//!
//! Long-running process: every `probe.interval_ms` it sends a minimal
//! EIP-1559 transaction from the configured account, measures the broadcast
//! latency and uploads one Parquet record per attempt.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use tx_latency_probe::alert::{AlertNotifier, LogNotifier, SlackNotifier};
use tx_latency_probe::config::Config;
use tx_latency_probe::endpoints;
use tx_latency_probe::probe::{BalanceWatchdog, ProbeScheduler, ProbeSettings, TransactionProber};
use tx_latency_probe::probe::result::now_ms;
use tx_latency_probe::rpc::AlloyRpc;
use tx_latency_probe::sink::{ArtifactSink, S3Uploader};
use tx_latency_probe::wallet::ProbeWallet;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file; PROBER_* variables override it
    #[arg(short, long, default_value = "prober.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from: {}", args.config);
    let mut config = Config::load(&args.config)?;

    let private_key = Zeroizing::new(std::mem::take(&mut config.wallet.private_key));
    let wallet = ProbeWallet::from_private_key(&private_key).context("Failed to load wallet")?;
    drop(private_key);
    let address = wallet.address();
    info!("Prober address: {}", address);

    let rpc = Arc::new(AlloyRpc::new(&config.rpc.url)?);
    info!(endpoint = %rpc.endpoint(), chain_id = config.rpc.chain_id, "RPC client ready");

    let notifier: Arc<dyn AlertNotifier> = match config.alert.webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => Arc::new(SlackNotifier::new(
            url,
            config.alert.channel.clone(),
            config.alert.auth_token.clone(),
        )),
        _ => {
            warn!("alert.webhook_url not set; low balance alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let watchdog = BalanceWatchdog::new(rpc.clone(), notifier, config.watchdog_config());

    let uploader = S3Uploader::from_env(
        config.storage.bucket.clone(),
        config.storage.region.clone(),
        config.storage.key_prefix.clone(),
    )
    .await;
    tokio::fs::create_dir_all(&config.storage.artifact_dir)
        .await
        .with_context(|| format!("Failed to create artifact dir {}", config.storage.artifact_dir))?;
    info!(bucket = %uploader.bucket(), artifact_dir = %config.storage.artifact_dir, "Result storage ready");
    let sink = Arc::new(ArtifactSink::new(config.storage.artifact_dir.clone(), Arc::new(uploader)));

    let settings = ProbeSettings {
        chain_id: config.rpc.chain_id,
        recipient: config.recipient_override()?.unwrap_or(address),
        amount_wei: config.amount_wei()?,
        max_fee: config.probe.max_fee_gwei,
        max_priority_fee: config.probe.max_priority_fee_gwei,
    };
    let prober = Arc::new(TransactionProber::new(rpc, wallet, watchdog, sink, settings));

    if config.monitoring.enable_metrics {
        let metrics_port = config.monitoring.metrics_port;
        info!("Starting metrics server on port {}", metrics_port);
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let interval = config.probe_interval()?;
    info!(
        "starting tx latency measurement... start time = {}, interval = {}ms",
        now_ms(),
        interval.as_millis()
    );

    let scheduler = ProbeScheduler::new(prober, interval);
    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await;

    info!("Shutting down");
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "tx_latency_probe=debug,info"
    } else {
        "tx_latency_probe=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
