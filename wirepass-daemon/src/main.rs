//! WirePass reconciliation daemon.
//!
//! Wires the SQLite entitlement store, the provisioning API client and the
//! front-end webhook notifier together and runs the reconciliation loop until
//! ctrl-c. The grant path is served elsewhere (the messaging front-end calls
//! into the engine library); this binary only keeps the provisioning system
//! consistent with expiry deadlines.
//!
//! Usage:
//!   wirepassd --api-url http://10.0.0.1:51821/api --notify-url http://frontend:8080/notify

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wirepass_engine::{Reconciler, ReconcilerConfig};
use wirepass_provision::{HttpConfig, HttpProvisioner};
use wirepass_store::SqliteStore;

mod webhook;

use webhook::WebhookNotifier;

#[derive(Parser, Debug)]
#[command(name = "wirepassd")]
#[command(about = "WirePass entitlement reconciliation daemon")]
struct Args {
    /// Path to the entitlement database
    #[arg(short, long, default_value = "wirepass.db")]
    database: PathBuf,

    /// Base URL of the provisioning API
    #[arg(long)]
    api_url: String,

    /// Environment variable holding the provisioning API password
    #[arg(long, default_value = "WIREPASS_API_PASSWORD")]
    password_env: String,

    /// Webhook URL the messaging front-end listens on for expiry notices
    #[arg(long)]
    notify_url: String,

    /// Minutes between reconciliation scans
    #[arg(long, default_value = "60")]
    interval_mins: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let password = std::env::var(&args.password_env)
        .with_context(|| format!("{} is not set", args.password_env))?;

    let store = Arc::new(SqliteStore::open(&args.database).context("open entitlement database")?);
    let provisioner = Arc::new(HttpProvisioner::new(HttpConfig {
        base_url: args.api_url,
        password,
        ..HttpConfig::default()
    }));
    let notifier = Arc::new(WebhookNotifier::new(args.notify_url));

    let reconciler = Reconciler::new(
        store,
        provisioner,
        notifier,
        ReconcilerConfig {
            interval_secs: args.interval_mins * 60,
            ..ReconcilerConfig::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping after in-flight records");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        "wirepassd starting, scanning every {} minutes",
        args.interval_mins
    );
    reconciler.run(shutdown_rx).await;
    Ok(())
}
