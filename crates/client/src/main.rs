use std::sync::Arc;

use clap::Parser;
use keeper_client::config::Config;
use keeper_client::store::LocalStore;
use keeper_client::sync::{CancelToken, Reconciler, DEFAULT_TICK};
use keeper_client::transport::HttpTransport;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Secrets keeper client", long_about = None)]
struct Args {
    #[arg(long)]
    api_address: Option<String>,
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let api_address = args.api_address.unwrap_or(config.api_address.clone());
    let data_dir = args.data_dir.unwrap_or(config.data_dir.clone());

    info!(version = env!("CARGO_PKG_VERSION"), "starting keeper client");

    let transport = Arc::new(HttpTransport::new(api_address.clone()));
    let store = Arc::new(tokio::sync::Mutex::new(LocalStore::new(
        std::path::PathBuf::from(&data_dir),
    )));
    // A front end (CLI/UI) drives ClientApi against this same directory and
    // fills `token` once the user authenticates; this binary just keeps the
    // background reconciler running against whatever store state exists.
    let token = Arc::new(tokio::sync::Mutex::new(None));
    let cancel = CancelToken::new();

    let reconciler = Reconciler::new(transport, DEFAULT_TICK);
    let reconciler_cancel = cancel.clone();
    let reconciler_store = store.clone();
    let reconciler_token = token.clone();
    let reconciler_handle = tokio::spawn(async move {
        reconciler
            .run(reconciler_store, reconciler_token, reconciler_cancel)
            .await;
    });

    info!(address = %api_address, data_dir = %data_dir, "client ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    cancel.cancel();
    let _ = reconciler_handle.await;

    Ok(())
}
