use std::sync::Arc;

use clap::Parser;
use common::TokenIssuer;
use keeper_server::config::Config;
use keeper_server::keeper::Keeper;
use keeper_server::storage::Storage;
use keeper_server::{rest, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Secrets keeper server", long_about = None)]
struct Args {
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let database_path = args.database_path.unwrap_or(config.database_path.clone());
    let rest_address = match args.port {
        Some(port) => format!("127.0.0.1:{port}"),
        None => config.rest_address.clone(),
    };

    info!(version = env!("CARGO_PKG_VERSION"), "starting keeper server");

    let storage = Arc::new(Storage::open(std::path::Path::new(&database_path))?);
    let keeper = Keeper::new(storage, config.encrypt_key.clone());
    let token_issuer = TokenIssuer::new(config.secret_key.as_bytes().to_vec());
    let state = AppState::new(keeper, token_issuer);

    let app = rest::router(state);

    info!(address = %rest_address, ssl = config.ssl_enable, "listening");

    if config.ssl_enable {
        let addr: std::net::SocketAddr = rest_address.parse()?;
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &config.tls_cert_path,
            &config.tls_key_path,
        )
        .await?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(5)));
        });

        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(&rest_address).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
