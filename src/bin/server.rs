//! Relay server binary: accepts connections on `--port` and routes submitted
//! messages to a randomly chosen peer (§6).

use clap::Parser;
use tokio_util::sync::CancellationToken;

use relay_fabric::server::{self, ServerConfig};

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or(
        tracing_subscriber::EnvFilter::default().add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            signal_cancel.cancel();
        }
    });

    if let Err(err) = server::run(config, cancel).await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
