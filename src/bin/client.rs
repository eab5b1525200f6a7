//! Relay client binary: connects to `--target`, submits one message, and
//! retransmits it on `--deadline` until its own acknowledgment arrives (§6).

use clap::Parser;
use tokio_util::sync::CancellationToken;

use relay_fabric::client::{self, ClientConfig};

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or(
        tracing_subscriber::EnvFilter::default().add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ClientConfig::parse();
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            signal_cancel.cancel();
        }
    });

    if let Err(err) = client::run(config, cancel).await {
        tracing::error!(error = %err, "client exited with error");
        std::process::exit(1);
    }
}
