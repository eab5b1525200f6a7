//! Server-side components: the session loop (C3), its transport adapter,
//! configuration/CLI surface, and the observability sidecar.

pub mod config;
pub mod session;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use config::ServerConfig;
use session::Session;

use crate::sidecar::{self, Readiness};
use crate::usecases::UseCases;

/// Runs the relay server until `cancel` is tripped: accepts connections on
/// `config.port`, spawning a [`Session`] per connection, and (unless
/// disabled) the observability sidecar on `config.sidecar_port`.
pub async fn run(config: ServerConfig, cancel: CancellationToken) -> std::io::Result<()> {
    let use_cases = Arc::new(UseCases::new());
    let readiness = Arc::new(Readiness::default());

    if config.sidecar_enabled {
        let sidecar_readiness = readiness.clone();
        let sidecar_port = config.sidecar_port;
        tokio::spawn(async move {
            if let Err(err) = sidecar::serve(sidecar_port, sidecar_readiness).await {
                tracing::warn!(error = %err, "sidecar exited");
            }
        });
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "relay server listening");
    readiness.mark_ready();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("relay server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer_addr) = accepted?;
                let session = Session::new(peer_addr, use_cases.clone(), cancel.child_token());
                tracing::info!(%peer_addr, "accepted connection");
                tokio::spawn(async move {
                    session.run(stream).await;
                    tracing::info!(%peer_addr, "session terminated");
                });
            }
        }
    }
}
