//! Client-side components: the retransmission state machine (C4), its
//! reader/writer split over a real TCP connection, and the configuration/CLI
//! surface.

pub mod config;
pub mod state_machine;

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use config::ClientConfig;
use state_machine::Outcome;

use crate::codec::EnvelopeStream;
use crate::error::{RelayError, Result};
use crate::sidecar::{self, Readiness};

const MESSAGE_LEN: usize = 16;
const READER_CHANNEL_CAPACITY: usize = 1;

fn random_message() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MESSAGE_LEN)
        .map(char::from)
        .collect()
}

/// Connects to `config.target` and drives one client session to completion:
/// send, react, retransmit, until our own acknowledgment arrives or `cancel`
/// is tripped.
pub async fn run(config: ClientConfig, cancel: CancellationToken) -> Result<()> {
    let client_id = Uuid::new_v4().to_string();
    let message = random_message();
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

    tracing::info!(client_id = %client_id, target = %config.target, "connecting");
    let stream = TcpStream::connect(&config.target).await?;
    readiness.mark_ready();

    let (mut writer, mut reader) = EnvelopeStream::new(stream).split();
    let (tx, rx) = mpsc::channel(READER_CHANNEL_CAPACITY);

    let reader_task = tokio::spawn(async move {
        loop {
            match reader.recv().await {
                Ok(Some(env)) => {
                    if tx.send(Ok(env)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(RelayError::Protocol(reason)) => {
                    tracing::debug!(reason = %reason, "ignoring malformed envelope");
                    continue;
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
    });

    let outcome = state_machine::drive(&client_id, &message, config.deadline, rx, &mut writer, &cancel).await;
    reader_task.abort();

    match outcome {
        Ok(Outcome::Done) => {
            tracing::info!(client_id = %client_id, "own acknowledgment received, session complete");
            Ok(())
        }
        Ok(Outcome::Cancelled) => {
            tracing::info!(client_id = %client_id, "client cancelled");
            Ok(())
        }
        Ok(Outcome::Eof) => {
            tracing::info!(client_id = %client_id, "server closed the stream before acknowledging");
            Ok(())
        }
        Err(err) => {
            tracing::warn!(client_id = %client_id, error = %err, "client session failed");
            Err(err)
        }
    }
}
