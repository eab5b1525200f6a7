//! Server Session Loop (C3): one instance per accepted stream. Reads
//! envelopes, dispatches them to the use-case layer, and unregisters the
//! owner on any terminating condition (§4.3).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::codec::EnvelopeStream;
use crate::envelope::{Envelope, OwnerId};
use crate::error::RelayError;
use crate::server::transport::TransportSink;
use crate::sink::Sink;
use crate::usecases::UseCases;

/// Drives a single accepted connection through S0 (Reading) / S1
/// (Dispatching) / S2 (Draining) / S3 (Terminated).
pub struct Session {
    peer_addr: SocketAddr,
    use_cases: Arc<UseCases>,
    cancel: CancellationToken,
}

impl Session {
    /// Builds a session for a freshly accepted connection.
    pub fn new(peer_addr: SocketAddr, use_cases: Arc<UseCases>, cancel: CancellationToken) -> Self {
        Self {
            peer_addr,
            use_cases,
            cancel,
        }
    }

    /// Runs the session to completion: reads envelopes until EOF, error, or
    /// cancellation, dispatching each to the use-case layer, then
    /// unregisters the most recently observed owner exactly once.
    pub async fn run(self, stream: TcpStream) {
        metrics::counter!("relay_sessions_accepted_total").increment(1);
        let envelope_stream = EnvelopeStream::new(stream);
        let (writer, mut reader) = envelope_stream.split();
        let sink: Arc<dyn Sink> = Arc::new(TransportSink::new(writer));

        let mut last_owner: Option<OwnerId> = None;

        loop {
            let envelope = tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!(peer = %self.peer_addr, "session cancelled");
                    break;
                }
                result = reader.recv() => result,
            };

            match envelope {
                Ok(Some(env)) => {
                    last_owner = Some(env.from().to_string());
                    if let Err(err) = self.dispatch(env, sink.clone()).await {
                        tracing::warn!(peer = %self.peer_addr, error = %err, "session terminating on dispatch error");
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(peer = %self.peer_addr, "peer closed stream cleanly");
                    break;
                }
                Err(RelayError::Protocol(reason)) => {
                    tracing::debug!(peer = %self.peer_addr, reason = %reason, "ignoring malformed envelope");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(peer = %self.peer_addr, error = %err, "session terminating on transport error");
                    break;
                }
            }
        }

        if let Some(owner) = last_owner {
            if let Err(err) = self.use_cases.unregister(&owner).await {
                tracing::debug!(peer = %self.peer_addr, owner = %owner, error = %err, "unregister found no entry");
            }
        }
    }

    async fn dispatch(&self, env: Envelope, sink: Arc<dyn Sink>) -> Result<(), RelayError> {
        match env {
            Envelope::Message { from, content } => {
                self.use_cases.register(from.clone(), sink).await;
                self.use_cases.relay(&from, &content).await
            }
            Envelope::Ack { from, to, content } => match self.use_cases.ack(&from, &to, &content).await {
                Ok(()) => Ok(()),
                Err(RelayError::RelayerUnavailable) => {
                    tracing::debug!(from = %from, to = %to, "ack target unavailable, swallowing");
                    Ok(())
                }
                Err(err) => Err(err),
            },
        }
    }
}
