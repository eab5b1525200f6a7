//! The `Sink` capability (§3): a single-operation handle bound to exactly one
//! live client stream.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::envelope::Envelope;
use crate::error::RelayError;

/// Attempts to deliver an envelope to whichever stream this sink is bound to.
///
/// Implementations must not assume anything about the caller's locking state;
/// the router guarantees sinks are never invoked while its own registry mutex
/// is held (§5), but a send may still suspend on the transport.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sends `env` to the remote end. An error here is always a transport
    /// failure; the sink does not interpret envelope contents.
    async fn send(&self, env: Envelope) -> Result<(), RelayError>;
}

impl fmt::Debug for dyn Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Sink")
    }
}

/// A sink that accepts any envelope and discards it (I5: its send never
/// errors). Returned only by `Router::acquire_random` when no eligible peer
/// exists (§3, §4.1).
#[derive(Debug, Default)]
pub struct NoopSink {
    sent: AtomicUsize,
}

impl NoopSink {
    /// Creates a fresh noop sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of envelopes absorbed so far. Exposed for tests verifying P4.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Sink for NoopSink {
    async fn send(&self, _env: Envelope) -> Result<(), RelayError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Builds a shared handle to a fresh noop sink.
pub fn noop_sink() -> Arc<dyn Sink> {
    Arc::new(NoopSink::new())
}
