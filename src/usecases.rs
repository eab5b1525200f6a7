//! Server Use-Cases (C2): Register, Relay, Ack, Unregister composed over the
//! router. A single coordinating mutex serialises all four operations
//! process-wide so their router-call sequences stay atomic (§4.2, §5).

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::envelope::{Envelope, OwnerId};
use crate::error::RelayError;
use crate::router::Router;
use crate::sink::Sink;

/// Orchestrates the four server operations over a shared [`Router`].
pub struct UseCases {
    router: Router,
    /// The coarse coordination lock *M* described in §4.2 and §5. Held across
    /// the sink sends that make up `Relay`/`Ack`, so a slow peer back-pressures
    /// the relay operation rather than letting a sink be routed to twice.
    coordination: Mutex<()>,
}

impl Default for UseCases {
    fn default() -> Self {
        Self::new()
    }
}

impl UseCases {
    /// Builds a fresh use-case layer over a new, empty router.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            coordination: Mutex::new(()),
        }
    }

    /// Binds `owner` to `sink`. Idempotent with respect to re-registration of
    /// the same owner.
    pub async fn register(&self, owner: OwnerId, sink: Arc<dyn Sink>) {
        let _guard = self.coordination.lock().await;
        self.router.register(owner, sink);
    }

    /// Forwards `content` to one randomly chosen peer other than `from`, then
    /// echoes it back to `from`'s own sink so the sender can confirm its
    /// registration completed (§4.2). Falls back to the noop sink when no
    /// peer is eligible.
    pub async fn relay(&self, from: &str, content: &str) -> Result<(), RelayError> {
        let _guard = self.coordination.lock().await;

        let (peer_id, peer_sink, peer_result) = self.router.acquire_random(from);
        if let Err(err) = peer_result {
            if !matches!(err, RelayError::RelayerUnavailable) {
                return Err(err);
            }
        }

        let message = Envelope::Message {
            from: from.to_string(),
            content: content.to_string(),
        };
        let send_result = peer_sink.send(message.clone()).await;

        let owner_sink = match self.router.acquire(from) {
            Ok(sink) => sink,
            Err(err) => {
                self.router.release(peer_id, peer_sink);
                return Err(err);
            }
        };

        let echo_result = owner_sink.send(message).await;

        self.router.release(from.to_string(), owner_sink);
        self.router.release(peer_id, peer_sink);

        send_result?;
        echo_result?;
        metrics::counter!("relay_relays_total").increment(1);
        Ok(())
    }

    /// Delivers an acknowledgment to its addressed owner. Best-effort: a
    /// missing destination surfaces as `RelayerUnavailable` for the caller to
    /// swallow (§4.3).
    pub async fn ack(&self, from: &str, to: &str, content: &str) -> Result<(), RelayError> {
        let _guard = self.coordination.lock().await;

        let sink = self.router.acquire(to)?;
        let result = sink
            .send(Envelope::Ack {
                from: from.to_string(),
                to: to.to_string(),
                content: content.to_string(),
            })
            .await;
        self.router.release(to.to_string(), sink);
        result?;
        metrics::counter!("relay_acks_delivered_total").increment(1);
        Ok(())
    }

    /// Removes `owner` from the registry, discarding its sink. Missing owners
    /// are not an error here; the caller logs and swallows (§4.2, §4.3).
    pub async fn unregister(&self, owner: &str) -> Result<(), RelayError> {
        let _guard = self.coordination.lock().await;
        self.router.acquire(owner).map(drop)
    }
}
