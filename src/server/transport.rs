//! Adapts the framed TCP transport to the [`Sink`] capability the router and
//! use-cases deal in.

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::codec::EnvelopeWriter;
use crate::envelope::Envelope;
use crate::error::RelayError;
use crate::sink::Sink;

/// A [`Sink`] backed by the write half of a real `TcpStream`. Wrapped in a
/// `Mutex` because `Sink::send` takes `&self` (the trait is shared via
/// `Arc<dyn Sink>`) while the underlying `SplitSink` needs `&mut self` to
/// write.
pub struct TransportSink {
    writer: Mutex<EnvelopeWriter<TcpStream>>,
}

impl TransportSink {
    /// Wraps a writer half for use as a router-visible sink.
    pub fn new(writer: EnvelopeWriter<TcpStream>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl Sink for TransportSink {
    async fn send(&self, env: Envelope) -> Result<(), RelayError> {
        let mut writer = self.writer.lock().await;
        writer.send(&env).await
    }
}
