//! Wire transport & codec (A1): envelopes are serialized with `serde_json` and
//! framed with `tokio_util`'s length-delimited codec, giving both binaries a
//! single, symmetric duplex stream type to read/write envelopes from.

use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::envelope::Envelope;
use crate::error::RelayError;

/// Caps a single frame to 64 KiB; generous for opaque content strings while
/// bounding per-connection memory (§4.5: a transport safety valve, not a
/// protocol-level limit).
const MAX_FRAME_LENGTH: usize = 64 * 1024;

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

/// A duplex stream of envelopes layered over any `AsyncRead + AsyncWrite`
/// transport (in practice a `TcpStream`).
pub struct EnvelopeStream<T> {
    framed: Framed<T, LengthDelimitedCodec>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> EnvelopeStream<T> {
    /// Wraps a raw duplex transport with length-delimited envelope framing.
    pub fn new(inner: T) -> Self {
        Self {
            framed: Framed::new(inner, codec()),
        }
    }

    /// Reads the next envelope, or `None` on clean end-of-stream.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, RelayError> {
        decode_next(&mut self.framed).await
    }

    /// Sends one envelope, serialized as a single length-delimited frame.
    pub async fn send(&mut self, env: &Envelope) -> Result<(), RelayError> {
        encode_one(&mut self.framed, env).await
    }

    /// Splits into independent read/write halves so a reader task and a
    /// writer task can drive the same connection concurrently (§4.4).
    pub fn split(self) -> (EnvelopeWriter<T>, EnvelopeReader<T>) {
        let (sink, stream) = self.framed.split();
        (EnvelopeWriter { sink }, EnvelopeReader { stream })
    }
}

async fn decode_next<T: AsyncRead + AsyncWrite + Unpin>(
    framed: &mut Framed<T, LengthDelimitedCodec>,
) -> Result<Option<Envelope>, RelayError> {
    match framed.next().await {
        None => Ok(None),
        Some(Ok(bytes)) => decode(&bytes).map(Some),
        Some(Err(e)) => Err(RelayError::Transport(e)),
    }
}

async fn encode_one<T: AsyncRead + AsyncWrite + Unpin>(
    framed: &mut Framed<T, LengthDelimitedCodec>,
    env: &Envelope,
) -> Result<(), RelayError> {
    let bytes = encode(env)?;
    framed.send(bytes).await.map_err(RelayError::Transport)
}

fn decode(bytes: &BytesMut) -> Result<Envelope, RelayError> {
    serde_json::from_slice(bytes).map_err(|e| RelayError::Protocol(e.to_string()))
}

fn encode(env: &Envelope) -> Result<Bytes, RelayError> {
    serde_json::to_vec(env)
        .map(Bytes::from)
        .map_err(|e| RelayError::Protocol(e.to_string()))
}

/// The write half of a split [`EnvelopeStream`]. Implements [`crate::sink::Sink`]
/// via [`crate::server::transport::TransportSink`].
pub struct EnvelopeWriter<T> {
    pub(crate) sink: SplitSink<Framed<T, LengthDelimitedCodec>, Bytes>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> EnvelopeWriter<T> {
    /// Sends one envelope through the write half.
    pub async fn send(&mut self, env: &Envelope) -> Result<(), RelayError> {
        let bytes = encode(env)?;
        self.sink.send(bytes).await.map_err(RelayError::Transport)
    }

    /// Half-closes the send side, flushing any buffered frame first. Used by
    /// the client once its own acknowledgment has arrived (§4.4).
    pub async fn shutdown(&mut self) -> Result<(), RelayError> {
        self.sink.close().await.map_err(RelayError::Transport)
    }
}

/// The read half of a split [`EnvelopeStream`].
pub struct EnvelopeReader<T> {
    pub(crate) stream: SplitStream<Framed<T, LengthDelimitedCodec>>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> EnvelopeReader<T> {
    /// Reads the next envelope, or `None` on clean end-of-stream.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, RelayError> {
        match self.stream.next().await {
            None => Ok(None),
            Some(Ok(bytes)) => decode(&bytes).map(Some),
            Some(Err(e)) => Err(RelayError::Transport(e)),
        }
    }
}
