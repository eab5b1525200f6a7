//! Client Retransmission State Machine (C4): sends the initial message, then
//! drives a concurrent read/react/retransmit loop over a single duplex stream
//! until its own acknowledgment arrives (§4.4).

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::codec::EnvelopeWriter;
use crate::envelope::Envelope;
use crate::error::{RelayError, Result};

/// How the writer loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Our own acknowledgment arrived; the session is complete.
    Done,
    /// The ambient cancellation token was tripped.
    Cancelled,
    /// The peer closed the stream before we saw our own acknowledgment.
    Eof,
}

/// Runs the writer half of the state machine: sends the initial message, then
/// reacts to `incoming` envelopes (forwarded by a concurrent reader task) and
/// a retransmit timer until a terminating condition is reached.
///
/// The retransmit timer is re-armed fresh every loop iteration, not just on
/// timeout, so the deadline is always measured from the end of the previous
/// iteration (§4.4: "timer reset is driven solely by timer re-arm").
pub async fn drive(
    client_id: &str,
    message: &str,
    deadline: Duration,
    mut incoming: mpsc::Receiver<Result<Envelope>>,
    writer: &mut EnvelopeWriter<TcpStream>,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    send_own_message(writer, client_id, message).await?;

    loop {
        let sleep = tokio::time::sleep(deadline);
        tokio::pin!(sleep);

        tokio::select! {
            () = cancel.cancelled() => return Ok(Outcome::Cancelled),
            () = &mut sleep => {
                send_own_message(writer, client_id, message).await?;
            }
            received = incoming.recv() => {
                match received {
                    None => return Ok(Outcome::Eof),
                    Some(Err(RelayError::Protocol(reason))) => {
                        tracing::debug!(reason = %reason, "ignoring malformed envelope");
                    }
                    Some(Err(err)) => return Err(err),
                    Some(Ok(env)) => {
                        if let Some(outcome) = react(writer, client_id, message, env).await? {
                            return Ok(outcome);
                        }
                    }
                }
            }
        }
    }
}

async fn send_own_message(writer: &mut EnvelopeWriter<TcpStream>, client_id: &str, message: &str) -> Result<()> {
    writer
        .send(&Envelope::Message {
            from: client_id.to_string(),
            content: message.to_string(),
        })
        .await
}

/// Reacts to one envelope arriving off the stream. Returns `Some(outcome)`
/// only when the loop must terminate (own-ack received); every other case
/// either replies with an ack or is silently ignored, per §4.4.
async fn react(
    writer: &mut EnvelopeWriter<TcpStream>,
    client_id: &str,
    message: &str,
    env: Envelope,
) -> Result<Option<Outcome>> {
    match env {
        Envelope::Ack { to, content, .. } if to == client_id && content == message => {
            writer.shutdown().await?;
            Ok(Some(Outcome::Done))
        }
        Envelope::Message { from, content } if from == client_id && content == message => {
            // The server's echo of our own submission; nothing to do.
            Ok(None)
        }
        Envelope::Message { from, content } => {
            writer
                .send(&Envelope::Ack {
                    from: client_id.to_string(),
                    to: from,
                    content,
                })
                .await?;
            Ok(None)
        }
        Envelope::Ack { .. } => {
            // Addressed to someone else; we don't track per-peer delivery.
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EnvelopeStream;
    use tokio::io::DuplexStream;

    fn writer_pair() -> (EnvelopeWriter<DuplexStream>, crate::codec::EnvelopeReader<DuplexStream>) {
        let (near, far) = tokio::io::duplex(4096);
        let (writer, _near_reader) = EnvelopeStream::new(near).split();
        let (_far_writer, far_reader) = EnvelopeStream::new(far).split();
        (writer, far_reader)
    }

    #[tokio::test]
    async fn own_matching_ack_shuts_down_and_reports_done() {
        let (mut writer, _peer_reader) = writer_pair();
        let outcome = react(&mut writer, "client", "hi", owner_ack("client", "hi"))
            .await
            .expect("react succeeds");
        assert_eq!(outcome, Some(Outcome::Done));
    }

    #[tokio::test]
    async fn own_echo_is_ignored() {
        let (mut writer, _peer_reader) = writer_pair();
        let echo = Envelope::Message {
            from: "client".into(),
            content: "hi".into(),
        };
        let outcome = react(&mut writer, "client", "hi", echo).await.expect("react succeeds");
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn ack_addressed_elsewhere_is_ignored() {
        let (mut writer, _peer_reader) = writer_pair();
        let outcome = react(&mut writer, "client", "hi", owner_ack("someone-else", "hi"))
            .await
            .expect("react succeeds");
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn foreign_message_gets_acked_back() {
        let (mut writer, mut peer_reader) = writer_pair();
        let incoming = Envelope::Message {
            from: "B".into(),
            content: "payload".into(),
        };
        let outcome = react(&mut writer, "client", "hi", incoming).await.expect("react succeeds");
        assert_eq!(outcome, None);

        let seen = peer_reader.recv().await.expect("recv succeeds").expect("frame present");
        match seen {
            Envelope::Ack { from, to, content } => {
                assert_eq!(from, "client");
                assert_eq!(to, "B");
                assert_eq!(content, "payload");
            }
            Envelope::Message { .. } => panic!("expected Ack reply"),
        }
    }

    fn owner_ack(to: &str, content: &str) -> Envelope {
        Envelope::Ack {
            from: "peer".into(),
            to: to.into(),
            content: content.into(),
        }
    }
}
