//! End-to-end scenarios driven over real loopback TCP connections, exercising
//! the full server session loop (register/relay/ack/unregister) the way two
//! or more live clients would.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use relay_fabric::client::{self, ClientConfig};
use relay_fabric::codec::EnvelopeStream;
use relay_fabric::envelope::Envelope;
use relay_fabric::server::session::Session;
use relay_fabric::usecases::UseCases;

async fn spawn_test_server() -> (SocketAddr, Arc<UseCases>, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has a local address");
    let use_cases = Arc::new(UseCases::new());
    let cancel = CancellationToken::new();

    let accept_use_cases = use_cases.clone();
    let accept_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = accept_cancel.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let session = Session::new(peer_addr, accept_use_cases.clone(), accept_cancel.child_token());
                    tokio::spawn(async move {
                        session.run(stream).await;
                    });
                }
            }
        }
    });

    (addr, use_cases, cancel)
}

async fn connect(addr: SocketAddr) -> EnvelopeStream<TcpStream> {
    let stream = TcpStream::connect(addr).await.expect("connect to test server");
    EnvelopeStream::new(stream)
}

fn expect_message(env: Envelope) -> (String, String) {
    match env {
        Envelope::Message { from, content } => (from, content),
        Envelope::Ack { .. } => panic!("expected a Message envelope, got an Ack"),
    }
}

/// Scenario 1: a single client's opening message is echoed back verbatim.
#[tokio::test]
async fn register_and_echo() {
    let (addr, _use_cases, _cancel) = spawn_test_server().await;
    let mut a = connect(addr).await;

    a.send(&Envelope::Message {
        from: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");

    let reply = a.recv().await.expect("recv succeeds").expect("server replies before EOF");
    let (from, content) = expect_message(reply);
    assert_eq!(from, "A");
    assert_eq!(content, "1");
}

/// Scenario 2: with exactly one other peer registered, a relay lands on that
/// peer and echoes back to the sender.
#[tokio::test]
async fn relay_to_only_other_peer() {
    let (addr, _use_cases, _cancel) = spawn_test_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    b.send(&Envelope::Message {
        from: "B".into(),
        content: "seed".into(),
    })
    .await
    .expect("send succeeds");
    b.recv().await.expect("recv succeeds").expect("B sees its own echo");

    a.send(&Envelope::Message {
        from: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");

    let relayed = b.recv().await.expect("recv succeeds").expect("B receives A's relay");
    let (from, content) = expect_message(relayed);
    assert_eq!(from, "A");
    assert_eq!(content, "1");

    let echo = a.recv().await.expect("recv succeeds").expect("A receives its own echo");
    let (from, content) = expect_message(echo);
    assert_eq!(from, "A");
    assert_eq!(content, "1");
}

/// Scenario 3: an Ack addressed back to the original sender is delivered
/// through the server untouched.
#[tokio::test]
async fn ack_is_delivered_to_its_addressed_owner() {
    let (addr, use_cases, _cancel) = spawn_test_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    b.send(&Envelope::Message {
        from: "B".into(),
        content: "seed".into(),
    })
    .await
    .expect("send succeeds");
    b.recv().await.expect("recv succeeds").expect("B sees its own echo");

    a.send(&Envelope::Message {
        from: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");
    b.recv().await.expect("recv succeeds").expect("B receives the relay");
    a.recv().await.expect("recv succeeds").expect("A receives its own echo");

    b.send(&Envelope::Ack {
        from: "B".into(),
        to: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");

    let ack = a.recv().await.expect("recv succeeds").expect("A receives the ack");
    match ack {
        Envelope::Ack { from, to, content } => {
            assert_eq!(from, "B");
            assert_eq!(to, "A");
            assert_eq!(content, "1");
        }
        Envelope::Message { .. } => panic!("expected an Ack"),
    }

    drop(a);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let probe = use_cases.ack("probe", "A", "x").await;
    assert!(
        matches!(probe, Err(relay_fabric::error::RelayError::RelayerUnavailable)),
        "A's session should have unregistered after closing its stream"
    );
}

/// Scenario 6: a client that sends one message and disconnects without
/// acknowledging anything is unregistered exactly once.
#[tokio::test]
async fn unregister_on_eof() {
    let (addr, use_cases, _cancel) = spawn_test_server().await;
    let mut a = connect(addr).await;

    a.send(&Envelope::Message {
        from: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");
    a.recv().await.expect("recv succeeds").expect("A receives its own echo");

    drop(a);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let probe = use_cases.ack("probe", "A", "x").await;
    assert!(
        matches!(probe, Err(relay_fabric::error::RelayError::RelayerUnavailable)),
        "owner must be absent from the registry once its session has drained"
    );
}

/// Scenario 5: if a peer disconnects before a relay is attempted, the sender
/// still gets its own echo (noop fallback) and the server does not crash.
#[tokio::test]
async fn relay_survives_a_peer_disconnecting_first() {
    let (addr, _use_cases, _cancel) = spawn_test_server().await;
    let mut b = connect(addr).await;

    b.send(&Envelope::Message {
        from: "B".into(),
        content: "seed".into(),
    })
    .await
    .expect("send succeeds");
    b.recv().await.expect("recv succeeds").expect("B sees its own echo");
    drop(b);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut a = connect(addr).await;
    a.send(&Envelope::Message {
        from: "A".into(),
        content: "1".into(),
    })
    .await
    .expect("send succeeds");

    let echo = a.recv().await.expect("recv succeeds").expect("A receives its own echo");
    let (from, content) = expect_message(echo);
    assert_eq!(from, "A");
    assert_eq!(content, "1");
}

/// Scenario 4: with no ack ever arriving, the client keeps resending an
/// identical copy of its opening message on its retransmission deadline.
#[tokio::test]
async fn client_retransmits_until_acknowledged() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has a local address");

    let collector = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept succeeds");
        let mut stream = EnvelopeStream::new(stream);
        let first = stream.recv().await.expect("recv succeeds").expect("first message");
        let second = stream.recv().await.expect("recv succeeds").expect("second message");
        (first, second)
    });

    let config = ClientConfig {
        target: addr.to_string(),
        deadline: Duration::from_millis(50),
        sidecar_enabled: false,
        sidecar_port: 0,
    };
    let cancel = CancellationToken::new();
    let client_cancel = cancel.clone();
    let client_task = tokio::spawn(async move {
        let _ = client::run(config, client_cancel).await;
    });

    let (first, second) = collector.await.expect("collector task does not panic");
    let (f1, c1) = expect_message(first);
    let (f2, c2) = expect_message(second);
    assert_eq!(f1, f2, "retransmission must use the same owner id");
    assert_eq!(c1, c2, "retransmission must resend identical content");

    cancel.cancel();
    client_task.await.expect("client task does not panic");
}
