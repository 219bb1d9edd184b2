use edgelink_client::{ConnectionState, SessionConfig, SessionEvent, SessionFailure};
use edgelink_core::{ConfigError, ConnectionOptions, TransportFailure};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{ConnectScript, MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended};

#[tokio::test]
async fn test_rejected_handshake_ends_session() {
    init_tracing();

    let transport = MockTransport::with_connect(ConnectScript::Reject(TransportFailure::Rejected(
        "unknown device".into(),
    )));
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let (handle, mut events) = start_test_session(&transport, &engine, SessionConfig::default());

    let seen = collect_until_ended(&mut events, 5000).await;

    // The only event is the terminal one
    assert_eq!(seen.len(), 1, "unexpected events: {seen:?}");
    match &seen[0] {
        SessionEvent::Ended {
            reason: Some(SessionFailure::Transport(TransportFailure::Rejected(msg))),
        } => assert_eq!(msg, "unknown device"),
        other => panic!("expected transport failure, got {other:?}"),
    }

    assert_eq!(handle.connection_state(), ConnectionState::Failed);
    assert_eq!(engine.created(), 0, "no media session without a connection");
    assert!(transport.requested_paths().await.is_empty());
    assert!(events.recv().await.is_none(), "nothing after Ended");
}

#[test]
fn test_blank_device_id_fails_synchronously() {
    let err = ConnectionOptions::new("pr-test", " ", "key", "demosct").unwrap_err();
    assert_eq!(err, ConfigError::Missing("DeviceId"));
}
