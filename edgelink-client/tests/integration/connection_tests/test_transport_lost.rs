use edgelink_client::{ConnectionState, SessionConfig, SessionEvent, SessionFailure};
use edgelink_core::{TrackKind, TransportFailure};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended, wait_for_event};

#[tokio::test]
async fn test_lost_link_ends_active_session() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![(TrackKind::Video, "video0")]));
    let (handle, mut events) = start_test_session(&transport, &engine, SessionConfig::default());

    wait_for_event(&mut events, 5000, |e| matches!(e, SessionEvent::SignalingResult(_))).await;

    transport.lose(TransportFailure::Lost("link down".into())).await;

    let seen = collect_until_ended(&mut events, 5000).await;
    match seen.last() {
        Some(SessionEvent::Ended {
            reason: Some(SessionFailure::Transport(TransportFailure::Lost(msg))),
        }) => assert_eq!(msg, "link down"),
        other => panic!("expected lost transport, got {other:?}"),
    }

    assert_eq!(handle.connection_state(), ConnectionState::Closed);
    assert_eq!(engine.closed(), 1, "media backend released on loss");
}
