use std::time::Duration;

use edgelink_client::{MediaState, SessionConfig, SessionEvent, SessionFailure, SignalingFailurePolicy};
use edgelink_core::{SignalingFailure, SignalingResponse};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended, wait_for_event};

#[tokio::test]
async fn test_rejected_stream_start_keeps_session() {
    init_tracing();

    let transport = MockTransport::new();
    transport.respond("/webrtc/get", SignalingResponse::new(404)).await;
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let (handle, mut events) = start_test_session(&transport, &engine, SessionConfig::default());

    let seen = wait_for_event(&mut events, 5000, |e| {
        matches!(e, SessionEvent::SignalingResult(_))
    })
    .await;

    match seen.last() {
        Some(SessionEvent::SignalingResult(Err(failure))) => {
            assert_eq!(failure.status(), Some(404));
        }
        other => panic!("expected rejected stream start, got {other:?}"),
    }

    // Non-fatal by default: nothing else happens until the caller closes
    let next = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(next.is_err(), "unexpected event: {next:?}");
    assert_eq!(handle.media_state(), Some(MediaState::Active));

    handle.close().await;
    let rest = collect_until_ended(&mut events, 5000).await;
    assert!(matches!(rest.last(), Some(SessionEvent::Ended { reason: None })));
}

#[tokio::test]
async fn test_end_session_policy_ends_on_rejection() {
    init_tracing();

    let transport = MockTransport::new();
    transport.respond("/webrtc/get", SignalingResponse::new(404)).await;
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let config = SessionConfig {
        signaling_failure_policy: SignalingFailurePolicy::EndSession,
        ..Default::default()
    };
    let (_handle, mut events) = start_test_session(&transport, &engine, config);

    let seen = collect_until_ended(&mut events, 5000).await;

    let results = seen
        .iter()
        .filter(|e| matches!(e, SessionEvent::SignalingResult(_)))
        .count();
    assert_eq!(results, 1, "stream start reported exactly once");

    match seen.last() {
        Some(SessionEvent::Ended {
            reason: Some(SessionFailure::Signaling(SignalingFailure::Rejected { status, .. })),
        }) => assert_eq!(*status, 404),
        other => panic!("expected signaling failure, got {other:?}"),
    }
    assert_eq!(engine.closed(), 1);
}
