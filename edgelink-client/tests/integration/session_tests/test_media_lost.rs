use edgelink_client::{ConnectionState, MediaState, SessionConfig, SessionEvent, SessionFailure};
use edgelink_core::{MediaFailure, TrackKind};

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{
    MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended, wait_for_event,
};

#[tokio::test]
async fn test_media_failure_ends_session() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![(TrackKind::Video, "video0")]));
    let (handle, mut events) = start_test_session(&transport, &engine, SessionConfig::default());

    wait_for_event(&mut events, 5000, |e| matches!(e, SessionEvent::SignalingResult(Ok(_)))).await;
    assert_eq!(handle.media_state(), Some(MediaState::Active));

    let closed = MediaFailure::PeerConnection("closed".into());
    assert!(engine.fail_media(closed.clone()));

    let seen = collect_until_ended(&mut events, 5000).await;
    match seen.last() {
        Some(SessionEvent::Ended { reason }) => {
            assert_eq!(reason.as_ref(), Some(&SessionFailure::Media(closed)));
        }
        other => panic!("expected Ended, got {other:?}"),
    }

    assert_eq!(handle.media_state(), Some(MediaState::Closed));
    assert_eq!(handle.connection_state(), ConnectionState::Closed);
    assert_eq!(engine.closed(), 1);
    assert!(events.recv().await.is_none());
}
