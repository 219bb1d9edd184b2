use std::sync::Arc;
use std::time::Duration;

use edgelink_client::{
    ConnectionConfig, ConnectionEvent, DeviceConnection, MediaConfig, MediaSession, SessionConfig,
    SessionEvent, SessionFailure,
};
use edgelink_core::NegotiationFailure;

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{
    MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended, position, test_options,
};

fn short_timeout() -> MediaConfig {
    MediaConfig {
        negotiation_timeout: Some(Duration::from_secs(5)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_negotiation_times_out() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Hang);
    let conn = DeviceConnection::open(
        test_options(),
        Arc::new(transport.clone()),
        ConnectionConfig::default(),
    );
    let mut events = conn.subscribe();
    conn.connect().unwrap();
    while events.recv().await != Some(ConnectionEvent::Connected) {}

    let media = MediaSession::create(&engine, &conn, short_timeout()).unwrap();
    let result = media.connect().unwrap().await;

    assert_eq!(result, Err(NegotiationFailure::TimedOut));
    assert_eq!(engine.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_timeout_skips_stream_start() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Hang);
    let config = SessionConfig {
        media: short_timeout(),
        ..Default::default()
    };
    let (_handle, mut events) = start_test_session(&transport, &engine, config);

    let seen = collect_until_ended(&mut events, 60_000).await;

    assert!(position(&seen, |e| matches!(e, SessionEvent::Connected)).is_some());
    assert!(position(&seen, |e| matches!(e, SessionEvent::MediaActive)).is_none());
    assert!(position(&seen, |e| matches!(e, SessionEvent::SignalingResult(_))).is_none());
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::Ended {
            reason: Some(SessionFailure::Negotiation(NegotiationFailure::TimedOut))
        })
    ));
    assert!(
        transport.requested_paths().await.is_empty(),
        "stream start must wait for active media"
    );
}
