use std::sync::Arc;
use std::time::Duration;

use edgelink_client::{
    ConnectionConfig, ConnectionEvent, ConnectionState, DeviceConnection, MediaConfig, MediaSession,
    MediaState,
};
use edgelink_core::{MediaFailure, TrackKind};

use crate::integration::init_tracing;
use crate::utils::{MockMediaEngine, MockTransport, NegotiationScript, test_options};

#[tokio::test]
async fn test_backend_failure_closes_active_media() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![(TrackKind::Video, "video0")]));
    let conn = DeviceConnection::open(
        test_options(),
        Arc::new(transport.clone()),
        ConnectionConfig::default(),
    );
    let mut events = conn.subscribe();
    conn.connect().unwrap();
    while events.recv().await != Some(ConnectionEvent::Connected) {}

    let media = MediaSession::create(&engine, &conn, MediaConfig::default()).unwrap();
    media.connect().unwrap().await.expect("negotiation succeeds");
    assert_eq!(media.state(), MediaState::Active);
    assert_eq!(media.failure(), None);

    let mut tracks = media.tracks();
    assert_eq!(tracks.recv().await.unwrap().id, "video0");

    let lost = MediaFailure::SignalingLost("stream reset".into());
    assert!(engine.fail_media(lost.clone()));

    let mut state = media.watch_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == MediaState::Closed))
        .await
        .expect("media did not close in time")
        .unwrap();

    assert_eq!(media.failure(), Some(lost));
    assert!(tracks.recv().await.is_none());
    assert_eq!(engine.closed(), 1);

    // The connection itself is left to its owner
    assert_eq!(conn.state(), ConnectionState::Connected);

    // Close after a failure is a no-op
    media.close().await;
    assert_eq!(engine.closed(), 1);
}
