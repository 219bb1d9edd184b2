use std::sync::Arc;

use edgelink_client::{ConnectionConfig, DeviceConnection, MediaConfig, MediaSession};

use crate::integration::init_tracing;
use crate::utils::{MockMediaEngine, MockTransport, NegotiationScript, test_options};

#[tokio::test]
async fn test_media_session_requires_connected_device() {
    init_tracing();

    let transport = MockTransport::new();
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let conn = DeviceConnection::open(test_options(), Arc::new(transport), ConnectionConfig::default());

    let err = MediaSession::create(&engine, &conn, MediaConfig::default()).unwrap_err();
    assert!(err.to_string().contains("idle"), "unexpected error: {err}");

    conn.close();
    assert!(MediaSession::create(&engine, &conn, MediaConfig::default()).is_err());

    assert_eq!(engine.created(), 0, "engine must not be touched");
}
