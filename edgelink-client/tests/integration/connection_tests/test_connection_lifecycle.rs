use std::sync::Arc;
use std::time::Duration;

use edgelink_client::{ConnectionConfig, ConnectionEvent, ConnectionState, DeviceConnection};
use edgelink_core::{Error, SignalingRequest};

use crate::integration::init_tracing;
use crate::utils::{MockTransport, test_options};

fn open(transport: &MockTransport) -> DeviceConnection {
    DeviceConnection::open(
        test_options(),
        Arc::new(transport.clone()),
        ConnectionConfig::default(),
    )
}

#[tokio::test]
async fn test_connect_reports_connecting_then_connected() {
    init_tracing();

    let transport = MockTransport::new();
    let conn = open(&transport);
    let mut first = conn.subscribe();
    let mut second = conn.subscribe();

    assert_eq!(conn.state(), ConnectionState::Idle);
    conn.connect().expect("first connect is allowed");

    for events in [&mut first, &mut second] {
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connecting));
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
    }
    assert_eq!(conn.state(), ConnectionState::Connected);

    let response = conn
        .execute(SignalingRequest::stream_start())
        .await
        .expect("request on a connected device");
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    init_tracing();

    let transport = MockTransport::new();
    let conn = open(&transport);
    let mut events = conn.subscribe();

    conn.connect().unwrap();
    assert!(conn.connect().is_err(), "second connect must fail");

    assert_eq!(events.recv().await, Some(ConnectionEvent::Connecting));
    assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
    assert!(events.try_recv().is_none(), "second connect emitted events");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    init_tracing();

    let transport = MockTransport::new();
    let conn = open(&transport);
    let mut events = conn.subscribe();

    conn.connect().unwrap();
    assert_eq!(events.recv().await, Some(ConnectionEvent::Connecting));
    assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

    conn.close();
    conn.close();
    conn.closed().await;

    assert_eq!(events.recv().await, Some(ConnectionEvent::Closed(None)));
    assert!(events.try_recv().is_none(), "second close emitted an event");
    assert_eq!(conn.state(), ConnectionState::Closed);

    // The transport is released once, in the background
    for _ in 0..100 {
        if transport.close_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(transport.close_count(), 1);

    let err = conn
        .execute(SignalingRequest::stream_start())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}
