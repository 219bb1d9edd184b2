use edgelink_client::{PasswordAuth, SessionConfig, SessionEvent, SessionFailure};
use edgelink_core::TransportFailure;

use crate::integration::{init_tracing, start_test_session};
use crate::utils::{MockMediaEngine, MockTransport, NegotiationScript, collect_until_ended, wait_for_event};

fn with_login() -> SessionConfig {
    SessionConfig {
        password_auth: Some(PasswordAuth {
            username: "admin".into(),
            password: "secret".into(),
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_login_precedes_media() {
    init_tracing();

    let transport = MockTransport::with_auth(Ok(()));
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let (handle, mut events) = start_test_session(&transport, &engine, with_login());

    let seen = wait_for_event(&mut events, 5000, |e| {
        matches!(e, SessionEvent::SignalingResult(_))
    })
    .await;

    assert!(matches!(seen.last(), Some(SessionEvent::SignalingResult(Ok(_)))));
    assert_eq!(
        transport.logins().await,
        vec![("admin".to_string(), "secret".to_string())]
    );
    assert_eq!(engine.created(), 1);

    handle.close().await;
    collect_until_ended(&mut events, 5000).await;
}

#[tokio::test]
async fn test_failed_login_ends_session() {
    init_tracing();

    let transport = MockTransport::with_auth(Err(TransportFailure::Rejected("bad password".into())));
    let engine = MockMediaEngine::new(NegotiationScript::Succeed(vec![]));
    let (_handle, mut events) = start_test_session(&transport, &engine, with_login());

    let seen = collect_until_ended(&mut events, 5000).await;

    assert!(matches!(seen.first(), Some(SessionEvent::Connected)));
    match seen.last() {
        Some(SessionEvent::Ended {
            reason: Some(SessionFailure::Authentication(msg)),
        }) => assert!(msg.contains("bad password"), "unexpected message: {msg}"),
        other => panic!("expected authentication failure, got {other:?}"),
    }
    assert_eq!(engine.created(), 0, "media must wait for login");
    assert!(transport.requested_paths().await.is_empty());
}
