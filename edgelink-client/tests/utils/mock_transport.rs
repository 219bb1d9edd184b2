use async_trait::async_trait;
use edgelink_client::{DeviceStream, DeviceTransport, TransportNotice};
use edgelink_core::{ConnectionOptions, SignalingRequest, SignalingResponse, TransportFailure};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// How the mock answers the handshake.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    Succeed,
    Reject(TransportFailure),
    /// Never completes.
    Hang,
}

/// A DeviceTransport that records every call and answers from a script.
///
/// # Example
///
/// ```ignore
/// let transport = MockTransport::new().with_response("/webrtc/get", SignalingResponse::new(404));
/// // ... start a session over Arc::new(transport.clone()) ...
/// assert_eq!(transport.requested_paths().await, vec!["/webrtc/get"]);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

struct MockInner {
    connect: ConnectScript,
    auth: Result<(), TransportFailure>,
    responses: Mutex<HashMap<String, SignalingResponse>>,
    requests: Mutex<Vec<SignalingRequest>>,
    logins: Mutex<Vec<(String, String)>>,
    notices: Mutex<Option<mpsc::UnboundedSender<TransportNotice>>>,
    closed: AtomicUsize,
}

impl MockTransport {
    /// Connects immediately and answers the stream-start request with 201.
    pub fn new() -> Self {
        Self::build(ConnectScript::Succeed, Ok(()))
    }

    pub fn with_connect(connect: ConnectScript) -> Self {
        Self::build(connect, Ok(()))
    }

    pub fn with_auth(auth: Result<(), TransportFailure>) -> Self {
        Self::build(ConnectScript::Succeed, auth)
    }

    fn build(connect: ConnectScript, auth: Result<(), TransportFailure>) -> Self {
        let mut responses = HashMap::new();
        responses.insert("/webrtc/get".to_string(), SignalingResponse::new(201));
        Self {
            inner: Arc::new(MockInner {
                connect,
                auth,
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
                logins: Mutex::new(Vec::new()),
                notices: Mutex::new(None),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    /// Answers requests for `path` with `response` from now on.
    pub async fn respond(&self, path: &str, response: SignalingResponse) {
        self.inner
            .responses
            .lock()
            .await
            .insert(path.to_string(), response);
    }

    pub async fn requested_paths(&self) -> Vec<String> {
        self.inner
            .requests
            .lock()
            .await
            .iter()
            .map(|r| r.path.clone())
            .collect()
    }

    pub async fn logins(&self) -> Vec<(String, String)> {
        self.inner.logins.lock().await.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Simulates the device link dropping after connect.
    pub async fn lose(&self, reason: TransportFailure) {
        if let Some(notices) = self.inner.notices.lock().await.as_ref() {
            let _ = notices.send(TransportNotice::Lost(reason));
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for MockTransport {
    async fn connect(
        &self,
        options: &ConnectionOptions,
        notices: mpsc::UnboundedSender<TransportNotice>,
    ) -> Result<(), TransportFailure> {
        tracing::info!("[MockTransport] connect to {}", options.device_id());
        *self.inner.notices.lock().await = Some(notices);

        match &self.inner.connect {
            ConnectScript::Succeed => Ok(()),
            ConnectScript::Reject(reason) => Err(reason.clone()),
            ConnectScript::Hang => std::future::pending().await,
        }
    }

    async fn execute(&self, request: SignalingRequest) -> Result<SignalingResponse, TransportFailure> {
        tracing::info!("[MockTransport] {} {}", request.method, request.path);
        let response = self
            .inner
            .responses
            .lock()
            .await
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| SignalingResponse::new(404));
        self.inner.requests.lock().await.push(request);
        Ok(response)
    }

    async fn open_stream(&self, port: u32) -> Result<DeviceStream, TransportFailure> {
        Err(TransportFailure::Io(format!("no stream on port {port}")))
    }

    async fn password_authenticate(&self, username: &str, password: &str) -> Result<(), TransportFailure> {
        self.inner
            .logins
            .lock()
            .await
            .push((username.to_string(), password.to_string()));
        self.inner.auth.clone()
    }

    async fn close(&self) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}
