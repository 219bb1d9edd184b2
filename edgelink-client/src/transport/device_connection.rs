use crate::transport::device_transport::{DeviceStream, DeviceTransport};
use crate::transport::transport_config::ConnectionConfig;
use crate::transport::transport_event::{
    ConnectionEvent, ConnectionEvents, ConnectionState, TransportNotice,
};
use dashmap::DashMap;
use edgelink_core::{
    ConnectionOptions, Error, InvalidStateError, ObserverId, SignalingRequest, SignalingResponse,
    TransportFailure,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// The authenticated transport session to one device.
///
/// Cheap to clone; all clones refer to the same connection.
#[derive(Clone)]
pub struct DeviceConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    options: ConnectionOptions,
    transport: Arc<dyn DeviceTransport>,
    config: ConnectionConfig,
    state: watch::Sender<ConnectionState>,
    observers: DashMap<ObserverId, mpsc::UnboundedSender<ConnectionEvent>>,
    connect_called: AtomicBool,
}

impl DeviceConnection {
    /// Creates an idle connection. Nothing touches the network until [`connect`](Self::connect).
    pub fn open(
        options: ConnectionOptions,
        transport: Arc<dyn DeviceTransport>,
        config: ConnectionConfig,
    ) -> Self {
        debug!(device = options.device_id(), "Opening device connection");

        Self {
            inner: Arc::new(ConnectionInner {
                options,
                transport,
                config,
                state: watch::Sender::new(ConnectionState::Idle),
                observers: DashMap::new(),
                connect_called: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Registers an observer. It receives every transition from now on, in order.
    pub fn subscribe(&self) -> ConnectionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.observers.insert(ObserverId::new(), tx);
        ConnectionEvents::new(rx)
    }

    /// Starts the handshake in the background. The outcome arrives as a
    /// `Connected` or `Closed` event. Allowed once per connection.
    pub fn connect(&self) -> Result<(), InvalidStateError> {
        if self.inner.connect_called.swap(true, Ordering::SeqCst) {
            return Err(InvalidStateError::new("connect twice", self.state()));
        }

        let connecting = self.inner.transition(
            |s| s == ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionEvent::Connecting,
        );
        if connecting.is_none() {
            return Err(InvalidStateError::new("connect", self.state()));
        }

        info!(device = self.inner.options.device_id(), "Connecting to device");
        tokio::spawn(self.inner.clone().run_handshake());
        Ok(())
    }

    /// Moves any live state to Closed. Calling it again is a no-op.
    pub fn close(&self) {
        let Some(previous) = self.inner.transition(
            |s| !s.is_terminal(),
            ConnectionState::Closed,
            ConnectionEvent::Closed(None),
        ) else {
            return;
        };

        info!(device = self.inner.options.device_id(), "Device connection closed");

        if previous != ConnectionState::Idle {
            self.inner.release_transport();
        }
    }

    /// Resolves once the connection is Closed or Failed.
    pub async fn closed(&self) {
        self.inner.closed().await
    }

    pub async fn execute(&self, request: SignalingRequest) -> Result<SignalingResponse, Error> {
        self.require_connected("execute a request")?;
        debug!(method = %request.method, path = %request.path, "Executing device request");
        Ok(self.inner.transport.execute(request).await?)
    }

    pub async fn open_stream(&self, port: u32) -> Result<DeviceStream, Error> {
        self.require_connected("open a stream")?;
        debug!(port, "Opening device stream");
        Ok(self.inner.transport.open_stream(port).await?)
    }

    pub async fn password_authenticate(&self, username: &str, password: &str) -> Result<(), Error> {
        self.require_connected("authenticate")?;
        Ok(self
            .inner
            .transport
            .password_authenticate(username, password)
            .await?)
    }

    fn require_connected(&self, operation: &'static str) -> Result<(), InvalidStateError> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            other => Err(InvalidStateError::new(operation, other)),
        }
    }
}

impl ConnectionInner {
    /// Applies `next` if the current state passes `allowed`, emitting `event`
    /// to every observer while the state lock is held. Returns the state that
    /// was replaced.
    fn transition(
        &self,
        allowed: impl FnOnce(ConnectionState) -> bool,
        next: ConnectionState,
        event: ConnectionEvent,
    ) -> Option<ConnectionState> {
        let mut previous = None;
        let mut dead = Vec::new();

        self.state.send_if_modified(|state| {
            if !allowed(*state) {
                return false;
            }
            previous = Some(*state);
            *state = next;

            for observer in self.observers.iter() {
                if observer.value().send(event.clone()).is_err() {
                    dead.push(*observer.key());
                }
            }
            true
        });

        for id in dead {
            self.observers.remove(&id);
        }
        previous
    }

    async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }

    fn release_transport(&self) {
        let transport = self.transport.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { transport.close().await });
        }
    }

    async fn run_handshake(self: Arc<Self>) {
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

        let handshake = async {
            let connect = self.transport.connect(&self.options, notice_tx);
            match self.config.connect_timeout {
                Some(limit) => tokio::time::timeout(limit, connect)
                    .await
                    .unwrap_or(Err(TransportFailure::TimedOut)),
                None => connect.await,
            }
        };

        let result = tokio::select! {
            res = handshake => res,
            _ = self.closed() => {
                debug!("Handshake abandoned, connection closed by caller");
                return;
            }
        };

        match result {
            Ok(()) => {
                let connected = self.transition(
                    |s| s == ConnectionState::Connecting,
                    ConnectionState::Connected,
                    ConnectionEvent::Connected,
                );
                if connected.is_none() {
                    return;
                }
                info!(device = self.options.device_id(), "Device connected");
                self.watch_notices(&mut notice_rx).await;
            }
            Err(reason) => {
                warn!(device = self.options.device_id(), "Connect failed: {}", reason);
                self.transition(
                    |s| s == ConnectionState::Connecting,
                    ConnectionState::Failed,
                    ConnectionEvent::Closed(Some(reason)),
                );
                self.release_transport();
            }
        }
    }

    async fn watch_notices(&self, notices: &mut mpsc::UnboundedReceiver<TransportNotice>) {
        tokio::select! {
            notice = notices.recv() => {
                let Some(TransportNotice::Lost(reason)) = notice else {
                    return;
                };
                warn!(device = self.options.device_id(), "Transport lost: {}", reason);
                let closed = self.transition(
                    |s| !s.is_terminal(),
                    ConnectionState::Closed,
                    ConnectionEvent::Closed(Some(reason)),
                );
                if closed.is_some() {
                    self.release_transport();
                }
            }
            _ = self.closed() => {}
        }
    }
}

impl fmt::Debug for DeviceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConnection")
            .field("device_id", &self.inner.options.device_id())
            .field("state", &self.state())
            .finish()
    }
}
