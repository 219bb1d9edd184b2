use crate::transport::transport_event::TransportNotice;
use async_trait::async_trait;
use edgelink_core::{ConnectionOptions, SignalingRequest, SignalingResponse, TransportFailure};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Byte stream opened on a device connection.
pub trait StreamIo: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T> StreamIo for T where T: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

pub type DeviceStream = Box<dyn StreamIo>;

/// The authenticated point-to-point transport to a device.
///
/// Implemented outside this crate by whatever owns the actual channel; the
/// connection only sequences calls into it.
#[async_trait]
pub trait DeviceTransport: Send + Sync + 'static {
    /// Runs the handshake. After `Ok`, a later loss of the link is reported
    /// through `notices`.
    async fn connect(
        &self,
        options: &ConnectionOptions,
        notices: mpsc::UnboundedSender<TransportNotice>,
    ) -> Result<(), TransportFailure>;

    async fn execute(&self, request: SignalingRequest) -> Result<SignalingResponse, TransportFailure>;

    async fn open_stream(&self, port: u32) -> Result<DeviceStream, TransportFailure>;

    async fn password_authenticate(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<(), TransportFailure> {
        Err(TransportFailure::Rejected(
            "password authentication is not supported by this transport".to_owned(),
        ))
    }

    async fn close(&self);
}
