use crate::media::{MediaSession, MediaState};
use crate::session::session_command::SessionCommand;
use crate::transport::{ConnectionState, DeviceConnection};
use edgelink_core::SessionId;
use tokio::sync::{mpsc, watch};

/// Control surface of a running session. Dropping every handle closes it.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) id: SessionId,
    pub(crate) command_tx: mpsc::Sender<SessionCommand>,
    pub(crate) connection: DeviceConnection,
    pub(crate) media: watch::Receiver<Option<MediaSession>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Asks the session to end. `Ended { reason: None }` follows unless it
    /// had already ended.
    pub async fn close(&self) {
        let _ = self.command_tx.send(SessionCommand::Close).await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn media_state(&self) -> Option<MediaState> {
        self.media.borrow().as_ref().map(MediaSession::state)
    }

    pub fn media_session(&self) -> Option<MediaSession> {
        self.media.borrow().clone()
    }
}
