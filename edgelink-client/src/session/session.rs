use crate::media::{MediaEngine, MediaSession, MediaState, MediaTrack, Negotiation, TrackStream};
use crate::session::session_command::SessionCommand;
use crate::session::session_config::{SessionConfig, SignalingFailurePolicy};
use crate::session::session_event::{SessionEvent, SessionEvents, SessionFailure};
use crate::session::session_handle::SessionHandle;
use crate::transport::{ConnectionEvent, ConnectionEvents, DeviceConnection, DeviceTransport};
use edgelink_core::{
    ConnectionOptions, Error, InvalidStateError, NegotiationFailure, SessionId, SignalingExchange,
    SignalingFailure, SignalingResponse, TransportFailure,
};
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// The session event loop.
///
/// Drives one device from connect through media negotiation to the
/// stream-start request, reporting progress as [`SessionEvent`]s.
pub struct Session {
    id: SessionId,
    connection: DeviceConnection,
    engine: Arc<dyn MediaEngine>,
    config: SessionConfig,

    /// Commands from handles.
    command_rx: mpsc::Receiver<SessionCommand>,
    commands_closed: bool,

    connection_events: ConnectionEvents,
    event_tx: mpsc::UnboundedSender<SessionEvent>,

    media_tx: watch::Sender<Option<MediaSession>>,
    media: Option<MediaSession>,
    /// Media state while the session can still end on a media failure.
    media_state: Option<watch::Receiver<MediaState>>,
    tracks: Option<TrackStream>,

    authentication: Option<JoinHandle<Result<(), Error>>>,
    negotiation: Option<Negotiation>,
    signaling: Option<JoinHandle<Result<SignalingResponse, Error>>>,

    /// First failure seen; reported in `Ended`.
    failure: Option<SessionFailure>,
}

impl Session {
    /// Opens a connection to the device, starts connecting and spawns the loop.
    pub fn start(
        options: ConnectionOptions,
        transport: Arc<dyn DeviceTransport>,
        engine: Arc<dyn MediaEngine>,
        config: SessionConfig,
    ) -> Result<(SessionHandle, SessionEvents), InvalidStateError> {
        let id = SessionId::new();
        let connection = DeviceConnection::open(options, transport, config.connection.clone());
        let connection_events = connection.subscribe();
        connection.connect()?;

        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = watch::channel(None);

        let handle = SessionHandle {
            id,
            command_tx,
            connection: connection.clone(),
            media: media_rx,
        };

        let session = Self {
            id,
            connection,
            engine,
            config,
            command_rx,
            commands_closed: false,
            connection_events,
            event_tx,
            media_tx,
            media: None,
            media_state: None,
            tracks: None,
            authentication: None,
            negotiation: None,
            signaling: None,
            failure: None,
        };
        tokio::spawn(session.run());

        Ok((handle, SessionEvents::new(event_rx)))
    }

    /// Main loop. Runs until the connection reports Closed.
    pub async fn run(mut self) {
        info!(session = %self.id, "Session event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv(), if !self.commands_closed => match cmd {
                    Some(SessionCommand::Close) => {
                        info!(session = %self.id, "Close requested");
                        self.connection.close();
                    }
                    None => {
                        debug!(session = %self.id, "All handles dropped, closing");
                        self.commands_closed = true;
                        self.connection.close();
                    }
                },

                evt = self.connection_events.recv() => match evt {
                    Some(ConnectionEvent::Connecting) => debug!(session = %self.id, "Connecting"),
                    Some(ConnectionEvent::Connected) => self.on_connected(),
                    Some(ConnectionEvent::Closed(reason)) => {
                        self.shutdown(reason).await;
                        break;
                    }
                    None => {
                        // Unreachable while the connection lives in this struct
                        warn!(session = %self.id, "Connection event channel closed unexpectedly");
                        self.shutdown(None).await;
                        break;
                    }
                },

                res = join(&mut self.authentication) => {
                    self.authentication = None;
                    self.on_authenticated(res);
                }

                res = negotiated(&mut self.negotiation) => {
                    self.negotiation = None;
                    self.on_negotiated(res);
                }

                track = next_track(&mut self.tracks) => match track {
                    Some(track) => self.emit(SessionEvent::TrackAvailable(track)),
                    None => self.tracks = None,
                },

                res = join(&mut self.signaling) => {
                    self.signaling = None;
                    self.on_signaled(res);
                }

                _ = media_closed(&mut self.media_state) => {
                    self.media_state = None;
                    self.on_media_closed();
                }
            }
        }

        info!(session = %self.id, "Session event loop finished");
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Records the first failure and closes the connection. The resulting
    /// `Closed` event ends the loop.
    fn fail(&mut self, failure: SessionFailure) {
        if self.connection.state().is_terminal() {
            debug!(session = %self.id, "Ignoring failure after close: {}", failure);
            return;
        }
        error!(session = %self.id, "Session failed: {}", failure);
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
        self.connection.close();
    }

    fn on_connected(&mut self) {
        info!(session = %self.id, device = self.connection.options().device_id(), "Device connected");
        self.emit(SessionEvent::Connected);

        match self.config.password_auth.clone() {
            Some(auth) => {
                debug!(session = %self.id, user = %auth.username, "Authenticating");
                let connection = self.connection.clone();
                self.authentication = Some(tokio::spawn(async move {
                    connection
                        .password_authenticate(&auth.username, &auth.password)
                        .await
                }));
            }
            None => self.start_media(),
        }
    }

    fn on_authenticated(&mut self, res: Result<Result<(), Error>, JoinError>) {
        match res {
            Ok(Ok(())) => {
                info!(session = %self.id, "Password authentication succeeded");
                self.start_media();
            }
            Ok(Err(e)) => self.fail(SessionFailure::Authentication(e.to_string())),
            Err(e) => self.fail(SessionFailure::Authentication(e.to_string())),
        }
    }

    fn start_media(&mut self) {
        if self.connection.state().is_terminal() {
            debug!(session = %self.id, "Connection closing, media not started");
            return;
        }
        let media = match MediaSession::create(
            self.engine.as_ref(),
            &self.connection,
            self.config.media.clone(),
        ) {
            Ok(media) => media,
            Err(e) => return self.fail(SessionFailure::Setup(e)),
        };

        self.tracks = Some(media.tracks());
        self.media_state = Some(media.watch_state());
        match media.connect() {
            Ok(negotiation) => self.negotiation = Some(negotiation),
            Err(e) => self.fail(SessionFailure::Setup(e)),
        }
        self.media_tx.send_replace(Some(media.clone()));
        self.media = Some(media);
    }

    fn on_negotiated(&mut self, res: Result<(), NegotiationFailure>) {
        match res {
            Ok(()) => {
                info!(session = %self.id, "Media active, requesting stream start");
                self.emit(SessionEvent::MediaActive);

                let connection = self.connection.clone();
                let request = self.config.stream_request.clone();
                self.signaling = Some(tokio::spawn(async move { connection.execute(request).await }));
            }
            Err(NegotiationFailure::Cancelled) if self.connection.state().is_terminal() => {
                debug!(session = %self.id, "Negotiation cancelled by close");
            }
            Err(failure) => self.fail(SessionFailure::Negotiation(failure)),
        }
    }

    /// Negotiation failures arrive through `on_negotiated`; this only sees
    /// what the backend reported once media was up.
    fn on_media_closed(&mut self) {
        if let Some(failure) = self.media.as_ref().and_then(MediaSession::failure) {
            self.fail(SessionFailure::Media(failure));
        }
    }

    fn on_signaled(&mut self, res: Result<Result<SignalingResponse, Error>, JoinError>) {
        let outcome = match res {
            Ok(Ok(response)) => {
                SignalingExchange::new(self.config.stream_request.clone(), response).into_result()
            }
            Ok(Err(Error::Transport(e))) => Err(SignalingFailure::Transport(e)),
            Ok(Err(Error::InvalidState(e))) => Err(SignalingFailure::InvalidState(e)),
            Ok(Err(e)) => Err(SignalingFailure::Transport(TransportFailure::Io(e.to_string()))),
            Err(e) => Err(SignalingFailure::Transport(TransportFailure::Io(e.to_string()))),
        };

        match &outcome {
            Ok(response) => info!(session = %self.id, status = response.status, "Device started streaming"),
            Err(failure) => warn!(session = %self.id, "Stream start failed: {}", failure),
        }
        self.emit(SessionEvent::SignalingResult(outcome.clone()));

        if let Err(failure) = outcome
            && self.config.signaling_failure_policy == SignalingFailurePolicy::EndSession
        {
            self.fail(SessionFailure::Signaling(failure));
        }
    }

    async fn shutdown(&mut self, transport_reason: Option<TransportFailure>) {
        if let Some(auth) = self.authentication.take() {
            auth.abort();
        }
        if let Some(signaling) = self.signaling.take() {
            signaling.abort();
        }
        self.negotiation = None;
        self.media_state = None;

        if let Some(mut tracks) = self.tracks.take() {
            while let Some(track) = tracks.try_recv() {
                self.emit(SessionEvent::TrackAvailable(track));
            }
        }
        if let Some(media) = self.media.take() {
            media.close().await;
        }

        let reason = self
            .failure
            .take()
            .or_else(|| transport_reason.map(SessionFailure::Transport));
        match &reason {
            Some(r) => info!(session = %self.id, "Session ended: {}", r),
            None => info!(session = %self.id, "Session ended"),
        }
        self.emit(SessionEvent::Ended { reason });
    }
}

async fn join<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => pending().await,
    }
}

async fn negotiated(negotiation: &mut Option<Negotiation>) -> Result<(), NegotiationFailure> {
    match negotiation {
        Some(negotiation) => negotiation.await,
        None => pending().await,
    }
}

async fn media_closed(state: &mut Option<watch::Receiver<MediaState>>) {
    match state {
        Some(state) => {
            let _ = state.wait_for(|s| *s == MediaState::Closed).await;
        }
        None => pending().await,
    }
}

async fn next_track(tracks: &mut Option<TrackStream>) -> Option<MediaTrack> {
    match tracks {
        Some(tracks) => tracks.recv().await,
        None => pending().await,
    }
}
