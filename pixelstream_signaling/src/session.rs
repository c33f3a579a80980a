//! Signaling session: handle and task
//!
//! [`SignalingSession`] is a cheap handle. All state lives in a single task
//! that consumes commands, transport events, peer events and asynchronous
//! completions from one queue, so handlers never run concurrently.

use crate::config::SessionConfig;
use crate::error::SignalingError;
use crate::event::{Command, Input, SessionEvent, SignalingOutput, TransportEvent};
use crate::peer::{PeerConnection, PeerConnectionFactory};
use crate::state::{ConnectionState, SessionId, SessionSnapshot, SessionState};
use crate::transport::{Connection, Connector, TransportEvents};
use crate::websocket::WebSocketConnector;
use pixelstream_protocol::{ClientRequest, IceCandidate, SessionDescription, SignalingMessage, encode};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// Handle to a signaling session
///
/// Operations are queued to the session task and return immediately;
/// outcomes are reported through [`SignalingSession::events`] and
/// [`SignalingSession::watch`]. Dropping the handle closes the session.
pub struct SignalingSession {
    id: SessionId,
    inbox: mpsc::UnboundedSender<Input>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SignalingSession {
    /// Create a session and spawn its task. Must be called within a Tokio runtime.
    pub fn new(
        connector: Arc<dyn Connector>,
        factory: Arc<dyn PeerConnectionFactory>,
        config: SessionConfig,
    ) -> Result<Self, SignalingError> {
        config.validate()?;

        let id = SessionId::new();
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let state = SessionState::default();
        let (snapshot_tx, snapshot) = watch::channel(state.snapshot(id));

        let task = SessionTask {
            id,
            config,
            connector,
            factory,
            inbox: inbox.clone(),
            epoch: 0,
            peer_generation: 0,
            connection: None,
            peer: None,
            state,
            answer_in_flight: false,
            deferred: VecDeque::new(),
            observer: None,
            snapshot: snapshot_tx,
        };
        tokio::spawn(task.run(inbox_rx).instrument(info_span!("signaling_session", session = %id)));

        Ok(Self { id, inbox, snapshot })
    }

    /// Create a session that talks to the server over a WebSocket
    pub fn with_websocket(
        factory: Arc<dyn PeerConnectionFactory>,
        config: SessionConfig,
    ) -> Result<Self, SignalingError> {
        Self::new(Arc::new(WebSocketConnector::new()), factory, config)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Connect to a signaling server, closing any existing connection first
    pub fn connect(&self, address: impl Into<String>) {
        self.command(Command::Connect(address.into()));
    }

    /// Close the connection and reset the session. Closing twice is a no-op.
    pub fn close(&self) {
        self.command(Command::Close);
    }

    /// Send a local description; it always goes out tagged as an answer
    pub fn send_description(&self, description: SessionDescription) {
        self.command(Command::Send(SignalingOutput::Description(description)));
    }

    pub fn send_candidate(&self, candidate: IceCandidate) {
        self.command(Command::Send(SignalingOutput::Candidate(candidate)));
    }

    pub fn list_streamers(&self) {
        self.command(Command::Send(SignalingOutput::Request(ClientRequest::ListStreamers)));
    }

    pub fn subscribe(&self, streamer_id: impl Into<String>) {
        self.command(Command::Send(SignalingOutput::Request(ClientRequest::subscribe(streamer_id))));
    }

    /// Register the observer, replacing any previous one
    pub fn events(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.command(Command::Observe(tx));
        rx
    }

    /// Subscribe to state changes
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    fn command(&self, command: Command) {
        if self.inbox.send(Input::Command(command)).is_err() {
            debug!(session = %self.id, "session task has stopped");
        }
    }
}

impl Drop for SignalingSession {
    fn drop(&mut self) {
        let _ = self.inbox.send(Input::Command(Command::Shutdown));
    }
}

/// Owner of all session state
pub(crate) struct SessionTask {
    pub(crate) id: SessionId,
    pub(crate) config: SessionConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) factory: Arc<dyn PeerConnectionFactory>,
    pub(crate) inbox: mpsc::UnboundedSender<Input>,
    /// Bumped on every reset; stale completions carry an older value
    pub(crate) epoch: u64,
    /// Bumped for every peer connection created; events of replaced peers carry an older value
    pub(crate) peer_generation: u64,
    pub(crate) connection: Option<Box<dyn Connection>>,
    pub(crate) peer: Option<Arc<dyn PeerConnection>>,
    pub(crate) state: SessionState,
    pub(crate) answer_in_flight: bool,
    /// Negotiation messages held back while an answer is being generated
    pub(crate) deferred: VecDeque<SignalingMessage>,
    pub(crate) observer: Option<mpsc::UnboundedSender<SessionEvent>>,
    pub(crate) snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionTask {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Input>) {
        debug!("session task started");
        while let Some(input) = inbox.recv().await {
            if let Input::Command(Command::Shutdown) = input {
                self.close().await;
                self.publish();
                break;
            }
            self.dispatch(input).await;
            self.publish();
        }
        debug!("session task stopped");
    }

    async fn dispatch(&mut self, input: Input) {
        match input {
            Input::Command(command) => self.on_command(command).await,
            Input::Connected { epoch, result } => self.on_connected(epoch, result).await,
            Input::Transport { epoch, event } => {
                if self.is_current(epoch) {
                    self.on_transport(event).await;
                } else {
                    debug!(epoch, "dropping transport event from a previous connection");
                }
            }
            Input::Peer { epoch, generation, event } => {
                if self.is_current(epoch) && generation == self.peer_generation {
                    self.on_peer_event(event).await;
                } else {
                    debug!(epoch, generation, "dropping event from a previous peer connection");
                }
            }
            Input::AnswerReady { epoch, outcome } => {
                if self.is_current(epoch) {
                    self.on_answer_ready(outcome).await;
                } else {
                    debug!(epoch, "discarding answer generated before the session was reset");
                }
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect(address) => self.connect(address).await,
            Command::Close => self.close().await,
            Command::Send(output) => match output {
                SignalingOutput::Description(description) => {
                    self.send_or_report(&SignalingMessage::SessionDescription(description))
                        .await;
                }
                SignalingOutput::Candidate(candidate) => {
                    self.send_or_report(&SignalingMessage::IceCandidate(candidate)).await;
                }
                SignalingOutput::Request(request) => {
                    let _ = self.request(request).await;
                }
            },
            Command::Observe(observer) => {
                if self.observer.replace(observer).is_some() {
                    debug!("replaced session observer");
                }
            }
            // handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    async fn connect(&mut self, address: String) {
        if self.state.connection != ConnectionState::Disconnected {
            info!("closing existing signaling connection before reconnecting");
            self.close().await;
        }

        info!(%address, "connecting to signaling server");
        self.state.connection = ConnectionState::Connecting;
        self.publish();

        let epoch = self.epoch;
        let connector = Arc::clone(&self.connector);
        let events = TransportEvents::new(epoch, self.inbox.clone());
        let timeout = self.config.connect_timeout();
        let inbox = self.inbox.clone();

        tokio::spawn(
            async move {
                let result = match tokio::time::timeout(timeout, connector.connect(&address, events)).await {
                    Ok(Ok(connection)) => Ok(connection),
                    Ok(Err(SignalingError::TransportUnreachable(reason))) => {
                        Err(SignalingError::TransportUnreachable(reason))
                    }
                    Ok(Err(err)) => Err(SignalingError::TransportUnreachable(err.to_string())),
                    Err(_) => Err(SignalingError::TransportUnreachable(format!(
                        "{address}: no answer within {}ms",
                        timeout.as_millis()
                    ))),
                };
                let _ = inbox.send(Input::Connected { epoch, result });
            }
            .in_current_span(),
        );
    }

    async fn on_connected(&mut self, epoch: u64, result: Result<Box<dyn Connection>, SignalingError>) {
        if !self.is_current(epoch) || self.state.connection != ConnectionState::Connecting {
            debug!(epoch, "connect attempt finished after it was abandoned");
            if let Ok(mut connection) = result {
                connection.close().await;
            }
            return;
        }

        match result {
            Ok(connection) => {
                info!("connected to signaling server");
                self.connection = Some(connection);
                self.state.connection = ConnectionState::Connected;
                self.emit(SessionEvent::Connected);

                if self.config.auto_subscribe {
                    let _ = self.request(ClientRequest::ListStreamers).await;
                }
            }
            Err(err) => {
                warn!("could not reach signaling server: {err}");
                self.reset().await;
                self.emit(SessionEvent::Error(err));
            }
        }
    }

    /// Close the transport and reset all session state
    pub(crate) async fn close(&mut self) {
        let idle = self.state.connection == ConnectionState::Disconnected
            && self.connection.is_none()
            && self.peer.is_none();
        if idle {
            debug!("close on an idle session");
            return;
        }

        self.state.connection = ConnectionState::Closing;
        self.publish();

        let was_open = match self.connection.take() {
            Some(mut connection) => {
                connection.close().await;
                true
            }
            None => false,
        };
        self.reset().await;
        info!("signaling session closed");

        if was_open {
            self.emit(SessionEvent::Disconnected { reason: None });
        }
    }

    async fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => self.on_frame(&text).await,
            TransportEvent::Disconnected(reason) => {
                warn!(reason = reason.as_deref().unwrap_or("none"), "signaling server disconnected");
                // the transport is already gone, nothing to close
                self.connection = None;
                self.reset().await;
                self.emit(SessionEvent::Error(SignalingError::TransportDisconnected(reason.clone())));
                self.emit(SessionEvent::Disconnected { reason });
            }
            TransportEvent::Error(reason) => {
                warn!("signaling transport error: {reason}");
                self.emit(SessionEvent::Error(SignalingError::Transport(reason)));
            }
        }
    }

    /// Full reset: drops the peer connection, clears counters and invalidates
    /// every completion still in flight
    pub(crate) async fn reset(&mut self) {
        self.epoch += 1;
        if let Some(peer) = self.peer.take() {
            if let Err(err) = peer.close().await {
                debug!("error closing peer connection: {err}");
            }
        }
        self.deferred.clear();
        self.answer_in_flight = false;
        self.state.reset();
    }

    /// Encode and write a frame
    pub(crate) async fn send(&mut self, message: &SignalingMessage) -> Result<(), SignalingError> {
        self.send_text(encode(message)).await
    }

    pub(crate) async fn send_or_report(&mut self, message: &SignalingMessage) {
        if let Err(err) = self.send(message).await {
            warn!(kind = message.kind(), "could not send signaling message: {err}");
            self.emit(SessionEvent::Error(err));
        }
    }

    pub(crate) async fn request(&mut self, request: ClientRequest) -> Result<(), SignalingError> {
        let result = self.send_text(request.to_string()).await;
        match &result {
            Ok(()) => {
                if let ClientRequest::Subscribe { streamer_id } = request {
                    info!(%streamer_id, "subscribed to streamer");
                    self.state.subscribed_streamer = Some(streamer_id.clone());
                    self.emit(SessionEvent::Subscribed(streamer_id));
                }
            }
            Err(err) => {
                warn!(?request, "could not send request: {err}");
                self.emit(SessionEvent::Error(err.clone()));
            }
        }
        result
    }

    async fn send_text(&mut self, text: String) -> Result<(), SignalingError> {
        if self.state.connection != ConnectionState::Connected {
            return Err(SignalingError::NotConnected);
        }
        match self.connection.as_mut() {
            Some(connection) => connection.send(text).await,
            None => Err(SignalingError::NotConnected),
        }
    }

    pub(crate) fn emit(&mut self, event: SessionEvent) {
        if let Some(observer) = &self.observer {
            if observer.send(event).is_err() {
                debug!("session observer dropped its receiver");
                self.observer = None;
            }
        }
    }

    fn publish(&self) {
        let next = self.state.snapshot(self.id);
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
