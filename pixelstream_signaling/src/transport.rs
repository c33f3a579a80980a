//! Transport capability
//!
//! A [`Connector`] opens message-oriented connections (WebSocket semantics)
//! to the signaling server. Inbound frames and lifecycle changes are reported
//! through [`TransportEvents`]; outbound frames go through [`Connection`].

use crate::error::SignalingError;
use crate::event::{Input, TransportEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

/// Opens connections to a signaling server
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`. The session bounds this call with its
    /// connect timeout.
    async fn connect(&self, url: &str, events: TransportEvents) -> Result<Box<dyn Connection>, SignalingError>;
}

/// Write half of an open connection
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), SignalingError>;

    /// Close the connection. Must not report a disconnect event afterwards.
    async fn close(&mut self);
}

/// Handle through which a transport reports inbound traffic
#[derive(Clone)]
pub struct TransportEvents {
    epoch: u64,
    inbox: mpsc::UnboundedSender<Input>,
}

impl TransportEvents {
    pub(crate) fn new(epoch: u64, inbox: mpsc::UnboundedSender<Input>) -> Self {
        Self { epoch, inbox }
    }

    /// A text frame arrived
    pub fn message(&self, text: impl Into<String>) {
        self.post(TransportEvent::Message(text.into()));
    }

    /// The remote end closed the connection or it broke
    pub fn disconnected(&self, reason: Option<String>) {
        self.post(TransportEvent::Disconnected(reason));
    }

    /// A non-fatal error on an open connection
    pub fn error(&self, reason: impl Into<String>) {
        self.post(TransportEvent::Error(reason.into()));
    }

    /// Whether the session that owns this connection still exists
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    fn post(&self, event: TransportEvent) {
        if self.inbox.send(Input::Transport { epoch: self.epoch, event }).is_err() {
            trace!("session is gone, dropping transport event");
        }
    }
}
