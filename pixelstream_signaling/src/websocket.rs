//! WebSocket transport built on tokio-tungstenite

use crate::error::SignalingError;
use crate::transport::{Connection, Connector, TransportEvents};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tracing::{debug, trace, warn};

/// Longest a close waits for queued frames and the close frame to be written
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connects to signaling servers over `ws://` URLs
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str, events: TransportEvents) -> Result<Box<dyn Connection>, SignalingError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| SignalingError::TransportUnreachable(format!("{url}: {e}")))?;
        debug!(url, "signaling websocket connected");

        let (mut write, mut read) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    debug!("signaling websocket write failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "ws_in text");
                        events.message(text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => events.message(text),
                        Err(_) => events.error("received non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|reason| !reason.is_empty());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => match err {
                        WsError::ConnectionClosed
                        | WsError::AlreadyClosed
                        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                            debug!("signaling websocket closed: {err}");
                            break None;
                        }
                        err => {
                            warn!("signaling websocket error: {err}");
                            break Some(err.to_string());
                        }
                    },
                    None => break None,
                }
            };
            events.disconnected(reason);
        });

        Ok(Box::new(WebSocketConnection {
            outbound,
            reader,
            writer: Some(writer),
        }))
    }
}

struct WebSocketConnection {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        trace!(len = text.len(), "ws_out text");
        self.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| SignalingError::TransportDisconnected(None))
    }

    async fn close(&mut self) {
        // Stop reading first so a user-initiated close is not reported as a disconnect
        self.reader.abort();
        let _ = self.outbound.send(Message::Close(None));
        if let Some(mut writer) = self.writer.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
                warn!("signaling websocket did not drain within {CLOSE_TIMEOUT:?}, dropping it");
                writer.abort();
            }
        }
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
