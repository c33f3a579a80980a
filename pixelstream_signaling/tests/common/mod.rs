//! Shared test harness
//!
//! - `MemoryConnector` hands every opened connection to the test as a
//!   [`MemoryLink`], so the test plays the signaling server.
//! - `FakeEngine` stands in for a WebRTC engine and records every call the
//!   session makes. Answer generation can be held back with a gate to
//!   exercise in-flight behaviour.

#![allow(dead_code)]

use async_trait::async_trait;
use pixelstream_signaling::protocol::{IceCandidate, IceServer, SdpKind, SessionDescription};
use pixelstream_signaling::{
    Connection, Connector, PeerConnection, PeerConnectionFactory, PeerEvents, SessionConfig, SessionEvent,
    SessionSnapshot, SignalingError, SignalingSession, TransportEvents,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How a [`MemoryConnector`] reacts to connect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Accept,
    Refuse,
    Hang,
}

pub struct MemoryConnector {
    mode: ConnectMode,
    links: mpsc::UnboundedSender<MemoryLink>,
}

impl MemoryConnector {
    pub fn new(mode: ConnectMode) -> (Arc<Self>, mpsc::UnboundedReceiver<MemoryLink>) {
        let (links, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { mode, links }), rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str, events: TransportEvents) -> Result<Box<dyn Connection>, SignalingError> {
        match self.mode {
            ConnectMode::Refuse => return Err(SignalingError::TransportUnreachable(format!("{url}: refused"))),
            ConnectMode::Hang => std::future::pending::<()>().await,
            ConnectMode::Accept => {}
        }

        let (sent_tx, sent) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.links.send(MemoryLink {
            events,
            sent,
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(MemoryConnection { sent: sent_tx, closed }))
    }
}

struct MemoryConnection {
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SignalingError::TransportDisconnected(None));
        }
        self.sent
            .send(text)
            .map_err(|_| SignalingError::TransportDisconnected(None))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Server side of one in-memory connection
pub struct MemoryLink {
    pub events: TransportEvents,
    pub sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MemoryLink {
    pub fn deliver(&self, message: Value) {
        self.events.message(message.to_string());
    }

    pub fn deliver_raw(&self, text: &str) {
        self.events.message(text);
    }

    /// Next frame the session wrote, parsed as JSON
    pub async fn next_sent(&mut self) -> Value {
        let text = timeout(WAIT, self.sent.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("connection dropped");
        serde_json::from_str(&text).expect("outbound frame is not JSON")
    }

    pub fn nothing_sent(&mut self) -> bool {
        self.sent.try_recv().is_err()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Calls made by the session on the fake engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { ice_servers: usize },
    SetRemote(SdpKind),
    CreateAnswer,
    SetLocal(String),
    AddCandidate(String),
    Close,
}

#[derive(Default)]
struct EngineShared {
    calls: Mutex<Vec<Call>>,
    events: Mutex<Option<PeerEvents>>,
    gate: Option<Semaphore>,
    answers: AtomicUsize,
    reject_candidates: AtomicBool,
}

impl EngineShared {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    shared: Arc<EngineShared>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose `create_answer` waits for [`FakeEngine::release`]
    pub fn gated() -> Self {
        Self {
            shared: Arc::new(EngineShared {
                gate: Some(Semaphore::new(0)),
                ..EngineShared::default()
            }),
        }
    }

    pub fn release(&self, answers: usize) {
        if let Some(gate) = &self.shared.gate {
            gate.add_permits(answers);
        }
    }

    pub fn reject_candidates(&self) {
        self.shared.reject_candidates.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    /// Event handle of the most recently created peer connection
    pub fn events(&self) -> PeerEvents {
        self.shared
            .events
            .lock()
            .unwrap()
            .clone()
            .expect("no peer connection created yet")
    }

    /// Poll the call log until `matches` holds
    pub async fn wait_for(&self, matches: impl Fn(&[Call]) -> bool) {
        timeout(WAIT, async {
            while !matches(&self.calls()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for engine calls");
    }
}

#[async_trait]
impl PeerConnectionFactory for FakeEngine {
    async fn create_peer_connection(
        &self,
        ice_servers: &[IceServer],
        events: PeerEvents,
    ) -> Result<Arc<dyn PeerConnection>, SignalingError> {
        self.shared.record(Call::Create {
            ice_servers: ice_servers.len(),
        });
        *self.shared.events.lock().unwrap() = Some(events);
        Ok(Arc::new(FakePeer {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakePeer {
    shared: Arc<EngineShared>,
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), SignalingError> {
        self.shared.record(Call::SetRemote(description.kind));
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, SignalingError> {
        self.shared.record(Call::CreateAnswer);
        if let Some(gate) = &self.shared.gate {
            gate.acquire()
                .await
                .map_err(|e| SignalingError::PeerConnection(e.to_string()))?
                .forget();
        }
        let n = self.shared.answers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescription::answer(format!("v=0 answer-{n}")))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), SignalingError> {
        self.shared.record(Call::SetLocal(description.sdp));
        Ok(())
    }

    async fn add_remote_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalingError> {
        if self.shared.reject_candidates.load(Ordering::SeqCst) {
            return Err(SignalingError::PeerConnection("candidate rejected".to_string()));
        }
        self.shared.record(Call::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<(), SignalingError> {
        self.shared.record(Call::Close);
        Ok(())
    }
}

/// Session wired to an in-memory server and a fake engine
pub struct Harness {
    pub session: SignalingSession,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub links: mpsc::UnboundedReceiver<MemoryLink>,
    pub engine: FakeEngine,
}

impl Harness {
    pub fn new(mode: ConnectMode, engine: FakeEngine, config: SessionConfig) -> Self {
        init_logging();
        let (connector, links) = MemoryConnector::new(mode);
        let session =
            SignalingSession::new(connector, Arc::new(engine.clone()), config).expect("valid session config");
        let events = session.events();
        Self {
            session,
            events,
            links,
            engine,
        }
    }

    /// Connect and wait until the session reports the transport open
    pub async fn connect(&mut self) -> MemoryLink {
        self.session.connect("memory://signaling");
        let link = self.next_link().await;
        assert_eq!(self.next_event().await, SessionEvent::Connected);
        link
    }

    pub async fn next_link(&mut self) -> MemoryLink {
        timeout(WAIT, self.links.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    pub async fn next_event(&mut self) -> SessionEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("session event channel closed")
    }

    /// Skip events until one satisfies `matches`
    pub async fn expect_event(&mut self, matches: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }

    pub async fn wait_for_snapshot(&self, matches: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut watch = self.session.watch();
        let snapshot = timeout(WAIT, watch.wait_for(matches))
            .await
            .expect("timed out waiting for session state")
            .expect("session task stopped");
        snapshot.clone()
    }
}

pub fn config_message() -> Value {
    serde_json::json!({
        "type": "config",
        "peerConnectionOptions": {
            "iceServers": [{ "urls": ["stun:stun.l.google.com:19302"] }]
        }
    })
}

pub fn offer_message(sdp: &str) -> Value {
    serde_json::json!({ "type": "offer", "sdp": sdp })
}

pub fn candidate_message(candidate: &str) -> Value {
    serde_json::json!({
        "type": "iceCandidate",
        "candidate": { "candidate": candidate, "sdpMid": "0", "sdpMLineIndex": 0 }
    })
}
