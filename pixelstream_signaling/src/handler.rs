//! Inbound message handling
//!
//! Routes each decoded frame to its handler and applies the answerer-only
//! negotiation rules:
//!
//! - `config` creates the peer connection; nothing else may touch it before.
//! - an `offer` is applied remotely, answered, and the answer sent back.
//! - any other SDP kind is reported and left alone.
//! - candidates are applied once a peer connection exists.

use crate::error::SignalingError;
use crate::event::{AnswerOutcome, Input, PeerEvent, SessionEvent};
use crate::peer::{PeerEvents, answer_offer};
use crate::session::SessionTask;
use crate::state::NegotiationState;
use pixelstream_protocol::{ClientRequest, IceCandidate, IceServer, SdpKind, SessionDescription, SignalingMessage, decode};
use tracing::{Instrument, debug, error, info, warn};

impl SessionTask {
    /// Handle one text frame from the transport
    pub(crate) async fn on_frame(&mut self, text: &str) {
        match decode(text) {
            Ok(message) => {
                debug!(kind = message.kind(), "received signaling message");
                self.on_message(message).await;
            }
            Err(err) => {
                warn!(len = text.len(), "dropping signaling frame: {err}");
                self.emit(SessionEvent::Error(err.into()));
            }
        }
    }

    async fn on_message(&mut self, message: SignalingMessage) {
        if self.answer_in_flight && message.is_negotiation() {
            debug!(kind = message.kind(), "answer in flight, queueing message");
            self.deferred.push_back(message);
            return;
        }

        match message {
            SignalingMessage::Config { ice_servers } => self.on_config(ice_servers).await,
            SignalingMessage::SessionDescription(description) => self.on_remote_description(description),
            SignalingMessage::IceCandidate(candidate) => self.on_remote_candidate(candidate).await,
            SignalingMessage::PlayerCount { count } => {
                debug!(count, "player count");
                self.emit(SessionEvent::PlayerCount(count));
            }
            SignalingMessage::StreamerList { ids } => self.on_streamer_list(ids).await,
        }
    }

    async fn on_config(&mut self, ice_servers: Vec<IceServer>) {
        info!(ice_servers = ice_servers.len(), "received peer connection configuration");

        if let Some(previous) = self.peer.take() {
            info!("configuration received again, replacing peer connection");
            if let Err(err) = previous.close().await {
                debug!("error closing previous peer connection: {err}");
            }
            self.state.negotiation = NegotiationState::Idle;
            self.state.has_remote_description = false;
            self.state.has_local_description = false;
        }

        self.peer_generation += 1;
        let events = PeerEvents::new(self.epoch, self.peer_generation, self.inbox.clone());
        match self.factory.create_peer_connection(&ice_servers, events).await {
            Ok(peer) => {
                self.peer = Some(peer);
                self.state.negotiation = NegotiationState::AwaitingRemoteDescription;
                self.emit(SessionEvent::Config { ice_servers });
            }
            Err(err) => {
                error!("could not create peer connection: {err}");
                self.emit(SessionEvent::Error(err));
            }
        }
    }

    fn on_remote_description(&mut self, description: SessionDescription) {
        let Some(peer) = self.peer.clone() else {
            warn!(kind = %description.kind, "peer connection not set up yet, dropping remote description");
            self.emit(SessionEvent::Error(SignalingError::PeerConnectionNotReady));
            return;
        };

        info!(kind = %description.kind, "received remote description");
        self.emit(SessionEvent::RemoteDescription(description.clone()));

        if description.kind != SdpKind::Offer {
            warn!(kind = %description.kind, "only offers are answered, ignoring remote description");
            self.emit(SessionEvent::Error(SignalingError::NegotiationRoleViolation(
                description.kind,
            )));
            return;
        }

        if self.state.negotiation == NegotiationState::LocalDescriptionSet {
            info!("renegotiating on a new offer");
        }
        self.state.begin_answer();
        self.answer_in_flight = true;

        let epoch = self.epoch;
        let inbox = self.inbox.clone();
        tokio::spawn(
            async move {
                let outcome = answer_offer(peer.as_ref(), description).await;
                let _ = inbox.send(Input::AnswerReady { epoch, outcome });
            }
            .in_current_span(),
        );
    }

    /// Answer generation finished for the current epoch
    pub(crate) async fn on_answer_ready(&mut self, outcome: AnswerOutcome) {
        self.answer_in_flight = false;
        if outcome.remote_applied {
            self.state.has_remote_description = true;
        }

        match outcome.answer {
            Ok(answer) => {
                self.state.has_local_description = true;
                self.state.negotiation = NegotiationState::LocalDescriptionSet;
                info!("sending answer");
                match self.send(&SignalingMessage::SessionDescription(answer.clone())).await {
                    Ok(()) => self.emit(SessionEvent::LocalDescription(answer)),
                    Err(err) => {
                        warn!("could not send answer: {err}");
                        self.emit(SessionEvent::Error(err));
                    }
                }
            }
            Err(err) => {
                error!("answering offer failed: {err}");
                self.state.negotiation = NegotiationState::AwaitingRemoteDescription;
                self.emit(SessionEvent::Error(err));
            }
        }

        self.drain_deferred().await;
    }

    /// Replay held-back messages until one starts another answer
    async fn drain_deferred(&mut self) {
        while !self.answer_in_flight {
            let Some(message) = self.deferred.pop_front() else {
                break;
            };
            self.on_message(message).await;
        }
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        let Some(peer) = self.peer.clone() else {
            warn!("peer connection not set up yet, dropping remote candidate");
            self.emit(SessionEvent::Error(SignalingError::PeerConnectionNotReady));
            return;
        };

        match peer.add_remote_ice_candidate(candidate.clone()).await {
            Ok(()) => {
                self.state.remote_candidate_count += 1;
                debug!(count = self.state.remote_candidate_count, "applied remote candidate");
                self.emit(SessionEvent::RemoteCandidate(candidate));
            }
            Err(err) => {
                warn!("could not apply remote candidate: {err}");
                self.emit(SessionEvent::Error(err));
            }
        }
    }

    async fn on_streamer_list(&mut self, ids: Vec<String>) {
        debug!(streamers = ids.len(), "received streamer list");

        let choice = if self.config.auto_subscribe && self.state.subscribed_streamer.is_none() {
            self.config.choose_streamer(&ids).cloned()
        } else {
            None
        };
        self.emit(SessionEvent::StreamerList(ids));

        if let Some(streamer_id) = choice {
            let _ = self.request(ClientRequest::Subscribe { streamer_id }).await;
        }
    }

    pub(crate) async fn on_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                self.state.local_candidate_count += 1;
                debug!(count = self.state.local_candidate_count, "discovered local candidate");
                self.emit(SessionEvent::LocalCandidate(candidate.clone()));
                self.send_or_report(&SignalingMessage::IceCandidate(candidate)).await;
            }
            PeerEvent::ConnectionState(state) => {
                info!(?state, "peer connection state changed");
                self.emit(SessionEvent::PeerConnectionState(state));
            }
        }
    }
}

