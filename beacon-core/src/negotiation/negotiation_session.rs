use crate::model::{IceCandidate, ParticipantId, SessionDescription};
use crate::negotiation::{
    MediaTransport, NegotiationError, NegotiationRole, NegotiationState,
    TransportConnectionState,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happened to a remote candidate handed to the negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Applied to the transport right away.
    Applied,
    /// Held until a remote description is installed.
    Buffered,
}

/// Offer/answer state machine for one local participant talking to one remote
/// participant over a single media transport.
///
/// Remote candidates that arrive before the remote description is installed
/// are queued and applied in arrival order straight after it is installed.
pub struct Negotiation<T: MediaTransport> {
    local: ParticipantId,
    remote: ParticipantId,
    role: Option<NegotiationRole>,
    state: NegotiationState,
    transport: Arc<T>,
    pending_candidates: VecDeque<IceCandidate>,
    applied_candidates: usize,
    has_local_description: bool,
    has_remote_description: bool,
    transport_connected: bool,
    started_at: Instant,
}

impl<T: MediaTransport> Negotiation<T> {
    pub fn new(local: ParticipantId, remote: ParticipantId, transport: Arc<T>) -> Self {
        Self {
            local,
            remote,
            role: None,
            state: NegotiationState::Idle,
            transport,
            pending_candidates: VecDeque::new(),
            applied_candidates: 0,
            has_local_description: false,
            has_remote_description: false,
            transport_connected: false,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> Option<NegotiationRole> {
        self.role
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    pub fn buffered_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn applied_candidates(&self) -> usize {
        self.applied_candidates
    }

    pub fn has_remote_description(&self) -> bool {
        self.has_remote_description
    }

    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.state != NegotiationState::Connected && self.age() > max_age
    }

    /// Produce a local offer (`Idle`/`Connected -> OfferCreated`).
    ///
    /// `local_stream` tracks are attached first so they are part of the offer.
    pub async fn create_offer(
        &mut self,
        local_stream: Option<&T::Stream>,
    ) -> Result<SessionDescription, NegotiationError> {
        self.ensure(self.state.accepts_new_offer(), "create-offer")?;

        if let Some(stream) = local_stream {
            self.attach_stream(stream).await?;
        }

        let offer = match self.transport.create_offer().await {
            Ok(offer) => offer,
            Err(e) => return Err(self.fail("create_offer", e)),
        };

        self.role = Some(NegotiationRole::Initiator);
        self.has_local_description = true;
        self.started_at = Instant::now();
        self.transition(NegotiationState::OfferCreated);
        Ok(offer)
    }

    /// Record that the last produced description was handed to the relay.
    pub fn mark_sent(&mut self) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::OfferCreated => self.transition(NegotiationState::OfferSent),
            NegotiationState::AnswerCreated => {
                self.transition(NegotiationState::AnswerSent);
                self.maybe_connected();
            }
            _ => return Err(self.violation("mark-sent")),
        }
        Ok(())
    }

    /// Take a remote offer and produce the answer.
    ///
    /// Allowed from `Idle`, and from `Connected` for renegotiation, which
    /// restarts the responder track at `OfferReceived`.
    pub async fn accept_offer(
        &mut self,
        offer: SessionDescription,
        local_stream: Option<&T::Stream>,
    ) -> Result<SessionDescription, NegotiationError> {
        self.ensure(self.state.accepts_new_offer(), "incoming-call")?;

        self.role = Some(NegotiationRole::Responder);
        self.started_at = Instant::now();
        self.transition(NegotiationState::OfferReceived);

        if let Some(stream) = local_stream {
            self.attach_stream(stream).await?;
        }

        let answer = match self.transport.create_answer(offer).await {
            Ok(answer) => answer,
            Err(e) => return Err(self.fail("create_answer", e)),
        };

        self.has_remote_description = true;
        self.has_local_description = true;
        self.transition(NegotiationState::AnswerCreated);
        self.flush_pending().await?;
        Ok(answer)
    }

    /// Apply the remote answer. Only valid in `OfferSent`; anywhere else the
    /// answer is ignored and the state is left untouched.
    pub async fn accept_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.ensure(self.state == NegotiationState::OfferSent, "call-accepted")?;

        if let Err(e) = self.transport.set_remote_answer(answer).await {
            return Err(self.fail("set_remote_answer", e));
        }

        self.has_remote_description = true;
        self.transition(NegotiationState::AnswerReceived);
        self.flush_pending().await?;
        self.maybe_connected();
        Ok(())
    }

    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition, NegotiationError> {
        self.ensure(!self.state.is_terminal(), "ice-candidate")?;

        if !self.has_remote_description {
            self.pending_candidates.push_back(candidate);
            debug!(
                "Buffered ICE candidate from {} ({} pending)",
                self.remote,
                self.pending_candidates.len()
            );
            return Ok(CandidateDisposition::Buffered);
        }

        self.apply_candidate(candidate).await?;
        Ok(CandidateDisposition::Applied)
    }

    /// Feed a connectivity change from the transport.
    pub fn on_transport_state(&mut self, state: TransportConnectionState) -> NegotiationState {
        if self.state.is_terminal() {
            return self.state;
        }

        match state {
            TransportConnectionState::Connected => {
                self.transport_connected = true;
                self.maybe_connected();
            }
            TransportConnectionState::Failed => {
                warn!("Transport to {} failed", self.remote);
                self.transition(NegotiationState::Failed);
                self.pending_candidates.clear();
            }
            TransportConnectionState::Closed => self.abandon(),
            TransportConnectionState::Disconnected => {
                self.transport_connected = false;
                debug!("Transport to {} disconnected", self.remote);
            }
            TransportConnectionState::New | TransportConnectionState::Connecting => {}
        }

        self.state
    }

    pub fn abandon(&mut self) {
        if self.state == NegotiationState::Abandoned {
            return;
        }
        self.pending_candidates.clear();
        self.transition(NegotiationState::Abandoned);
    }

    async fn attach_stream(&mut self, stream: &T::Stream) -> Result<(), NegotiationError> {
        if let Err(e) = self.transport.add_local_tracks(stream).await {
            return Err(self.fail("add_local_tracks", e));
        }
        Ok(())
    }

    async fn flush_pending(&mut self) -> Result<(), NegotiationError> {
        if !self.pending_candidates.is_empty() {
            debug!(
                "Applying {} buffered ICE candidates from {}",
                self.pending_candidates.len(),
                self.remote
            );
        }
        while let Some(candidate) = self.pending_candidates.pop_front() {
            self.apply_candidate(candidate).await?;
        }
        Ok(())
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            return Err(self.fail("add_ice_candidate", e));
        }
        self.applied_candidates += 1;
        Ok(())
    }

    /// Both descriptions are installed once the exchange reached
    /// `AnswerReceived` or `AnswerSent`; the transport has the final say.
    fn maybe_connected(&mut self) {
        let exchanged = matches!(
            self.state,
            NegotiationState::AnswerReceived | NegotiationState::AnswerSent
        );
        let ready = exchanged && self.has_local_description && self.has_remote_description;
        if ready && self.transport_connected {
            info!("Negotiation {} <-> {} connected", self.local, self.remote);
            self.transition(NegotiationState::Connected);
        }
    }

    fn ensure(&self, allowed: bool, event: &'static str) -> Result<(), NegotiationError> {
        if allowed {
            Ok(())
        } else {
            Err(self.violation(event))
        }
    }

    fn violation(&self, event: &'static str) -> NegotiationError {
        warn!(
            "Ignoring {} from {} in state {}",
            event, self.remote, self.state
        );
        NegotiationError::ProtocolViolation {
            state: self.state,
            event,
        }
    }

    fn fail(&mut self, operation: &'static str, source: anyhow::Error) -> NegotiationError {
        warn!(
            "Media transport rejected {} for {}: {:#}",
            operation, self.remote, source
        );
        self.pending_candidates.clear();
        self.transition(NegotiationState::Failed);
        NegotiationError::TransportRejected { operation, source }
    }

    fn transition(&mut self, next: NegotiationState) {
        debug!(
            "Negotiation {} -> {}: {} => {}",
            self.local, self.remote, self.state, next
        );
        self.state = next;
    }
}
