use crate::call::SignalSink;
use crate::transport::TransportEvent;
use anyhow::Result;
use beacon_core::{
    ClientSignal, IceCandidate, MediaTransport, Negotiation, NegotiationError, NegotiationState,
    ParticipantId, RoomId, ServerSignal, SessionDescription,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Candidates kept while no negotiation exists; the oldest go first.
pub const MAX_HELD_CANDIDATES: usize = 32;

/// One participant's side of the call: reacts to relay frames and transport
/// events by driving a [`Negotiation`] over a single media transport.
///
/// Only one negotiation is live at a time. An offer from, or to, a different
/// participant replaces it.
pub struct CallClient<T: MediaTransport, S: SignalSink> {
    local: ParticipantId,
    room: RoomId,
    transport: Arc<T>,
    sink: S,
    local_stream: Option<T::Stream>,
    negotiation: Option<Negotiation<T>>,
    /// Remote candidates that arrived before any negotiation existed.
    held_candidates: VecDeque<IceCandidate>,
}

impl<T: MediaTransport, S: SignalSink> CallClient<T, S> {
    pub fn new(local: ParticipantId, room: RoomId, transport: Arc<T>, sink: S) -> Self {
        Self {
            local,
            room,
            transport,
            sink,
            local_stream: None,
            negotiation: None,
            held_candidates: VecDeque::new(),
        }
    }

    /// Tracks attached to every offer and answer from now on.
    pub fn with_local_stream(mut self, stream: T::Stream) -> Self {
        self.local_stream = Some(stream);
        self
    }

    pub fn local(&self) -> &ParticipantId {
        &self.local
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn negotiation(&self) -> Option<&Negotiation<T>> {
        self.negotiation.as_ref()
    }

    pub fn state(&self) -> Option<NegotiationState> {
        self.negotiation.as_ref().map(Negotiation::state)
    }

    pub fn held_candidates(&self) -> usize {
        self.held_candidates.len()
    }

    pub async fn join(&self) -> Result<()> {
        info!("Joining room {} as {}", self.room, self.local);
        self.sink
            .send_signal(ClientSignal::JoinRoom {
                room_id: self.room.clone(),
                user_id: self.local.clone(),
            })
            .await
    }

    /// Offer a call to `target`.
    pub async fn call(&mut self, target: ParticipantId) -> Result<()> {
        self.prepare_negotiation(&target, HeldCandidates::Discard).await?;
        let Some(negotiation) = self.negotiation.as_mut() else {
            return Ok(());
        };

        let Some(offer) = settle(negotiation.create_offer(self.local_stream.as_ref()).await)?
        else {
            return Ok(());
        };

        info!("Calling {}", target);
        self.sink
            .send_signal(ClientSignal::CallUser {
                offer,
                user_id: target,
            })
            .await?;
        settle(negotiation.mark_sent())?;
        Ok(())
    }

    /// React to one relay frame. Frames that do not fit the negotiation's
    /// state are logged and ignored; a transport failure is returned.
    pub async fn handle_server_signal(&mut self, signal: ServerSignal) -> Result<()> {
        match signal {
            ServerSignal::JoinedRoom { room_id } => info!("{} joined room {}", self.local, room_id),
            ServerSignal::UserJoined { user_id } => {
                if user_id == self.local {
                    return Ok(());
                }
                if let Some(current) = self.live_negotiation() {
                    info!(
                        "{} joined while in a call with {}; not calling",
                        user_id,
                        current.remote()
                    );
                    return Ok(());
                }
                self.call(user_id).await?;
            }
            ServerSignal::IncomingCall { offer, from } => self.answer(from, offer).await?,
            ServerSignal::CallAccepted { answer } => match self.negotiation.as_mut() {
                Some(negotiation) => {
                    settle(negotiation.accept_answer(answer).await)?;
                }
                None => warn!("call-accepted with no call in progress"),
            },
            ServerSignal::IceCandidate { candidate } => self.add_remote_candidate(candidate).await?,
        }
        Ok(())
    }

    /// React to one transport event. A remote track is handed back to the
    /// caller.
    pub async fn handle_transport_event<R>(&mut self, event: TransportEvent<R>) -> Result<Option<R>> {
        match event {
            TransportEvent::LocalCandidate(candidate) => {
                self.sink
                    .send_signal(ClientSignal::IceCandidate { candidate })
                    .await?;
            }
            TransportEvent::RemoteTrack(track) => {
                info!("Remote track received");
                return Ok(Some(track));
            }
            TransportEvent::StateChanged(state) => match self.negotiation.as_mut() {
                Some(negotiation) => {
                    negotiation.on_transport_state(state);
                }
                None => debug!("Transport state {:?} with no negotiation", state),
            },
        }
        Ok(None)
    }

    /// Abandon the negotiation if it has not connected within `max_age`, so
    /// the next offer starts over. Returns whether it did.
    pub fn expire_stale(&mut self, max_age: Duration) -> bool {
        match self.negotiation.as_mut() {
            Some(negotiation) if !negotiation.state().is_terminal() && negotiation.is_expired(max_age) => {
                warn!(
                    "Negotiation with {} stuck in {} for {:?}; abandoning",
                    negotiation.remote(),
                    negotiation.state(),
                    negotiation.age()
                );
                negotiation.abandon();
                true
            }
            _ => false,
        }
    }

    /// Process relay frames and transport events until the relay closes.
    /// Remote tracks go to `tracks`.
    pub async fn run<R>(
        mut self,
        mut signals: mpsc::UnboundedReceiver<ServerSignal>,
        mut events: mpsc::Receiver<TransportEvent<R>>,
        tracks: mpsc::UnboundedSender<R>,
    ) {
        loop {
            tokio::select! {
                signal = signals.recv() => {
                    let Some(signal) = signal else { break };
                    let kind = signal.kind();
                    if let Err(e) = self.handle_server_signal(signal).await {
                        error!("Failed to handle {}: {:?}", kind, e);
                    }
                }
                Some(event) = events.recv() => {
                    match self.handle_transport_event(event).await {
                        Ok(Some(track)) => {
                            let _ = tracks.send(track);
                        }
                        Ok(None) => {}
                        Err(e) => error!("Failed to handle transport event: {:?}", e),
                    }
                }
            }
        }
        info!("Relay closed for {}", self.local);
    }

    async fn answer(&mut self, from: ParticipantId, offer: SessionDescription) -> Result<()> {
        self.prepare_negotiation(&from, HeldCandidates::Replay).await?;
        let Some(negotiation) = self.negotiation.as_mut() else {
            return Ok(());
        };

        let Some(answer) =
            settle(negotiation.accept_offer(offer, self.local_stream.as_ref()).await)?
        else {
            return Ok(());
        };

        info!("Answering {}", from);
        self.sink
            .send_signal(ClientSignal::CallAccepted { answer, from })
            .await?;
        settle(negotiation.mark_sent())?;
        Ok(())
    }

    async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        match self.negotiation.as_mut() {
            Some(negotiation) if negotiation.state().is_terminal() => {
                debug!(
                    "Dropping ICE candidate for ended negotiation with {}",
                    negotiation.remote()
                );
            }
            Some(negotiation) => {
                settle(negotiation.add_remote_candidate(candidate).await)?;
            }
            None => {
                if self.held_candidates.len() == MAX_HELD_CANDIDATES {
                    self.held_candidates.pop_front();
                }
                self.held_candidates.push_back(candidate);
                debug!(
                    "Holding ICE candidate until a call starts ({} held)",
                    self.held_candidates.len()
                );
            }
        }
        Ok(())
    }

    fn live_negotiation(&self) -> Option<&Negotiation<T>> {
        self.negotiation
            .as_ref()
            .filter(|n| !n.state().is_terminal())
    }

    /// Make sure a live negotiation with `remote` exists, starting a fresh
    /// one if needed. Held candidates are replayed into a fresh negotiation
    /// or thrown away, never kept for a later one.
    async fn prepare_negotiation(
        &mut self,
        remote: &ParticipantId,
        held: HeldCandidates,
    ) -> Result<()> {
        if self.live_negotiation().is_some_and(|n| n.remote() == remote) {
            return Ok(());
        }

        if let Some(mut previous) = self.negotiation.take() {
            if !previous.state().is_terminal() {
                info!("Dropping negotiation with {} for {}", previous.remote(), remote);
                previous.abandon();
            }
        }

        let mut negotiation =
            Negotiation::new(self.local.clone(), remote.clone(), Arc::clone(&self.transport));
        let candidates = std::mem::take(&mut self.held_candidates);
        match held {
            HeldCandidates::Replay => {
                for candidate in candidates {
                    settle(negotiation.add_remote_candidate(candidate).await)?;
                }
            }
            HeldCandidates::Discard if !candidates.is_empty() => {
                debug!(
                    "Discarding {} held candidates before calling {}",
                    candidates.len(),
                    remote
                );
            }
            HeldCandidates::Discard => {}
        }
        self.negotiation = Some(negotiation);
        Ok(())
    }
}

/// Our own offer cannot have drawn candidates yet, so anything held came
/// from someone else's session.
#[derive(Debug, Clone, Copy)]
enum HeldCandidates {
    Replay,
    Discard,
}

/// Violations are logged and swallowed; transport failures propagate.
fn settle<X>(result: Result<X, NegotiationError>) -> Result<Option<X>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            Err(e.into())
        }
        Err(e) => {
            warn!("Ignoring frame: {}", e);
            Ok(None)
        }
    }
}
