use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::router::{Delivery, SignalingRouter};
use crate::session::NegotiationLedger;
use crate::{ServerConfig, SignalingError};
use beacon_core::{ClientSignal, IceServerConfig, ParticipantId, ServerSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct CoordinatorInner {
    registry: Arc<ConnectionRegistry>,
    router: SignalingRouter,
    ledger: NegotiationLedger,
    config: ServerConfig,
}

/// Binds relay channel lifecycle to the registry, router and ledger.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SessionCoordinator {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            inner: Arc::new(CoordinatorInner {
                router: SignalingRouter::new(registry.clone()),
                registry,
                ledger: NegotiationLedger::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.config.ice_servers.clone()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn ledger(&self) -> &NegotiationLedger {
        &self.inner.ledger
    }

    /// A new relay channel. Nothing is registered until it sends `join-room`.
    pub fn open(&self, outbound: mpsc::UnboundedSender<ServerSignal>) -> ConnectionHandle {
        let handle = ConnectionHandle::new(outbound);
        debug!("Relay channel opened: {}", handle.id());
        handle
    }

    /// Route one inbound frame. Errors are logged here and handed back so
    /// callers and tests can inspect them; the channel stays open either way.
    pub fn handle_signal(
        &self,
        from: &ConnectionHandle,
        signal: ClientSignal,
    ) -> Result<Delivery, SignalingError> {
        let kind = signal.kind();
        let result = self.dispatch(from, signal);
        if let Err(e) = &result {
            warn!("Dropped {} from connection {}: {}", kind, from.id(), e);
        }
        result
    }

    fn dispatch(
        &self,
        from: &ConnectionHandle,
        signal: ClientSignal,
    ) -> Result<Delivery, SignalingError> {
        let inner = &self.inner;
        match signal {
            ClientSignal::JoinRoom { room_id, user_id } => {
                inner.router.join(from, room_id, user_id)
            }
            ClientSignal::CallUser { offer, user_id } => {
                let route = inner.router.resolve_call(from, &user_id, "call-user")?;
                let entry = inner.ledger.offer_routed(
                    route.sender.clone(),
                    from.id(),
                    route.target.clone(),
                    route.target_connection(),
                );
                inner.router.call_offer(&route, offer).inspect_err(|_| {
                    inner.ledger.withdraw_offer(&entry);
                })
            }
            ClientSignal::CallAccepted { answer, from: initiator } => {
                let answerer = inner.router.sender_identity(from, "call-accepted")?;
                let entry = inner.ledger.expect_answer(&answerer, from.id(), &initiator)?;
                let delivery = inner.router.call_answer(
                    from,
                    &initiator,
                    entry.initiator_connection,
                    answer,
                )?;
                if !inner.ledger.answer_routed(&entry) {
                    debug!(
                        "Negotiation {} -> {} changed while its answer was in flight",
                        initiator, answerer
                    );
                }
                Ok(delivery)
            }
            ClientSignal::IceCandidate { candidate } => {
                let peer = inner
                    .registry
                    .lookup_identity(from.id())
                    .and_then(|me| inner.ledger.peer_of(&me, from.id()));
                Ok(inner.router.ice_candidate(from, candidate, peer.as_ref()))
            }
        }
    }

    /// The channel is gone: unregister it and abandon its negotiations.
    pub fn close(&self, handle: &ConnectionHandle) -> Option<ParticipantId> {
        let identity = self.inner.registry.unregister(handle.id());
        let abandoned = self.inner.ledger.abandon_connection(handle.id());

        for entry in &abandoned {
            debug!(
                "Abandoned negotiation {} -> {} ({:?})",
                entry.initiator, entry.target, entry.phase
            );
        }
        match &identity {
            Some(identity) => info!(
                "Participant {} left (connection {}, {} negotiations abandoned)",
                identity,
                handle.id(),
                abandoned.len()
            ),
            None => debug!("Relay channel {} closed before joining", handle.id()),
        }
        identity
    }

    /// Start the stale-offer sweeper when a negotiation timeout is set.
    pub fn spawn_negotiation_sweeper(&self) -> Option<JoinHandle<()>> {
        let timeout = self.inner.config.negotiation_timeout?;
        let coordinator = self.clone();
        let period = (timeout / 2).max(Duration::from_millis(10));

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                coordinator.sweep_stale_negotiations(timeout);
            }
        }))
    }

    /// Drop offers that have gone unanswered for longer than `max_age`.
    pub fn sweep_stale_negotiations(&self, max_age: Duration) -> usize {
        let expired = self.inner.ledger.expire(max_age);
        for entry in &expired {
            info!(
                "Negotiation {} -> {} timed out after {:?}",
                entry.initiator,
                entry.target,
                entry.opened_at.elapsed()
            );
        }
        expired.len()
    }
}
