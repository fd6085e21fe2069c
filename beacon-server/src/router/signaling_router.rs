use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::router::{CallRoute, Delivery};
use crate::SignalingError;
use beacon_core::{
    ConnectionId, IceCandidate, ParticipantId, RoomId, ServerSignal, SessionDescription,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Forwards relay frames between participants. Holds no state of its own;
/// every decision comes from the registry.
#[derive(Clone)]
pub struct SignalingRouter {
    registry: Arc<ConnectionRegistry>,
}

impl SignalingRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Register the sender, acknowledge the room and announce the sender to
    /// everyone else already in it. Each announcement fails on its own.
    pub fn join(
        &self,
        from: &ConnectionHandle,
        room_id: RoomId,
        identity: ParticipantId,
    ) -> Result<Delivery, SignalingError> {
        info!(
            "Participant {} joined room {} on connection {}",
            identity,
            room_id,
            from.id()
        );

        self.registry.register(identity.clone(), from.clone());
        self.registry.join_room(room_id.clone(), from);

        from.send(ServerSignal::JoinedRoom {
            room_id: room_id.clone(),
        })?;

        let peers = self.registry.room_members(&room_id, from.id());
        Ok(self.fan_out(&peers, || ServerSignal::UserJoined {
            user_id: identity.clone(),
        }))
    }

    /// Resolve sender and target of a call frame without sending anything.
    pub fn resolve_call(
        &self,
        from: &ConnectionHandle,
        target: &ParticipantId,
        event: &str,
    ) -> Result<CallRoute, SignalingError> {
        let sender = self.sender_identity(from, event)?;
        let target_handle = self.resolve_target(&sender, target)?;

        Ok(CallRoute {
            sender,
            target: target.clone(),
            target_handle,
        })
    }

    /// Forward an offer along `route`, stamped with the sender's registered
    /// identity.
    pub fn call_offer(
        &self,
        route: &CallRoute,
        offer: SessionDescription,
    ) -> Result<Delivery, SignalingError> {
        route.target_handle.send(ServerSignal::IncomingCall {
            offer,
            from: route.sender.clone(),
        })?;
        debug!("Routed offer {} -> {}", route.sender, route.target);
        Ok(Delivery::single())
    }

    /// Forward an answer to the channel `initiator` offered from. A newer
    /// channel for the same identity never receives it.
    pub fn call_answer(
        &self,
        from: &ConnectionHandle,
        initiator: &ParticipantId,
        initiator_connection: ConnectionId,
        answer: SessionDescription,
    ) -> Result<Delivery, SignalingError> {
        let sender = self.sender_identity(from, "call-accepted")?;
        if &sender == initiator {
            return Err(SignalingError::violation(format!(
                "{} answered its own call",
                sender
            )));
        }
        let target_handle = self
            .registry
            .lookup_connection(initiator_connection)
            .filter(|(identity, _)| identity == initiator)
            .map(|(_, handle)| handle)
            .ok_or_else(|| SignalingError::UnknownTarget(initiator.clone()))?;

        target_handle.send(ServerSignal::CallAccepted { answer })?;
        debug!("Routed answer {} -> {}", sender, initiator);
        Ok(Delivery::single())
    }

    /// Forward a network candidate.
    ///
    /// With a reachable negotiation `peer` the candidate goes to that peer
    /// only. Otherwise it goes to every other member of every room the sender
    /// is in, once per member.
    pub fn ice_candidate(
        &self,
        from: &ConnectionHandle,
        candidate: IceCandidate,
        peer: Option<&ParticipantId>,
    ) -> Delivery {
        let direct = peer
            .and_then(|p| self.registry.lookup_handle(p))
            .filter(|h| h.id() != from.id());

        if let Some(peer_handle) = direct {
            return self.fan_out(&[peer_handle], || ServerSignal::IceCandidate {
                candidate: candidate.clone(),
            });
        }

        let mut seen = HashSet::new();
        let recipients: Vec<ConnectionHandle> = self
            .registry
            .rooms_of(from.id())
            .iter()
            .flat_map(|room| self.registry.room_members(room, from.id()))
            .filter(|h| seen.insert(h.id()))
            .collect();

        debug!(
            "Broadcasting ICE candidate from connection {} to {} room members",
            from.id(),
            recipients.len()
        );
        self.fan_out(&recipients, || ServerSignal::IceCandidate {
            candidate: candidate.clone(),
        })
    }

    /// Identity of the sending channel. Frames never name their own sender.
    pub fn sender_identity(
        &self,
        from: &ConnectionHandle,
        event: &str,
    ) -> Result<ParticipantId, SignalingError> {
        self.registry.lookup_identity(from.id()).ok_or_else(|| {
            SignalingError::violation(format!(
                "{} from connection {} before join-room",
                event,
                from.id()
            ))
        })
    }

    fn resolve_target(
        &self,
        sender: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<ConnectionHandle, SignalingError> {
        if sender == target {
            return Err(SignalingError::violation(format!(
                "{} addressed a call to itself",
                sender
            )));
        }
        self.registry
            .lookup_handle(target)
            .ok_or_else(|| SignalingError::UnknownTarget(target.clone()))
    }

    fn fan_out(
        &self,
        recipients: &[ConnectionHandle],
        signal: impl Fn() -> ServerSignal,
    ) -> Delivery {
        let mut delivery = Delivery::default();
        for recipient in recipients {
            match recipient.send(signal()) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    error!("Failed to relay to {}: {}", recipient.id(), e);
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }
}
