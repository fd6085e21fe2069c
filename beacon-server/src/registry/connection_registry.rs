use crate::registry::ConnectionHandle;
use beacon_core::{ConnectionId, ParticipantId, RoomId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Forward and reverse identity maps. Kept under one lock so the reverse map
/// stays the exact inverse of the live forward entries.
#[derive(Default)]
struct IdentityMaps {
    by_identity: HashMap<ParticipantId, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, (ParticipantId, ConnectionHandle)>,
}

/// Who is reachable, on which relay channel, and in which rooms.
#[derive(Default)]
pub struct ConnectionRegistry {
    identities: Mutex<IdentityMaps>,
    rooms: DashMap<RoomId, HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `identity` to `handle`, superseding any earlier handle for the same
    /// identity. The superseded handle is returned, not closed; it keeps its
    /// reverse entry until it unregisters itself.
    pub fn register(
        &self,
        identity: ParticipantId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let mut maps = self.identities();
        let id = handle.id();

        // The same channel re-joining under a new name releases the old name.
        if let Some((previous, _)) = maps
            .by_connection
            .insert(id, (identity.clone(), handle.clone()))
        {
            let still_ours = maps
                .by_identity
                .get(&previous)
                .is_some_and(|h| h.id() == id);
            if previous != identity && still_ours {
                maps.by_identity.remove(&previous);
            }
        }

        let superseded = maps
            .by_identity
            .insert(identity.clone(), handle)
            .filter(|old| old.id() != id);

        if let Some(old) = &superseded {
            info!(
                "Participant {} moved from connection {} to {}",
                identity,
                old.id(),
                id
            );
        }
        superseded
    }

    pub fn lookup_handle(&self, identity: &ParticipantId) -> Option<ConnectionHandle> {
        self.identities().by_identity.get(identity).cloned()
    }

    /// Identity the channel joined as. Still answers for a superseded channel,
    /// so its frames stay attributable until it closes.
    pub fn lookup_identity(&self, connection: ConnectionId) -> Option<ParticipantId> {
        self.identities()
            .by_connection
            .get(&connection)
            .map(|(identity, _)| identity.clone())
    }

    /// The registered channel `connection`, with the identity it joined as.
    /// Superseded channels still resolve here.
    pub fn lookup_connection(
        &self,
        connection: ConnectionId,
    ) -> Option<(ParticipantId, ConnectionHandle)> {
        self.identities().by_connection.get(&connection).cloned()
    }

    /// Drop the channel's reverse entry, its forward entry when that still
    /// points at this channel, and its room memberships.
    pub fn unregister(&self, connection: ConnectionId) -> Option<ParticipantId> {
        let identity = {
            let mut maps = self.identities();
            let identity = maps
                .by_connection
                .remove(&connection)
                .map(|(identity, _)| identity);
            if let Some(identity) = &identity {
                let current = maps
                    .by_identity
                    .get(identity)
                    .is_some_and(|h| h.id() == connection);
                if current {
                    maps.by_identity.remove(identity);
                } else {
                    debug!(
                        "Connection {} was superseded for {}; keeping newer mapping",
                        connection, identity
                    );
                }
            }
            identity
        };

        self.rooms.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });

        identity
    }

    /// Returns `false` when the channel already was a member.
    pub fn join_room(&self, room: RoomId, handle: &ConnectionHandle) -> bool {
        self.rooms
            .entry(room)
            .or_default()
            .insert(handle.id(), handle.clone())
            .is_none()
    }

    /// Members of `room` other than `exclude`.
    pub fn room_members(&self, room: &RoomId, exclude: ConnectionId) -> Vec<ConnectionHandle> {
        self.rooms
            .get(room)
            .map(|members| {
                members
                    .values()
                    .filter(|h| h.id() != exclude)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().contains_key(&connection))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of identities currently reachable.
    pub fn len(&self) -> usize {
        self.identities().by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn identities(&self) -> MutexGuard<'_, IdentityMaps> {
        self.identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
