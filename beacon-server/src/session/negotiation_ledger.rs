use crate::SignalingError;
use beacon_core::{ConnectionId, ParticipantId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    /// The offer reached the target; no answer yet.
    OfferRouted,
    /// The answer reached the initiator. Candidates now flow peer to peer.
    AnswerRouted,
    /// One side went away or the offer timed out. Never used for routing.
    Abandoned,
}

/// The server's record of one negotiation between two participants.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub initiator: ParticipantId,
    pub initiator_connection: ConnectionId,
    pub target: ParticipantId,
    pub target_connection: ConnectionId,
    pub phase: LedgerPhase,
    pub opened_at: Instant,
    serial: u64,
}

impl LedgerEntry {
    fn involves_connection(&self, connection: ConnectionId) -> bool {
        self.initiator_connection == connection || self.target_connection == connection
    }

    fn same_negotiation(&self, other: &LedgerEntry) -> bool {
        self.serial == other.serial
    }

    /// The other party, if `who` on `connection` is one side of this entry.
    fn peer_of(&self, who: &ParticipantId, connection: ConnectionId) -> Option<&ParticipantId> {
        if &self.initiator == who && self.initiator_connection == connection {
            Some(&self.target)
        } else if &self.target == who && self.target_connection == connection {
            Some(&self.initiator)
        } else {
            None
        }
    }
}

/// Unordered pair, so an offer in either direction supersedes the last one.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PairKey(ParticipantId, ParticipantId);

impl PairKey {
    fn new(a: &ParticipantId, b: &ParticipantId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }
}

/// Per-pair negotiation records, one shard lock per access.
#[derive(Default)]
pub struct NegotiationLedger {
    entries: DashMap<PairKey, LedgerEntry>,
    next_serial: AtomicU64,
}

impl NegotiationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh entry for the pair, before the offer goes out, so an
    /// answer can never race ahead of it. Returns the entry it replaced.
    pub fn offer_routed(
        &self,
        initiator: ParticipantId,
        initiator_connection: ConnectionId,
        target: ParticipantId,
        target_connection: ConnectionId,
    ) -> LedgerEntry {
        let key = PairKey::new(&initiator, &target);
        let entry = LedgerEntry {
            initiator,
            initiator_connection,
            target,
            target_connection,
            phase: LedgerPhase::OfferRouted,
            opened_at: Instant::now(),
            serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
        };
        if let Some(previous) = self.entries.insert(key, entry.clone()) {
            debug!(
                "Offer supersedes negotiation {} -> {} ({:?})",
                previous.initiator, previous.target, previous.phase
            );
        }
        entry
    }

    /// Take back an offer that could not be delivered. An entry that has
    /// since been replaced or answered is left alone.
    pub fn withdraw_offer(&self, offer: &LedgerEntry) -> bool {
        let key = PairKey::new(&offer.initiator, &offer.target);
        self.entries
            .remove_if(&key, |_, entry| {
                entry.phase == LedgerPhase::OfferRouted && entry.same_negotiation(offer)
            })
            .is_some()
    }

    /// Check that `answerer` owes `initiator` an answer. Anything else is a
    /// protocol violation. Nothing is recorded until `answer_routed`.
    pub fn expect_answer(
        &self,
        answerer: &ParticipantId,
        answerer_connection: ConnectionId,
        initiator: &ParticipantId,
    ) -> Result<LedgerEntry, SignalingError> {
        let key = PairKey::new(answerer, initiator);
        let Some(entry) = self.entries.get(&key) else {
            return Err(SignalingError::violation(format!(
                "answer from {} to {} without a routed offer",
                answerer, initiator
            )));
        };

        let expected = &entry.initiator == initiator
            && &entry.target == answerer
            && entry.target_connection == answerer_connection
            && entry.phase == LedgerPhase::OfferRouted;
        if !expected {
            return Err(SignalingError::violation(format!(
                "answer from {} to {} in phase {:?}",
                answerer, initiator, entry.phase
            )));
        }
        Ok(entry.clone())
    }

    /// Record that the answer for `offer` was delivered. Returns `false` when
    /// the entry was replaced or removed in the meantime.
    pub fn answer_routed(&self, offer: &LedgerEntry) -> bool {
        let key = PairKey::new(&offer.initiator, &offer.target);
        match self.entries.get_mut(&key) {
            Some(mut entry)
                if entry.phase == LedgerPhase::OfferRouted && entry.same_negotiation(offer) =>
            {
                entry.phase = LedgerPhase::AnswerRouted;
                true
            }
            _ => false,
        }
    }

    /// Most recent negotiation peer of `who` on `connection`.
    pub fn peer_of(&self, who: &ParticipantId, connection: ConnectionId) -> Option<ParticipantId> {
        self.entries
            .iter()
            .filter(|entry| entry.phase != LedgerPhase::Abandoned)
            .filter_map(|entry| {
                entry
                    .peer_of(who, connection)
                    .map(|peer| (entry.opened_at, peer.clone()))
            })
            .max_by_key(|(opened_at, _)| *opened_at)
            .map(|(_, peer)| peer)
    }

    /// Remove every entry that runs over `connection`; they come back marked
    /// `Abandoned`.
    pub fn abandon_connection(&self, connection: ConnectionId) -> Vec<LedgerEntry> {
        self.remove_where(|entry| entry.involves_connection(connection))
    }

    /// Remove offers that have waited longer than `max_age` for an answer.
    pub fn expire(&self, max_age: Duration) -> Vec<LedgerEntry> {
        self.remove_where(|entry| {
            entry.phase == LedgerPhase::OfferRouted && entry.opened_at.elapsed() > max_age
        })
    }

    pub fn get(&self, a: &ParticipantId, b: &ParticipantId) -> Option<LedgerEntry> {
        self.entries.get(&PairKey::new(a, b)).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_where(&self, predicate: impl Fn(&LedgerEntry) -> bool) -> Vec<LedgerEntry> {
        let keys: Vec<PairKey> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| self.entries.remove_if(&key, |_, entry| predicate(entry)))
            .map(|(_, mut entry)| {
                entry.phase = LedgerPhase::Abandoned;
                entry
            })
            .collect()
    }
}
