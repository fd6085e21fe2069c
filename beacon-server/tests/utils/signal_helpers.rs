use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;

use beacon_core::{ClientSignal, IceCandidate, ParticipantId, RoomId, ServerSignal, SessionDescription};

/// Timeout for a single expected signal (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// How long to wait before concluding nothing more will arrive (ms).
pub const QUIET_PERIOD_MS: u64 = 100;

pub const ROOM: &str = "r1";

pub fn join_room(user: &str) -> ClientSignal {
    ClientSignal::JoinRoom {
        room_id: RoomId::from(ROOM),
        user_id: ParticipantId::from(user),
    }
}

pub fn call_user(target: &str, sdp: &str) -> ClientSignal {
    ClientSignal::CallUser {
        offer: SessionDescription::offer(sdp),
        user_id: ParticipantId::from(target),
    }
}

pub fn call_accepted(initiator: &str, sdp: &str) -> ClientSignal {
    ClientSignal::CallAccepted {
        answer: SessionDescription::answer(sdp),
        from: ParticipantId::from(initiator),
    }
}

pub fn ice_candidate(candidate: &str) -> ClientSignal {
    ClientSignal::IceCandidate {
        candidate: IceCandidate::new(candidate),
    }
}

/// Wait for the next signal on an in-memory relay channel.
pub async fn next_signal(
    rx: &mut mpsc::UnboundedReceiver<ServerSignal>,
    timeout_ms: u64,
) -> Result<ServerSignal> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), rx.recv()).await {
        Ok(Some(signal)) => Ok(signal),
        Ok(None) => anyhow::bail!("Relay channel closed"),
        Err(_) => anyhow::bail!("Timeout waiting for signal"),
    }
}

/// Skip signals until one matches `predicate`.
pub async fn wait_for_signal(
    rx: &mut mpsc::UnboundedReceiver<ServerSignal>,
    predicate: impl Fn(&ServerSignal) -> bool,
    timeout_ms: u64,
) -> Result<ServerSignal> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(signal)) if predicate(&signal) => return Ok(signal),
            Ok(Some(other)) => {
                tracing::debug!("[SignalHelper] Skipping {}", other.kind());
            }
            Ok(None) => anyhow::bail!("Relay channel closed"),
            Err(_) => anyhow::bail!("Timeout waiting for matching signal"),
        }
    }
}
