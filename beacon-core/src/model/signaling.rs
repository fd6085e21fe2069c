use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use crate::model::session_description::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

/// Public STUN servers used when nothing else is configured.
pub const DEFAULT_STUN_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:global.stun.twilio.com:3478",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            username: None,
            credential: None,
        }
    }

    pub fn default_stun() -> Self {
        Self::stun(DEFAULT_STUN_SERVERS)
    }
}

/// Frames a client sends over the relay channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientSignal {
    JoinRoom {
        room_id: RoomId,
        user_id: ParticipantId,
    },
    /// Offer for `user_id`. The sender is never taken from the frame.
    CallUser {
        offer: SessionDescription,
        user_id: ParticipantId,
    },
    /// Answer travelling back to `from`, the participant that offered.
    CallAccepted {
        answer: SessionDescription,
        from: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
}

impl ClientSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::CallUser { .. } => "call-user",
            Self::CallAccepted { .. } => "call-accepted",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }
}

/// Frames the server sends over the relay channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerSignal {
    JoinedRoom {
        room_id: RoomId,
    },
    UserJoined {
        user_id: ParticipantId,
    },
    IncomingCall {
        offer: SessionDescription,
        from: ParticipantId,
    },
    CallAccepted {
        answer: SessionDescription,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
}

impl ServerSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinedRoom { .. } => "joined-room",
            Self::UserJoined { .. } => "user-joined",
            Self::IncomingCall { .. } => "incoming-call",
            Self::CallAccepted { .. } => "call-accepted",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }
}
