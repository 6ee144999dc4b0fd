use std::{fmt, time::Instant};

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

const MAX_ID_LEN: usize = 128;

/// Opaque, caller-supplied identifier of one anonymous participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ChatError::InvalidInput("userId"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(ChatError::InvalidInput("userId too long"));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ChatError::InvalidInput("roomId"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(ChatError::InvalidInput("roomId too long"));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Optional room field from a client; blank counts as absent.
    pub fn parse_hint(raw: Option<&str>) -> Result<Option<Self>, ChatError> {
        raw.filter(|r| !r.trim().is_empty()).map(Self::parse).transpose()
    }

    pub(crate) fn new_unchecked(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub display_name: Option<String>,
    pub last_seen: Instant,
}

/// A message as the recipient sees it: always the partner's, so no sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivered {
    pub text: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Result of a `start` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    Waiting,
    /// A fresh room was just created with the partner.
    Matched {
        room_id: RoomId,
        partner_id: ParticipantId,
        partner_name: Option<String>,
    },
    /// The caller was already in a room; nothing changed.
    Resumed {
        room_id: RoomId,
        partner_id: ParticipantId,
        partner_name: Option<String>,
    },
}

/// Wire shape of the start endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StartOutcome {
    Waiting,
    Matched {
        room_id: RoomId,
        partner_id: ParticipantId,
        #[serde(skip_serializing_if = "Option::is_none")]
        partner_name: Option<String>,
    },
}

impl From<Pairing> for StartOutcome {
    fn from(pairing: Pairing) -> Self {
        match pairing {
            Pairing::Waiting => StartOutcome::Waiting,
            Pairing::Matched { room_id, partner_id, partner_name }
            | Pairing::Resumed { room_id, partner_id, partner_name } => StartOutcome::Matched {
                room_id,
                partner_id,
                partner_name,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Status {
    None,
    Waiting,
    Matched {
        room_id: RoomId,
        partner_id: ParticipantId,
        /// False once the partner has left but before this side has.
        partner_present: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poll {
    #[serde(flatten)]
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Delivered>>,
}

/// What a `leave` call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    Room { room_id: RoomId, destroyed: bool },
    Queue,
    /// Room hint named a room the caller is no longer in.
    Stale,
    Nothing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rooms: usize,
    pub waiting: usize,
}
