//! Session event protocol between participants and the hub.
//!
//! Events are addressed to a session id by the transport; the hub itself only
//! sees the payloads. Tag names follow the external protocol table:
//! kebab-case event names, camelCase fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::language::Language;

/// Opaque identity of one connected participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Participant ids are normally hub-assigned; this admits transport-level
    /// identities (socket ids and the like).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix used for default display names. Transport-supplied ids
    /// may be non-ASCII, so the cut lands on a char boundary.
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(6)
            .map_or(self.0.as_str(), |(i, _)| &self.0[..i])
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// One connected participant as the hub tracks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub cursor: Option<CursorPosition>,
    #[serde(default)]
    pub selection: Option<Selection>,
    pub joined_at_ms: u64,
}

/// Full session state delivered to a newly joined participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub code: String,
    pub language: Language,
    /// Ordered by join time.
    pub participants: Vec<Participant>,
    pub your_id: ParticipantId,
    pub your_color: String,
}

/// Client-to-hub events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join {
        session_id: String,
        display_name_hint: Option<String>,
    },
    Leave {
        session_id: String,
    },
    CodeMutation {
        session_id: String,
        code: String,
    },
    LanguageMutation {
        session_id: String,
        language: Language,
    },
    CursorMutation {
        session_id: String,
        position: CursorPosition,
    },
    SelectionMutation {
        session_id: String,
        selection: Option<Selection>,
    },
}

/// Hub-to-client events. Mutation broadcasts carry the submitter's id and go
/// to every participant except the submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    SessionSnapshot(SessionSnapshot),
    ParticipantJoined(Participant),
    ParticipantLeft {
        participant_id: ParticipantId,
    },
    CodeMutation {
        code: String,
        participant_id: ParticipantId,
    },
    LanguageMutation {
        language: Language,
        participant_id: ParticipantId,
    },
    CursorMutation {
        participant_id: ParticipantId,
        position: CursorPosition,
    },
    SelectionMutation {
        participant_id: ParticipantId,
        selection: Option<Selection>,
    },
}
