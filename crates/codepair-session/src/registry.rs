//! Join-ordered participant registry with cursor color assignment.

use codepair_protocol::{CursorPosition, Participant, ParticipantId, Selection};
use indexmap::IndexMap;
use indexmap::map::Entry;

/// Cursor highlight colors, assigned round-robin so neighboring participants
/// never share a color while the session is at or below palette size.
pub const CURSOR_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9",
];

/// Set of connected participants, ordered by join time.
///
/// Participant ids are unique: re-admitting an id already present replaces
/// the entry in place instead of duplicating it.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: IndexMap<ParticipantId, Participant>,
    colors_assigned: usize,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next palette color.
    pub fn next_color(&mut self) -> &'static str {
        let color = CURSOR_PALETTE[self.colors_assigned % CURSOR_PALETTE.len()];
        self.colors_assigned += 1;
        color
    }

    /// Admit a participant. A duplicate id replaces in place: join order,
    /// color and join time of the original entry are kept, the display name
    /// is refreshed.
    pub fn admit(&mut self, participant: Participant) -> &Participant {
        match self.participants.entry(participant.id.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.name = participant.name;
                existing
            }
            Entry::Vacant(entry) => entry.insert(participant),
        }
    }

    /// Remove by id, preserving the join order of everyone else. Returns
    /// `None` (and changes nothing) when the id is unknown.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.shift_remove(id)
    }

    /// Update one participant's cursor. Returns `false` for unknown ids.
    pub fn set_cursor(&mut self, id: &ParticipantId, position: CursorPosition) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.cursor = Some(position);
                true
            }
            None => false,
        }
    }

    /// Update one participant's selection. Returns `false` for unknown ids.
    pub fn set_selection(&mut self, id: &ParticipantId, selection: Option<Selection>) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.selection = selection;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Snapshot of every participant, ordered by join time.
    pub fn participants(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
