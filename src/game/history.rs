//! Typed action-history log.
//!
//! Every submission and settlement appends one entry. The replay renderer
//! consumes the log directly, filtering on the visibility scope, so entries
//! carry enough structure to reconstruct the round without replaying logic.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Who is allowed to see a history entry when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Everyone in the room.
    Public,
    /// The wolf camp only (e.g. the shared kill target).
    Wolves,
    /// Only the acting player (e.g. a check result).
    ActorOnly,
    /// The moderator log only.
    Moderator,
}

/// One line in the action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub phase: u32,
    pub actor: Option<PlayerId>,
    pub action: String,
    pub target: Option<PlayerId>,
    pub scope: Scope,
    pub text: String,
}

impl HistoryEntry {
    /// Creates an entry for a player action.
    pub fn action(
        round: u32,
        phase: u32,
        actor: PlayerId,
        action: &str,
        target: Option<PlayerId>,
        scope: Scope,
        text: String,
    ) -> Self {
        HistoryEntry {
            round,
            phase,
            actor: Some(actor),
            action: action.to_string(),
            target,
            scope,
            text,
        }
    }

    /// Creates a moderator/system entry with no acting player.
    pub fn system(round: u32, phase: u32, action: &str, text: String) -> Self {
        HistoryEntry {
            round,
            phase,
            actor: None,
            action: action.to_string(),
            target: None,
            scope: Scope::Moderator,
            text,
        }
    }
}
