//! Player state.
//!
//! A player is a seat in the room: stable id, role, camp, liveness, and a
//! role-specific ability-state bag. Everything transient to a single
//! settlement lives in the resolver's scratch state instead, so nothing here
//! leaks across rounds by accident.

use serde::{Deserialize, Serialize};

use crate::effect::DeathReason;
use crate::role::{Camp, Role};

/// Stable seat number, `1..=N`. Zero is never a valid id.
pub type PlayerId = u32;

/// Per-role ability bookkeeping that outlives a single settlement.
///
/// Only the fields for the player's own role are ever touched; the rest stay
/// at their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityState {
    /// Witch: antidote still available.
    pub antidote: bool,
    /// Witch: poison still available.
    pub poison: bool,
    /// Guard: previous round's protect target, if any.
    pub last_guarded: Option<PlayerId>,
    /// Dreamer: the memorized dream target from the previous round.
    pub dream_target: Option<PlayerId>,
    /// Knight: the one duel has been used.
    pub duel_used: bool,
    /// Hunter: the death-trigger shot has been queued.
    pub shot_used: bool,
    /// Black wolf king: the death-trigger claw has been queued.
    pub claw_used: bool,
    /// Wolf beauty: the currently charmed partner.
    pub charmed: Option<PlayerId>,
    /// Idiot: survived an exile by revealing; may no longer vote.
    pub revealed: bool,
}

impl Default for AbilityState {
    fn default() -> Self {
        AbilityState {
            antidote: true,
            poison: true,
            last_guarded: None,
            dream_target: None,
            duel_used: false,
            shot_used: false,
            claw_used: false,
            charmed: None,
            revealed: false,
        }
    }
}

/// One seat in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub role: Role,
    pub camp: Camp,
    pub alive: bool,
    /// Set by a nightmare's fear; persists until the next day settlement.
    pub feared: bool,
    pub out_reason: Option<DeathReason>,
    pub ability: AbilityState,
}

impl Player {
    /// Creates a living player in the given seat with the given role.
    pub fn new(id: PlayerId, role: Role) -> Self {
        Player {
            id,
            role,
            camp: role.camp(),
            alive: true,
            feared: false,
            out_reason: None,
            ability: AbilityState::default(),
        }
    }

    /// Marks the player dead with the recorded reason. Idempotent: the first
    /// reason wins.
    pub fn mark_dead(&mut self, reason: DeathReason) {
        if self.alive {
            self.alive = false;
            self.out_reason = Some(reason);
        }
    }

    /// True if this player may cast ballots: alive and not a revealed idiot.
    pub fn may_vote(&self) -> bool {
        self.alive && !(self.role == Role::Idiot && self.ability.revealed)
    }
}
