//! The game aggregate.
//!
//! One [`Game`] per room, mutated exclusively by the ability dispatcher,
//! the effect resolution engine, the phase flow controller, and the voting
//! subsystem. Everything is synchronous and in-memory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::history::HistoryEntry;
use super::player::{Player, PlayerId};
use crate::role::Camp;
use crate::vote::{Election, ExileVote};

/// Lifecycle of the sheriff badge.
///
/// `Normal` covers both "no election held yet" (sheriff is `None`) and a
/// badge being worn. The pending states require the moderator assignment
/// operation to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeState {
    Normal,
    /// Sheriff died an ordinary death; any other living player may receive
    /// the badge.
    PendingTransfer,
    /// Sheriff self-destructed; assignment is fully at the moderator's
    /// discretion.
    PendingAssign,
    /// Torn up. The 1.5x vote weight is gone for the rest of the game.
    Destroyed,
}

/// Complete state of one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    players: Vec<Player>,
    pub round: u32,
    /// Current phase id within the supplied phase list.
    pub phase: u32,
    pub history: Vec<HistoryEntry>,
    pub sheriff: Option<PlayerId>,
    pub badge: BadgeState,
    /// The wolf camp's OR-combined kill target for the current night.
    pub wolf_target: Option<PlayerId>,
    /// The wolf who last wrote the shared kill vote; the settled kill is
    /// attributed to this seat.
    pub wolf_voter: Option<PlayerId>,
    /// Set when a day skill ends the day; the exile vote is skipped until
    /// the day settles.
    pub day_ended: bool,
    /// Players who already submitted their night action this round.
    pub night_acted: BTreeSet<PlayerId>,
    pub exile: ExileVote,
    pub election: Election,
    pub winner: Option<Camp>,
    pub finished: bool,
    /// Large rooms disable the witch's antidote on night one; set from the
    /// room configuration.
    pub no_first_night_save: bool,
}

impl Game {
    /// Creates a game from an assigned seat list. Seats must be numbered
    /// `1..=N` in order; `config::assign` guarantees this.
    pub fn new(players: Vec<Player>) -> Self {
        debug_assert!(players.iter().enumerate().all(|(i, p)| p.id == i as u32 + 1));
        Game {
            players,
            round: 1,
            phase: 0,
            history: Vec::new(),
            sheriff: None,
            badge: BadgeState::Normal,
            wolf_target: None,
            wolf_voter: None,
            day_ended: false,
            night_acted: BTreeSet::new(),
            exile: ExileVote::new(),
            election: Election::new(),
            winner: None,
            finished: false,
            no_first_night_save: false,
        }
    }

    /// Returns the player in the given seat.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.checked_sub(1)? as usize)
    }

    /// Returns the player in the given seat, mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.checked_sub(1)? as usize)
    }

    /// All players in seat order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// True if the seat exists and its player is alive.
    pub fn living(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(|p| p.alive)
    }

    /// Living players in seat order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// Number of living players in the given camp.
    pub fn alive_in_camp(&self, camp: Camp) -> usize {
        self.alive_players().filter(|p| p.camp == camp).count()
    }

    /// True if the seat currently wears the badge.
    pub fn is_sheriff(&self, id: PlayerId) -> bool {
        self.sheriff == Some(id) && self.badge == BadgeState::Normal
    }

    /// Appends a history entry.
    pub fn log(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Clears per-night bookkeeping after a night settlement.
    pub fn clear_night(&mut self) {
        self.wolf_target = None;
        self.wolf_voter = None;
        self.night_acted.clear();
    }

    /// Clears fear marks. Called at the day settlement, so fear cast on
    /// night N incapacitates through day N and no longer.
    pub fn clear_fear(&mut self) {
        for p in &mut self.players {
            p.feared = false;
        }
    }
}
