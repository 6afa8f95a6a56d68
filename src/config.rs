//! Room configuration.
//!
//! The script/authoring tool hands this core a static role-count table; from
//! it we validate the room, deal roles onto seats (seeded RNG so setup is
//! replayable), and generate the ordered phase list the flow controller
//! walks each round.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{Game, Player};
use crate::role::{Camp, Role, RoleRegistry};

/// Errors in a supplied room configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("role table is empty")]
    NoPlayers,
    #[error("a room needs at least one wolf")]
    NoWolves,
    #[error("a room needs at least one good player")]
    NoGoods,
    #[error("role {0:?} appears twice in the table")]
    DuplicateRole(Role),
    #[error("role {0:?} is not in the registry")]
    UnknownRole(Role),
}

/// Within-round phase classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Lobby,
    /// A night phase in which the given role acts. Wolf-kill roles share
    /// the werewolf phase.
    Night(Role),
    /// Night settlement boundary.
    Settle,
    /// Sheriff election; round one only.
    Election,
    Discussion,
    /// Exile vote.
    Vote,
    /// Day settlement boundary.
    DaySettle,
}

impl PhaseKind {
    /// Returns the lowercase display name.
    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::Lobby => "lobby",
            PhaseKind::Night(_) => "night",
            PhaseKind::Settle => "settle",
            PhaseKind::Election => "election",
            PhaseKind::Discussion => "discussion",
            PhaseKind::Vote => "vote",
            PhaseKind::DaySettle => "day-settle",
        }
    }
}

/// One entry in the generated ordered phase list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub id: u32,
    pub kind: PhaseKind,
}

/// A static role-count table plus room-level rule knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub roles: Vec<(Role, u8)>,
    /// Rooms at or above this size disable the witch's antidote on night
    /// one.
    pub no_first_night_save_at: usize,
}

impl RoomConfig {
    /// The classic twelve-seat board: four wolves against a full god camp.
    pub fn classic_12() -> Self {
        RoomConfig {
            roles: vec![
                (Role::Werewolf, 3),
                (Role::BlackWolfKing, 1),
                (Role::Seer, 1),
                (Role::Witch, 1),
                (Role::Hunter, 1),
                (Role::Guard, 1),
                (Role::Villager, 4),
            ],
            no_first_night_save_at: 12,
        }
    }

    /// A preset board for the given seat count, or `None` outside the
    /// supported 6 to 18 range. Twelve seats get the classic board; other
    /// sizes take a third of the room as plain wolves, up to four god
    /// roles, and villagers for the rest.
    pub fn sized(n: usize) -> Option<Self> {
        if n == 12 {
            return Some(Self::classic_12());
        }
        if !(6..=18).contains(&n) {
            return None;
        }
        let wolves = n / 3;
        let gods = (n - wolves).min(4);
        let villagers = n - wolves - gods;

        let mut roles = vec![(Role::Werewolf, wolves as u8)];
        for (i, god) in [Role::Seer, Role::Witch, Role::Hunter, Role::Guard]
            .into_iter()
            .enumerate()
        {
            if i < gods {
                roles.push((god, 1));
            }
        }
        if villagers > 0 {
            roles.push((Role::Villager, villagers as u8));
        }
        Some(RoomConfig { roles, no_first_night_save_at: 12 })
    }

    /// Total seats in the room.
    pub fn player_count(&self) -> usize {
        self.roles.iter().map(|&(_, n)| n as usize).sum()
    }

    /// Checks the table for structural errors against the registry.
    pub fn validate(&self, registry: &RoleRegistry) -> Result<(), ConfigError> {
        if self.player_count() == 0 {
            return Err(ConfigError::NoPlayers);
        }
        for (i, &(role, _)) in self.roles.iter().enumerate() {
            if registry.spec(role).is_none() {
                return Err(ConfigError::UnknownRole(role));
            }
            if self.roles[..i].iter().any(|&(r, _)| r == role) {
                return Err(ConfigError::DuplicateRole(role));
            }
        }
        let wolves: usize = self
            .roles
            .iter()
            .filter(|&&(r, _)| r.camp() == Camp::Wolf)
            .map(|&(_, n)| n as usize)
            .sum();
        if wolves == 0 {
            return Err(ConfigError::NoWolves);
        }
        if wolves == self.player_count() {
            return Err(ConfigError::NoGoods);
        }
        Ok(())
    }

    /// Deals the configured roles onto seats `1..=N` in shuffled order.
    pub fn assign(&self, rng: &mut impl Rng) -> Vec<Player> {
        let mut deck: Vec<Role> = Vec::with_capacity(self.player_count());
        for &(role, n) in &self.roles {
            for _ in 0..n {
                deck.push(role);
            }
        }
        deck.shuffle(rng);
        deck.into_iter()
            .enumerate()
            .map(|(i, role)| Player::new(i as u32 + 1, role))
            .collect()
    }

    /// Generates the round's ordered phase list: lobby, one night phase per
    /// acting role present in the room, then the settlement/day sequence.
    pub fn phases(&self, registry: &RoleRegistry) -> Vec<PhaseSpec> {
        let present: Vec<Role> = self.roles.iter().map(|&(r, _)| r).collect();
        let mut kinds = vec![PhaseKind::Lobby];
        for role in registry.night_roles() {
            let in_room = present.iter().any(|&r| {
                r == role || (role == Role::Werewolf && r.joins_wolf_kill())
            });
            if in_room {
                kinds.push(PhaseKind::Night(role));
            }
        }
        kinds.extend([
            PhaseKind::Settle,
            PhaseKind::Election,
            PhaseKind::Discussion,
            PhaseKind::Vote,
            PhaseKind::DaySettle,
        ]);
        kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| PhaseSpec { id: i as u32, kind })
            .collect()
    }

    /// Validates, deals seats, and builds the game aggregate. A seed makes
    /// the deal reproducible; omit it for a random room.
    pub fn build_game(
        &self,
        registry: &RoleRegistry,
        seed: Option<u64>,
    ) -> Result<Game, ConfigError> {
        self.validate(registry)?;
        let mut rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        let mut game = Game::new(self.assign(&mut rng));
        game.no_first_night_save = self.player_count() >= self.no_first_night_save_at;
        Ok(game)
    }
}
