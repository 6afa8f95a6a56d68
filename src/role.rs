//! Role definitions and the role registry.
//!
//! Each of the fifteen roles is one variant of a closed enum with a static
//! capability record describing when it acts (night, day, on death) and
//! whether its night action may be skipped. Dispatch elsewhere is table
//! driven via [`RoleRegistry`], which is constructed explicitly and passed
//! in rather than living in a global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A player's win-condition alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Camp {
    Wolf,
    Good,
}

impl Camp {
    /// Returns the lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            Camp::Wolf => "wolf",
            Camp::Good => "good",
        }
    }
}

/// The closed set of roles the engine knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Villager,
    Seer,
    Witch,
    Hunter,
    Guard,
    Knight,
    Dreamer,
    Idiot,
    Werewolf,
    BlackWolfKing,
    WhiteWolfKing,
    Nightmare,
    Gargoyle,
    WolfBeauty,
    Medusa,
}

/// All roles in declaration order.
pub const ALL_ROLES: [Role; 15] = [
    Role::Villager,
    Role::Seer,
    Role::Witch,
    Role::Hunter,
    Role::Guard,
    Role::Knight,
    Role::Dreamer,
    Role::Idiot,
    Role::Werewolf,
    Role::BlackWolfKing,
    Role::WhiteWolfKing,
    Role::Nightmare,
    Role::Gargoyle,
    Role::WolfBeauty,
    Role::Medusa,
];

impl Role {
    /// Returns the camp this role fights for.
    pub const fn camp(self) -> Camp {
        match self {
            Role::Villager
            | Role::Seer
            | Role::Witch
            | Role::Hunter
            | Role::Guard
            | Role::Knight
            | Role::Dreamer
            | Role::Idiot => Camp::Good,
            Role::Werewolf
            | Role::BlackWolfKing
            | Role::WhiteWolfKing
            | Role::Nightmare
            | Role::Gargoyle
            | Role::WolfBeauty
            | Role::Medusa => Camp::Wolf,
        }
    }

    /// Returns the lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            Role::Villager => "villager",
            Role::Seer => "seer",
            Role::Witch => "witch",
            Role::Hunter => "hunter",
            Role::Guard => "guard",
            Role::Knight => "knight",
            Role::Dreamer => "dreamer",
            Role::Idiot => "idiot",
            Role::Werewolf => "werewolf",
            Role::BlackWolfKing => "black wolf king",
            Role::WhiteWolfKing => "white wolf king",
            Role::Nightmare => "nightmare",
            Role::Gargoyle => "gargoyle",
            Role::WolfBeauty => "wolf beauty",
            Role::Medusa => "medusa",
        }
    }

    /// Parses a role from its display name.
    pub fn from_name(s: &str) -> Option<Role> {
        ALL_ROLES.iter().copied().find(|r| r.name() == s)
    }

    /// Returns true for roles that join the shared wolf kill at night.
    pub const fn joins_wolf_kill(self) -> bool {
        matches!(
            self,
            Role::Werewolf | Role::BlackWolfKing | Role::WhiteWolfKing
        )
    }
}

/// Static capability record for one role.
///
/// `night_order` positions the role's dedicated night phase when the phase
/// list is generated; lower acts earlier. Roles that share the wolf-kill
/// phase all map to the werewolf slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: Role,
    pub has_night_action: bool,
    pub has_day_action: bool,
    pub has_death_trigger: bool,
    pub can_skip: bool,
    pub night_order: u8,
}

const NO_NIGHT: u8 = u8::MAX;

/// Capability table for every role.
pub const ROLE_SPECS: [RoleSpec; 15] = [
    RoleSpec { role: Role::Villager, has_night_action: false, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: NO_NIGHT },
    RoleSpec { role: Role::Seer, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: false, night_order: 60 },
    RoleSpec { role: Role::Witch, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 70 },
    RoleSpec { role: Role::Hunter, has_night_action: false, has_day_action: false, has_death_trigger: true, can_skip: true, night_order: NO_NIGHT },
    RoleSpec { role: Role::Guard, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 40 },
    RoleSpec { role: Role::Knight, has_night_action: false, has_day_action: true, has_death_trigger: false, can_skip: true, night_order: NO_NIGHT },
    RoleSpec { role: Role::Dreamer, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 45 },
    RoleSpec { role: Role::Idiot, has_night_action: false, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: NO_NIGHT },
    RoleSpec { role: Role::Werewolf, has_night_action: true, has_day_action: true, has_death_trigger: false, can_skip: true, night_order: 50 },
    RoleSpec { role: Role::BlackWolfKing, has_night_action: true, has_day_action: true, has_death_trigger: true, can_skip: true, night_order: 50 },
    RoleSpec { role: Role::WhiteWolfKing, has_night_action: true, has_day_action: true, has_death_trigger: true, can_skip: true, night_order: 50 },
    RoleSpec { role: Role::Nightmare, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 20 },
    RoleSpec { role: Role::Gargoyle, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 30 },
    RoleSpec { role: Role::WolfBeauty, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 65 },
    RoleSpec { role: Role::Medusa, has_night_action: true, has_day_action: false, has_death_trigger: false, can_skip: true, night_order: 10 },
];

/// Lookup of role capability records, keyed by role.
///
/// Built explicitly at room setup and threaded through the dispatcher and
/// flow controller, so tests can construct trimmed or custom registries.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    specs: HashMap<Role, RoleSpec>,
}

impl RoleRegistry {
    /// Builds a registry from an explicit list of capability records.
    pub fn new(specs: &[RoleSpec]) -> Self {
        RoleRegistry {
            specs: specs.iter().map(|s| (s.role, *s)).collect(),
        }
    }

    /// Builds the standard fifteen-role registry.
    pub fn standard() -> Self {
        Self::new(&ROLE_SPECS)
    }

    /// Returns the capability record for a role, if registered.
    pub fn spec(&self, role: Role) -> Option<&RoleSpec> {
        self.specs.get(&role)
    }

    /// Returns true if the role is registered with a night action.
    pub fn acts_at_night(&self, role: Role) -> bool {
        self.spec(role).is_some_and(|s| s.has_night_action)
    }

    /// Returns true if the role is registered with a day action.
    pub fn acts_by_day(&self, role: Role) -> bool {
        self.spec(role).is_some_and(|s| s.has_day_action)
    }

    /// Returns true if the role is registered with a death trigger.
    pub fn triggers_on_death(&self, role: Role) -> bool {
        self.spec(role).is_some_and(|s| s.has_death_trigger)
    }

    /// Night-acting roles in their phase order, wolf-kill roles collapsed
    /// into the single werewolf slot.
    pub fn night_roles(&self) -> Vec<Role> {
        let mut roles: Vec<&RoleSpec> = self
            .specs
            .values()
            .filter(|s| s.has_night_action && !(s.role.joins_wolf_kill() && s.role != Role::Werewolf))
            .collect();
        roles.sort_by_key(|s| (s.night_order, s.role.name()));
        roles.iter().map(|s| s.role).collect()
    }
}
