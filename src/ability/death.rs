//! Death-triggered abilities.
//!
//! A dying hunter or wolf king produces a deferred kill with the target
//! left pending; the moderator completes it later with the chosen seat.
//! Poison suppresses these triggers entirely.

use crate::effect::{priority, DeathReason, SkillEffect, Target, Timing};
use crate::game::{Game, PlayerId};
use crate::role::{Role, RoleRegistry};

/// Produces the deferred effect for a death, if the role has one and the
/// death reason permits it. Marks the one-shot resource used so the trigger
/// cannot fire twice.
pub fn on_death(
    game: &mut Game,
    registry: &RoleRegistry,
    id: PlayerId,
    reason: DeathReason,
) -> Option<SkillEffect> {
    let player = game.player(id)?;
    let role = player.role;
    if !registry.triggers_on_death(role) {
        return None;
    }

    match role {
        Role::Hunter => {
            if reason.suppresses_death_trigger() || player.ability.shot_used {
                return None;
            }
            game.player_mut(id)?.ability.shot_used = true;
            Some(deferred(id, DeathReason::HunterShot))
        }
        Role::BlackWolfKing => {
            if reason.suppresses_death_trigger() || player.ability.claw_used {
                return None;
            }
            game.player_mut(id)?.ability.claw_used = true;
            Some(deferred(id, DeathReason::Claw))
        }
        // The white wolf king claws only when he takes himself out.
        Role::WhiteWolfKing => {
            if reason != DeathReason::SelfDestruct || player.ability.claw_used {
                return None;
            }
            game.player_mut(id)?.ability.claw_used = true;
            Some(deferred(id, DeathReason::Claw))
        }
        _ => None,
    }
}

fn deferred(actor: PlayerId, reason: DeathReason) -> SkillEffect {
    SkillEffect::kill(priority::DEFERRED, Timing::OnDeath, actor, Target::Pending, reason)
}
