//! Night action handlers, one arm per acting role.
//!
//! Validation happens here: a failed submission returns a message and leaves
//! the game untouched, so the transport layer can show it to the player and
//! let them retry within the phase.

use super::{Action, ActionKind, ActionOutcome};
use crate::effect::{priority, SkillEffect};
use crate::game::{Game, PlayerId};
use crate::role::{Camp, Role, RoleRegistry};

/// Dispatches one night submission for the phase's acting role.
///
/// On success the actor is recorded in the round's acted set; wolves may
/// revise their shared kill vote, everyone else gets one submission per
/// round.
pub fn handle_night_action(
    game: &mut Game,
    registry: &RoleRegistry,
    action: &Action,
) -> ActionOutcome {
    let Some(actor) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    let role = actor.role;

    let Some(spec) = registry.spec(role) else {
        return ActionOutcome::fail("role not registered");
    };
    if !spec.has_night_action {
        return ActionOutcome::fail("this role has no night action");
    }

    // Wolves OR-combine their kill vote, so revisions are allowed.
    let revisable = role.joins_wolf_kill() && matches!(action.kind, ActionKind::Kill | ActionKind::Skip);
    if game.night_acted.contains(&action.actor) && !revisable {
        return ActionOutcome::fail("already acted this round");
    }

    if action.kind == ActionKind::Skip {
        if !spec.can_skip {
            return ActionOutcome::fail("this role must act");
        }
        game.night_acted.insert(action.actor);
        if role == Role::Guard {
            // Skipping releases the repeat-target restriction.
            if let Some(p) = game.player_mut(action.actor) {
                p.ability.last_guarded = None;
            }
        }
        return ActionOutcome::ok("skipped");
    }

    let outcome = match (role, action.kind) {
        (r, ActionKind::Kill) if r.joins_wolf_kill() => wolf_kill(game, action),
        (Role::Seer, ActionKind::Check) => seer_check(game, action),
        (Role::Gargoyle, ActionKind::Check) => gargoyle_check(game, action),
        (Role::Witch, ActionKind::Save) => witch_save(game, action),
        (Role::Witch, ActionKind::Poison) => witch_poison(game, action),
        (Role::Guard, ActionKind::Protect) => guard_protect(game, action),
        (Role::Dreamer, ActionKind::Dream) => dreamer_dream(game, action),
        (Role::Nightmare, ActionKind::Fear) => nightmare_fear(game, action),
        (Role::WolfBeauty, ActionKind::Charm) => wolf_beauty_charm(game, action),
        (Role::Medusa, ActionKind::Petrify) => medusa_petrify(game, action),
        _ => ActionOutcome::fail("invalid action for this role"),
    };

    if outcome.success {
        game.night_acted.insert(action.actor);
    }
    outcome
}

/// Requires a living target on the action.
fn living_target(game: &Game, action: &Action) -> Result<PlayerId, ActionOutcome> {
    let Some(target) = action.target else {
        return Err(ActionOutcome::fail("target required"));
    };
    if !game.living(target) {
        return Err(ActionOutcome::fail("target is dead or does not exist"));
    }
    Ok(target)
}

/// Requires a living target that is not the actor.
fn other_living_target(game: &Game, action: &Action) -> Result<PlayerId, ActionOutcome> {
    let target = living_target(game, action)?;
    if target == action.actor {
        return Err(ActionOutcome::fail("cannot target yourself"));
    }
    Ok(target)
}

fn wolf_kill(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    // Last submitted vote wins; one shared target for the whole camp. The
    // settled kill is attributed to the wolf who wrote the vote.
    game.wolf_target = Some(target);
    game.wolf_voter = Some(action.actor);
    ActionOutcome::ok(format!("the pack turns toward seat {}", target))
}

fn seer_check(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    ActionOutcome::with_effect(
        "checking",
        SkillEffect::check(priority::CAMP_CHECK, action.actor, target),
    )
}

fn gargoyle_check(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    ActionOutcome::with_effect(
        "watching",
        SkillEffect::check(priority::ROLE_CHECK, action.actor, target),
    )
}

fn witch_save(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let Some(witch) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if !witch.ability.antidote {
        return ActionOutcome::fail("the antidote is spent");
    }
    if game.round == 1 && game.no_first_night_save {
        return ActionOutcome::fail("the antidote may not be used on the first night");
    }
    if game.wolf_target != Some(target) {
        return ActionOutcome::fail("only tonight's victim can be saved");
    }

    if let Some(p) = game.player_mut(action.actor) {
        p.ability.antidote = false;
    }
    ActionOutcome::with_effect("antidote used", SkillEffect::save(action.actor, target))
}

fn witch_poison(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let Some(witch) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if !witch.ability.poison {
        return ActionOutcome::fail("the poison is spent");
    }

    if let Some(p) = game.player_mut(action.actor) {
        p.ability.poison = false;
    }
    ActionOutcome::with_effect(
        "poison used",
        SkillEffect::kill(
            priority::POISON,
            crate::effect::Timing::Night,
            action.actor,
            crate::effect::Target::Player(target),
            crate::effect::DeathReason::Poison,
        ),
    )
}

fn guard_protect(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let Some(guard) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if guard.ability.last_guarded == Some(target) {
        return ActionOutcome::fail("cannot guard the same player two nights in a row");
    }

    if let Some(p) = game.player_mut(action.actor) {
        p.ability.last_guarded = Some(target);
    }
    ActionOutcome::with_effect("guarding", SkillEffect::protect(action.actor, target))
}

fn dreamer_dream(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let Some(dreamer) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };

    // A second consecutive visit turns the dream fatal and clears the
    // memorized target.
    if dreamer.ability.dream_target == Some(target) {
        if let Some(p) = game.player_mut(action.actor) {
            p.ability.dream_target = None;
        }
        return ActionOutcome::with_effect(
            "the dream deepens",
            SkillEffect::kill(
                priority::DREAM,
                crate::effect::Timing::Night,
                action.actor,
                crate::effect::Target::Player(target),
                crate::effect::DeathReason::DreamKill,
            ),
        );
    }

    if let Some(p) = game.player_mut(action.actor) {
        p.ability.dream_target = Some(target);
    }
    ActionOutcome::with_effect("dreaming", SkillEffect::dream_protect(action.actor, target))
}

fn nightmare_fear(game: &mut Game, action: &Action) -> ActionOutcome {
    // Fear is exempt from the same-camp restriction: any living seat but
    // the nightmare itself.
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    ActionOutcome::with_effect("a nightmare descends", SkillEffect::fear(action.actor, target))
}

fn wolf_beauty_charm(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let same_camp = game.player(target).is_some_and(|p| p.camp == Camp::Wolf);
    if same_camp {
        return ActionOutcome::fail("cannot charm your own camp");
    }
    ActionOutcome::with_effect("charmed", SkillEffect::link(action.actor, target))
}

fn medusa_petrify(game: &mut Game, action: &Action) -> ActionOutcome {
    let target = match other_living_target(game, action) {
        Ok(t) => t,
        Err(e) => return e,
    };
    ActionOutcome::with_effect("petrifying", SkillEffect::petrify(action.actor, target))
}
