//! The settlement pass.
//!
//! Runs every queued effect in priority order against a transient
//! [`ResolutionState`] built from the current player state, then folds the
//! outcome (deaths, saves, blocks) back into the game. No step here ever
//! panics or aborts the pass: an effect that cannot take hold is recorded as
//! blocked with a reason and the pass continues, so the game is never left
//! partially resolved.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BlockReason, DeathReason, EffectKind, EffectQueue, SkillEffect, Timing};
use crate::game::{Game, PlayerId};
use crate::role::Role;

/// A rejected effect and why, for the settlement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEffect {
    pub effect: u32,
    pub actor: PlayerId,
    pub kind: EffectKind,
    pub reason: BlockReason,
}

/// What one settlement pass did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettleOutcome {
    pub deaths: Vec<(PlayerId, DeathReason)>,
    pub saved: Vec<PlayerId>,
    pub protected: Vec<PlayerId>,
    pub blocked: Vec<BlockedEffect>,
    /// Check results: (checker, target, result text).
    pub checks: Vec<(PlayerId, PlayerId, String)>,
    pub messages: Vec<String>,
}

/// Per-settlement scratch state, built fresh from player state at the start
/// of every pass and discarded at the end.
#[derive(Debug, Default)]
struct ResolutionState {
    guarded: BTreeSet<PlayerId>,
    dreamed: BTreeSet<PlayerId>,
    petrified: BTreeSet<PlayerId>,
    cannot_act: BTreeSet<PlayerId>,
    /// Pending deaths keyed by seat; the first recorded reason wins.
    pending_death: BTreeMap<PlayerId, DeathReason>,
    /// Charm links, holder -> partner.
    links: Vec<(PlayerId, PlayerId)>,
}

impl ResolutionState {
    /// Seeds the pass from persistent player state: standing fear marks and
    /// charm links established on earlier rounds.
    fn from_game(game: &Game) -> Self {
        let mut state = ResolutionState::default();
        for p in game.alive_players() {
            if p.feared {
                state.cannot_act.insert(p.id);
            }
            if p.role == Role::WolfBeauty {
                if let Some(partner) = p.ability.charmed {
                    state.links.push((p.id, partner));
                }
            }
        }
        state
    }
}

impl EffectQueue {
    /// Runs one settlement pass for the given timing class, then clears the
    /// queue of everything except effects still awaiting a target.
    pub fn resolve(&mut self, game: &mut Game, timing: Timing) -> SettleOutcome {
        let mut state = ResolutionState::from_game(game);
        let mut outcome = SettleOutcome::default();

        // The queue is already priority-sorted with stable insertion order.
        let mut effects = std::mem::take(&mut self.effects);
        for effect in &mut effects {
            if effect.is_pending() {
                continue;
            }
            if effect.timing != timing && effect.timing != Timing::OnDeath {
                block(effect, BlockReason::WrongTiming, &mut outcome);
                continue;
            }
            run_effect(effect, game, &mut state, &mut outcome);
        }

        cascade_linked_deaths(game, &mut state, &mut outcome);
        fold_deaths(game, &state, &mut outcome);

        // Pending-target effects survive the pass; everything else is spent.
        self.effects = effects.into_iter().filter(|e| e.is_pending()).collect();

        tracing::debug!(
            round = game.round,
            ?timing,
            deaths = outcome.deaths.len(),
            blocked = outcome.blocked.len(),
            "settlement pass complete"
        );
        outcome
    }
}

fn block(effect: &mut SkillEffect, reason: BlockReason, outcome: &mut SettleOutcome) {
    effect.blocked = Some(reason);
    outcome.blocked.push(BlockedEffect {
        effect: effect.id,
        actor: effect.actor,
        kind: effect.kind,
        reason,
    });
}

fn run_effect(
    effect: &mut SkillEffect,
    game: &mut Game,
    state: &mut ResolutionState,
    outcome: &mut SettleOutcome,
) {
    // The exile kill carries the victim as its own actor; the victim's
    // incapacity never blocks it.
    let exile = effect.kind == EffectKind::Kill && effect.reason == Some(DeathReason::Exile);
    if !exile && state.cannot_act.contains(&effect.actor) {
        block(effect, BlockReason::Incapacitated, outcome);
        return;
    }

    let target = match effect.target.player() {
        Some(t) => t,
        None => return,
    };

    if effect.kind.requires_living_target() && !game.living(target) {
        block(effect, BlockReason::DeadTarget, outcome);
        return;
    }

    if effect.kind.blocked_by_petrify() && state.petrified.contains(&target) {
        block(effect, BlockReason::Immune, outcome);
        return;
    }

    match effect.kind {
        EffectKind::Kill => run_kill(effect, target, game, state, outcome),
        EffectKind::Protect => {
            state.guarded.insert(target);
            effect.executed = true;
        }
        EffectKind::DreamProtect => {
            state.dreamed.insert(target);
            effect.executed = true;
        }
        EffectKind::Save => run_save(effect, target, state, outcome),
        EffectKind::Check => run_check(effect, target, game, outcome),
        EffectKind::Link => {
            if let Some(actor) = game.player_mut(effect.actor) {
                actor.ability.charmed = Some(target);
            }
            state.links.push((effect.actor, target));
            effect.executed = true;
        }
        EffectKind::Fear => {
            if let Some(p) = game.player_mut(target) {
                p.feared = true;
            }
            state.cannot_act.insert(target);
            effect.executed = true;
            outcome.messages.push(format!("seat {} is feared", target));
        }
        EffectKind::Petrify => {
            state.petrified.insert(target);
            state.cannot_act.insert(target);
            effect.executed = true;
            outcome.messages.push(format!("seat {} is petrified", target));
        }
    }
}

fn run_kill(
    effect: &mut SkillEffect,
    target: PlayerId,
    game: &mut Game,
    state: &mut ResolutionState,
    outcome: &mut SettleOutcome,
) {
    // The reason field, not the priority, decides which immunities apply.
    let reason = effect.reason.unwrap_or(DeathReason::WolfKill);

    if reason == DeathReason::WolfKill
        && (state.guarded.contains(&target) || state.dreamed.contains(&target))
    {
        block(effect, BlockReason::Protected, outcome);
        outcome.protected.push(target);
        return;
    }

    if reason == DeathReason::Exile {
        let reveals = game
            .player(target)
            .is_some_and(|p| p.role == Role::Idiot && !p.ability.revealed);
        if reveals {
            if let Some(p) = game.player_mut(target) {
                p.ability.revealed = true;
            }
            block(effect, BlockReason::IdiotReveal, outcome);
            outcome
                .messages
                .push(format!("seat {} reveals the idiot and survives the exile", target));
            return;
        }
    }

    state.pending_death.entry(target).or_insert(reason);
    effect.executed = true;
}

fn run_save(
    effect: &mut SkillEffect,
    target: PlayerId,
    state: &mut ResolutionState,
    outcome: &mut SettleOutcome,
) {
    // The antidote cures exactly one thing: the ordinary wolf kill.
    if state.pending_death.get(&target) == Some(&DeathReason::WolfKill) {
        state.pending_death.remove(&target);
        effect.executed = true;
        outcome.saved.push(target);
        outcome.messages.push(format!("seat {} was saved", target));
    } else {
        block(effect, BlockReason::Precondition, outcome);
    }
}

fn run_check(
    effect: &mut SkillEffect,
    target: PlayerId,
    game: &Game,
    outcome: &mut SettleOutcome,
) {
    let Some(actor_role) = game.player(effect.actor).map(|p| p.role) else {
        return;
    };
    let Some(target_player) = game.player(target) else {
        return;
    };

    // Seer learns the camp; gargoyle learns the exact role.
    let text = match actor_role {
        Role::Gargoyle => target_player.role.name().to_string(),
        _ => target_player.camp.name().to_string(),
    };
    effect.payload = Some(json!({ "target": target, "result": text }));
    effect.executed = true;
    outcome.checks.push((effect.actor, target, text));
}

/// Adds linked partners of dying link-holders to the death set, exactly once
/// each. Iterates to a fixpoint so chained links settle in the same pass.
fn cascade_linked_deaths(game: &Game, state: &mut ResolutionState, outcome: &mut SettleOutcome) {
    loop {
        let mut added = false;
        for &(holder, partner) in &state.links {
            if state.pending_death.contains_key(&holder)
                && game.living(partner)
                && !state.pending_death.contains_key(&partner)
            {
                state.pending_death.insert(partner, DeathReason::Linked);
                outcome
                    .messages
                    .push(format!("seat {} dies with seat {}", partner, holder));
                added = true;
            }
        }
        if !added {
            break;
        }
    }
}

/// Folds pending deaths into persistent player state.
fn fold_deaths(game: &mut Game, state: &ResolutionState, outcome: &mut SettleOutcome) {
    for (&id, &reason) in &state.pending_death {
        if let Some(p) = game.player_mut(id) {
            if p.alive {
                p.mark_dead(reason);
                outcome.deaths.push((id, reason));
                outcome
                    .messages
                    .push(format!("seat {} died ({})", id, reason.name()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{priority, Target};
    use crate::game::Player;

    fn game_of(roles: &[Role]) -> Game {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, r)| Player::new(i as u32 + 1, *r))
            .collect();
        Game::new(players)
    }

    fn wolf_kill(actor: PlayerId, target: PlayerId) -> SkillEffect {
        SkillEffect::kill(
            priority::WOLF_KILL,
            Timing::Night,
            actor,
            Target::Player(target),
            DeathReason::WolfKill,
        )
    }

    #[test]
    fn plain_kill_marks_death_with_reason() {
        let mut game = game_of(&[Role::Werewolf, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(wolf_kill(1, 2));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert_eq!(outcome.deaths, vec![(2, DeathReason::WolfKill)]);
        assert!(!game.living(2));
        assert_eq!(game.player(2).unwrap().out_reason, Some(DeathReason::WolfKill));
        assert!(q.effects().is_empty(), "queue cleared after the pass");
    }

    #[test]
    fn guard_protection_blocks_wolf_kill_only() {
        let mut game = game_of(&[Role::Werewolf, Role::Guard, Role::Witch, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(wolf_kill(1, 4));
        q.add(SkillEffect::protect(2, 4));
        // Poison on the same protected target still lands.
        q.add(SkillEffect::kill(
            priority::POISON,
            Timing::Night,
            3,
            Target::Player(4),
            DeathReason::Poison,
        ));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert_eq!(outcome.protected, vec![4]);
        assert_eq!(outcome.deaths, vec![(4, DeathReason::Poison)]);
    }

    #[test]
    fn save_clears_only_wolf_kill_deaths() {
        let mut game = game_of(&[Role::Werewolf, Role::Witch, Role::Villager, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(wolf_kill(1, 3));
        q.add(SkillEffect::save(2, 3));
        // A save aimed at a poison victim does nothing.
        q.add(SkillEffect::kill(
            priority::POISON,
            Timing::Night,
            2,
            Target::Player(4),
            DeathReason::Poison,
        ));
        q.add(SkillEffect::save(2, 4));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert_eq!(outcome.saved, vec![3]);
        assert!(game.living(3));
        assert!(!game.living(4));
        assert!(outcome
            .blocked
            .iter()
            .any(|b| b.kind == EffectKind::Save && b.reason == BlockReason::Precondition));
    }

    #[test]
    fn save_resolves_after_kill_regardless_of_insertion_order() {
        let mut game = game_of(&[Role::Werewolf, Role::Witch, Role::Villager]);
        let mut q = EffectQueue::new();
        // Save submitted before the kill; priority order still runs it after.
        q.add(SkillEffect::save(2, 3));
        q.add(wolf_kill(1, 3));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert_eq!(outcome.saved, vec![3]);
        assert!(game.living(3));
    }

    #[test]
    fn equal_priority_executes_in_submission_order() {
        let mut game = game_of(&[Role::Werewolf, Role::Werewolf, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(wolf_kill(1, 3));
        q.add(wolf_kill(2, 3));

        let outcome = q.resolve(&mut game, Timing::Night);
        // First submission recorded the death; the duplicate executed as a
        // no-op on the same pending death.
        assert_eq!(outcome.deaths, vec![(3, DeathReason::WolfKill)]);
    }

    #[test]
    fn feared_actor_cannot_execute_queued_effect() {
        let mut game = game_of(&[Role::Nightmare, Role::Seer, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::fear(1, 2));
        q.add(SkillEffect::check(priority::CAMP_CHECK, 2, 1));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome.checks.is_empty());
        assert!(outcome
            .blocked
            .iter()
            .any(|b| b.actor == 2 && b.reason == BlockReason::Incapacitated));
        assert!(game.player(2).unwrap().feared);
    }

    #[test]
    fn petrified_target_is_immune_to_kill_and_check() {
        let mut game = game_of(&[Role::Medusa, Role::Werewolf, Role::Seer, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::petrify(1, 4));
        q.add(wolf_kill(2, 4));
        q.add(SkillEffect::check(priority::CAMP_CHECK, 3, 4));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(game.living(4));
        assert!(outcome.checks.is_empty());
        let immune: Vec<_> = outcome
            .blocked
            .iter()
            .filter(|b| b.reason == BlockReason::Immune)
            .collect();
        assert_eq!(immune.len(), 2);
    }

    #[test]
    fn petrified_player_also_cannot_act() {
        let mut game = game_of(&[Role::Medusa, Role::Seer, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::petrify(1, 2));
        q.add(SkillEffect::check(priority::CAMP_CHECK, 2, 3));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome
            .blocked
            .iter()
            .any(|b| b.actor == 2 && b.reason == BlockReason::Incapacitated));
    }

    #[test]
    fn exile_lands_on_a_feared_target() {
        let mut game = game_of(&[Role::Nightmare, Role::Villager]);
        game.player_mut(2).unwrap().feared = true;
        let mut q = EffectQueue::new();
        q.add(SkillEffect::kill(
            priority::EXILE,
            Timing::Day,
            2,
            Target::Player(2),
            DeathReason::Exile,
        ));

        let outcome = q.resolve(&mut game, Timing::Day);
        assert_eq!(outcome.deaths, vec![(2, DeathReason::Exile)]);
        assert!(!game.living(2), "fear does not grant exile immunity");
    }

    #[test]
    fn kill_against_dead_target_is_blocked() {
        let mut game = game_of(&[Role::Werewolf, Role::Villager]);
        game.player_mut(2).unwrap().mark_dead(DeathReason::Exile);
        let mut q = EffectQueue::new();
        q.add(wolf_kill(1, 2));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome.deaths.is_empty());
        assert_eq!(outcome.blocked[0].reason, BlockReason::DeadTarget);
    }

    #[test]
    fn seer_check_reports_camp_gargoyle_reports_role() {
        let mut game = game_of(&[Role::Seer, Role::Gargoyle, Role::Werewolf]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::check(priority::CAMP_CHECK, 1, 3));
        q.add(SkillEffect::check(priority::ROLE_CHECK, 2, 1));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome.checks.contains(&(1, 3, "wolf".to_string())));
        assert!(outcome.checks.contains(&(2, 1, "seer".to_string())));
    }

    #[test]
    fn linked_partner_dies_in_the_same_pass_exactly_once() {
        let mut game = game_of(&[Role::WolfBeauty, Role::Werewolf, Role::Villager, Role::Witch]);
        game.player_mut(1).unwrap().ability.charmed = Some(3);
        let mut q = EffectQueue::new();
        // Wolf beauty is poisoned; the charmed partner is also independently
        // wolf-killed. The partner dies once, with the kill's reason.
        q.add(SkillEffect::kill(
            priority::POISON,
            Timing::Night,
            4,
            Target::Player(1),
            DeathReason::Poison,
        ));
        q.add(wolf_kill(2, 3));

        let outcome = q.resolve(&mut game, Timing::Night);
        let deaths_of_3: Vec<_> = outcome.deaths.iter().filter(|(id, _)| *id == 3).collect();
        assert_eq!(deaths_of_3.len(), 1);
        assert_eq!(deaths_of_3[0].1, DeathReason::WolfKill);
        assert!(!game.living(1));
        assert!(!game.living(3));
    }

    #[test]
    fn link_established_this_pass_cascades_this_pass() {
        let mut game = game_of(&[Role::WolfBeauty, Role::Witch, Role::Villager]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::link(1, 3));
        q.add(SkillEffect::kill(
            priority::POISON,
            Timing::Night,
            2,
            Target::Player(1),
            DeathReason::Poison,
        ));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome.deaths.contains(&(3, DeathReason::Linked)));
        assert_eq!(game.player(1).unwrap().ability.charmed, Some(3));
    }

    #[test]
    fn pending_effects_survive_the_pass() {
        let mut game = game_of(&[Role::Hunter, Role::Werewolf]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::kill(
            priority::DEFERRED,
            Timing::OnDeath,
            1,
            Target::Pending,
            DeathReason::HunterShot,
        ));
        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(outcome.deaths.is_empty());
        assert_eq!(q.pending().count(), 1);
    }

    #[test]
    fn unrevealed_idiot_survives_exile_kill() {
        let mut game = game_of(&[Role::Idiot, Role::Werewolf]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::kill(
            priority::EXILE,
            Timing::Day,
            1,
            Target::Player(1),
            DeathReason::Exile,
        ));

        let outcome = q.resolve(&mut game, Timing::Day);
        assert!(game.living(1));
        assert!(game.player(1).unwrap().ability.revealed);
        assert_eq!(outcome.blocked[0].reason, BlockReason::IdiotReveal);

        // The second exile lands.
        let mut q = EffectQueue::new();
        q.add(SkillEffect::kill(
            priority::EXILE,
            Timing::Day,
            1,
            Target::Player(1),
            DeathReason::Exile,
        ));
        let outcome = q.resolve(&mut game, Timing::Day);
        assert_eq!(outcome.deaths, vec![(1, DeathReason::Exile)]);
    }

    #[test]
    fn wrong_timing_effects_are_blocked_not_executed() {
        let mut game = game_of(&[Role::Knight, Role::Werewolf]);
        let mut q = EffectQueue::new();
        q.add(SkillEffect::kill(
            priority::DEFERRED,
            Timing::Day,
            1,
            Target::Player(2),
            DeathReason::Duel,
        ));

        let outcome = q.resolve(&mut game, Timing::Night);
        assert!(game.living(2));
        assert_eq!(outcome.blocked[0].reason, BlockReason::WrongTiming);
    }
}
