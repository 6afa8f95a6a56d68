//! The phase flow controller.
//!
//! A moderator client drives the game through two entry points: submitting
//! player actions into the current phase and advancing to the next phase.
//! Phase transitions own the settlement boundaries: entering the night
//! settlement materializes the wolf camp's shared kill and runs the night
//! pass, entering the day settlement finalizes the exile vote and runs the
//! day pass. Win conditions are checked after every settlement and after
//! every immediate day kill.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ability::{self, Action, ActionKind, ActionOutcome};
use crate::config::{PhaseKind, PhaseSpec};
use crate::effect::{priority, DeathReason, EffectQueue, SkillEffect, Target, Timing};
use crate::game::{BadgeState, Game, HistoryEntry, PlayerId, Scope};
use crate::role::{Camp, Role, RoleRegistry};
use crate::vote::{self, ElectionStage};

/// What the moderator sees after an advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub round: u32,
    pub phase: u32,
    pub kind: PhaseKind,
    pub finished: bool,
    pub winner: Option<Camp>,
    pub messages: Vec<String>,
}

fn phase_result(game: &Game, phases: &[PhaseSpec], messages: Vec<String>) -> PhaseResult {
    let kind = phases
        .iter()
        .find(|p| p.id == game.phase)
        .map(|p| p.kind)
        .unwrap_or(PhaseKind::Lobby);
    PhaseResult {
        round: game.round,
        phase: game.phase,
        kind,
        finished: game.finished,
        winner: game.winner,
        messages,
    }
}

/// True if anyone who acts in this night phase is still alive.
fn night_role_alive(game: &Game, role: Role) -> bool {
    game.alive_players().any(|p| {
        p.role == role || (role == Role::Werewolf && p.role.joins_wolf_kill())
    })
}

/// Advances to the next applicable phase and runs whatever that boundary
/// owes: settlements settle, the election walks its sub-stages in place,
/// night phases with no living actor are skipped, and passing the day
/// settlement wraps into the next round.
pub fn advance_phase(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    phases: &[PhaseSpec],
) -> PhaseResult {
    let mut messages = Vec::new();
    if game.finished {
        messages.push("the game is over".to_string());
        return phase_result(game, phases, messages);
    }
    let Some(idx) = phases.iter().position(|p| p.id == game.phase) else {
        messages.push(format!("unknown phase id {}", game.phase));
        return phase_result(game, phases, messages);
    };

    // The election holds its phase until it completes.
    if phases[idx].kind == PhaseKind::Election && !game.election.completed {
        match game.election.stage {
            ElectionStage::Signup => {
                vote::begin_campaign(game);
                if !game.election.completed {
                    messages.push("signup closed, the campaign begins".to_string());
                    return phase_result(game, phases, messages);
                }
                messages.push("the election resolved at signup close".to_string());
            }
            ElectionStage::Campaign => {
                vote::begin_voting(game);
                messages.push("the election ballot box is open".to_string());
                return phase_result(game, phases, messages);
            }
            ElectionStage::Voting => {
                messages.push("election ballots are still outstanding".to_string());
                return phase_result(game, phases, messages);
            }
            ElectionStage::Tie => {
                messages.push(
                    "the election is tied, awaiting the badge assignment".to_string(),
                );
                return phase_result(game, phases, messages);
            }
            ElectionStage::Done => {}
        }
    }

    let mut i = idx;
    loop {
        i += 1;
        if i >= phases.len() {
            game.round += 1;
            game.exile.reset();
            i = phases
                .iter()
                .position(|p| matches!(p.kind, PhaseKind::Night(_)))
                .unwrap_or(0);
        }
        match phases[i].kind {
            PhaseKind::Lobby => continue,
            PhaseKind::Night(role) if !night_role_alive(game, role) => continue,
            PhaseKind::Election if game.round > 1 || game.election.completed => continue,
            PhaseKind::Vote if game.day_ended => continue,
            _ => {}
        }
        game.phase = phases[i].id;
        match phases[i].kind {
            PhaseKind::Settle => messages.extend(settle_night(game, queue, registry)),
            PhaseKind::DaySettle => messages.extend(settle_day(game, queue, registry)),
            PhaseKind::Vote => game.exile.reset(),
            _ => {}
        }
        break;
    }
    phase_result(game, phases, messages)
}

/// Routes one submission into the current phase.
pub fn submit_action(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    phases: &[PhaseSpec],
    action: &Action,
) -> ActionOutcome {
    if game.finished {
        return ActionOutcome::fail("the game is over");
    }
    let Some(phase) = phases.iter().find(|p| p.id == game.phase) else {
        return ActionOutcome::fail("unknown phase");
    };
    match phase.kind {
        PhaseKind::Lobby | PhaseKind::Settle | PhaseKind::DaySettle => {
            ActionOutcome::fail("no actions are taken in this phase")
        }
        PhaseKind::Night(role) => submit_night(game, queue, registry, role, action),
        PhaseKind::Election => submit_election(game, action),
        PhaseKind::Discussion => submit_day(game, queue, registry, action),
        PhaseKind::Vote => submit_exile_ballot(game, action),
    }
}

fn submit_night(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    role: Role,
    action: &Action,
) -> ActionOutcome {
    let Some(player) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if !player.alive {
        return ActionOutcome::fail("dead players cannot act");
    }
    let in_phase =
        player.role == role || (role == Role::Werewolf && player.role.joins_wolf_kill());
    if !in_phase {
        return ActionOutcome::fail("not this seat's phase");
    }

    let out = ability::handle_night_action(game, registry, action);
    if out.success {
        if let Some(effect) = out.effect.clone() {
            queue.add(effect);
        }
        let scope = match action.kind {
            ActionKind::Kill => Scope::Wolves,
            ActionKind::Skip => Scope::Moderator,
            _ => Scope::ActorOnly,
        };
        game.log(HistoryEntry::action(
            game.round,
            game.phase,
            action.actor,
            action.kind.name(),
            action.target,
            scope,
            out.message.clone(),
        ));
    }
    out
}

fn submit_election(game: &mut Game, action: &Action) -> ActionOutcome {
    let out = match action.kind {
        ActionKind::Signup => vote::signup_toggle(game, action.actor),
        ActionKind::Withdraw => vote::withdraw(game, action.actor),
        ActionKind::Vote => vote::cast_election(game, action.actor, action.target),
        _ => return ActionOutcome::fail("the election takes signup, withdraw, and vote"),
    };
    if out.success {
        game.log(HistoryEntry::action(
            game.round,
            game.phase,
            action.actor,
            action.kind.name(),
            action.target,
            Scope::Public,
            out.message.clone(),
        ));
    }
    out
}

/// Day skills interrupt the discussion and resolve on the spot, death
/// triggers and win conditions included. A successful interrupt ends the
/// day: the exile vote is skipped and the flow falls through to the day
/// settlement.
fn submit_day(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    action: &Action,
) -> ActionOutcome {
    let Some(player) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if !player.alive {
        return ActionOutcome::fail("dead players cannot act");
    }
    if !matches!(action.kind, ActionKind::Duel | ActionKind::SelfDestruct) {
        return ActionOutcome::fail("only the duel and self-destruct interrupt the day");
    }
    if player.feared {
        return ActionOutcome::fail("feared players cannot use day skills");
    }

    let mut out = ability::handle_day_action(game, registry, action);
    if out.success {
        if let Some(effect) = out.effect.clone() {
            queue.add(effect);
        }
        game.log(HistoryEntry::action(
            game.round,
            game.phase,
            action.actor,
            action.kind.name(),
            action.target,
            Scope::Public,
            out.message.clone(),
        ));

        let settle = queue.resolve(game, Timing::Day);
        let mut messages = settle.messages.clone();
        handle_deaths(game, queue, registry, &settle.deaths, &mut messages);
        for m in &messages {
            game.log(HistoryEntry::system(game.round, game.phase, "day-kill", m.clone()));
        }
        // A day interrupt ends the day; the exile vote is skipped.
        game.day_ended = true;
        check_win(game);
        out.data = Some(json!({ "deaths": settle.deaths }));
    }
    out
}

fn submit_exile_ballot(game: &mut Game, action: &Action) -> ActionOutcome {
    if action.kind != ActionKind::Vote {
        return ActionOutcome::fail("only exile ballots are taken now");
    }
    // Fear does not reach the ballot: feared players still vote.
    let out = vote::cast_exile(game, action.actor, action.target);
    if out.success {
        game.log(HistoryEntry::action(
            game.round,
            game.phase,
            action.actor,
            action.kind.name(),
            action.target,
            Scope::Public,
            out.message.clone(),
        ));
    }
    out
}

/// The night settlement: one shared wolf kill joins the queue, the night
/// pass runs, and every death is checked for triggers and the badge.
fn settle_night(game: &mut Game, queue: &mut EffectQueue, registry: &RoleRegistry) -> Vec<String> {
    if let Some(victim) = game.wolf_target {
        // The kill belongs to the wolf who wrote the shared vote, so fear
        // or petrify landing on a packmate cannot cancel it.
        let actor = game
            .wolf_voter
            .filter(|&v| game.living(v))
            .or_else(|| {
                game.alive_players()
                    .find(|p| p.role.joins_wolf_kill())
                    .map(|p| p.id)
            });
        if let Some(actor) = actor {
            queue.add(SkillEffect::kill(
                priority::WOLF_KILL,
                Timing::Night,
                actor,
                Target::Player(victim),
                DeathReason::WolfKill,
            ));
        }
    }

    let outcome = queue.resolve(game, Timing::Night);
    let mut messages = outcome.messages.clone();
    handle_deaths(game, queue, registry, &outcome.deaths, &mut messages);

    for &(checker, target, ref result) in &outcome.checks {
        game.log(HistoryEntry::action(
            game.round,
            game.phase,
            checker,
            "check",
            Some(target),
            Scope::ActorOnly,
            format!("seat {} is {}", target, result),
        ));
    }
    game.log(HistoryEntry::system(
        game.round,
        game.phase,
        "settle",
        format!("night {} settled, {} died", game.round, outcome.deaths.len()),
    ));

    game.clear_night();
    check_win(game);
    messages
}

/// The day settlement: the exile vote concludes, the day pass runs, and
/// fear marks from last night expire.
fn settle_day(game: &mut Game, queue: &mut EffectQueue, registry: &RoleRegistry) -> Vec<String> {
    let mut messages = Vec::new();
    match vote::finalize_exile(game) {
        Some(exiled) => {
            queue.add(SkillEffect::kill(
                priority::EXILE,
                Timing::Day,
                exiled,
                Target::Player(exiled),
                DeathReason::Exile,
            ));
            game.log(HistoryEntry::system(
                game.round,
                game.phase,
                "exile",
                format!("seat {} is voted out", exiled),
            ));
        }
        None => messages.push("nobody is exiled".to_string()),
    }

    let outcome = queue.resolve(game, Timing::Day);
    messages.extend(outcome.messages.iter().cloned());
    handle_deaths(game, queue, registry, &outcome.deaths, &mut messages);

    game.log(HistoryEntry::system(
        game.round,
        game.phase,
        "day-settle",
        format!("day {} settled, {} died", game.round, outcome.deaths.len()),
    ));

    game.clear_fear();
    game.day_ended = false;
    check_win(game);
    messages
}

/// Per-death bookkeeping shared by every settlement path: the badge of a
/// dying sheriff goes pending, and death-triggered skills join the queue
/// awaiting their target.
fn handle_deaths(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    deaths: &[(PlayerId, DeathReason)],
    messages: &mut Vec<String>,
) {
    for &(id, reason) in deaths {
        if game.sheriff == Some(id) && game.badge == BadgeState::Normal {
            vote::on_sheriff_death(game);
            messages.push(format!("seat {} was the sheriff, the badge awaits transfer", id));
        }
        if let Some(effect) = ability::on_death(game, registry, id, reason) {
            let eid = queue.add(effect);
            messages.push(format!("seat {} has a death skill pending (effect {})", id, eid));
        }
    }
}

/// Completes a pending-target death skill with the moderator-relayed choice
/// and executes it immediately, cascading further triggers.
pub fn complete_pending(
    game: &mut Game,
    queue: &mut EffectQueue,
    registry: &RoleRegistry,
    effect_id: u32,
    target: PlayerId,
) -> ActionOutcome {
    if game.finished {
        return ActionOutcome::fail("the game is over");
    }
    let Some(actor) = queue.pending().find(|e| e.id == effect_id).map(|e| e.actor) else {
        return ActionOutcome::fail("no such pending effect");
    };
    if !game.living(target) {
        return ActionOutcome::fail("target is dead or does not exist");
    }
    let Some(effect) = queue.take_pending(effect_id, target) else {
        return ActionOutcome::fail("no such pending effect");
    };

    // A scratch queue keeps the completion from disturbing effects queued
    // for the next settlement.
    let mut scratch = EffectQueue::new();
    scratch.add(effect);
    let outcome = scratch.resolve(game, Timing::OnDeath);
    let mut messages = outcome.messages.clone();
    handle_deaths(game, queue, registry, &outcome.deaths, &mut messages);

    game.log(HistoryEntry::action(
        game.round,
        game.phase,
        actor,
        "death-skill",
        Some(target),
        Scope::Public,
        messages.join("; "),
    ));
    check_win(game);

    let mut out = ActionOutcome::ok(format!("seat {} takes seat {} down", actor, target));
    out.data = Some(json!({ "deaths": outcome.deaths }));
    out
}

/// The win condition: good wins when every wolf is gone, wolves win when
/// they are at numerical parity with the good camp or better.
pub fn check_win(game: &mut Game) -> Option<Camp> {
    if game.finished {
        return game.winner;
    }
    let wolves = game.alive_in_camp(Camp::Wolf);
    let goods = game.alive_in_camp(Camp::Good);
    let winner = if wolves == 0 {
        Some(Camp::Good)
    } else if wolves >= goods {
        Some(Camp::Wolf)
    } else {
        None
    };
    if let Some(camp) = winner {
        game.winner = Some(camp);
        game.finished = true;
        game.log(HistoryEntry::system(
            game.round,
            game.phase,
            "end",
            format!("the {} camp wins", camp.name()),
        ));
        tracing::info!(round = game.round, winner = camp.name(), "game over");
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::game::Player;

    fn setup(roles: &[Role]) -> (Game, EffectQueue, RoleRegistry, Vec<PhaseSpec>) {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, r)| Player::new(i as u32 + 1, *r))
            .collect();
        let registry = RoleRegistry::standard();
        let mut counts: Vec<(Role, u8)> = Vec::new();
        for &r in roles {
            if let Some(entry) = counts.iter_mut().find(|(cr, _)| *cr == r) {
                entry.1 += 1;
            } else {
                counts.push((r, 1));
            }
        }
        let config = RoomConfig { roles: counts, no_first_night_save_at: 12 };
        let phases = config.phases(&registry);
        (Game::new(players), EffectQueue::new(), registry, phases)
    }

    fn phase_of(phases: &[PhaseSpec], kind: PhaseKind) -> u32 {
        phases.iter().find(|p| p.kind == kind).unwrap().id
    }

    #[test]
    fn night_cycle_settles_wolf_kill_and_check() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Seer, Role::Villager, Role::Villager]);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Night(Role::Werewolf));
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Kill, 3)
        )
        .success);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Night(Role::Seer));
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(2, ActionKind::Check, 1)
        )
        .success);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert!(!game.living(3));
        assert_eq!(game.wolf_target, None, "night state cleared");
        assert!(game
            .history
            .iter()
            .any(|e| e.action == "check" && e.text.contains("wolf")));
        assert!(!game.finished);
    }

    #[test]
    fn advance_skips_phases_with_no_living_actor() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Seer, Role::Villager, Role::Villager]);
        game.player_mut(2).unwrap().mark_dead(DeathReason::Exile);

        advance_phase(&mut game, &mut queue, &registry, &phases);
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Kill, 3)
        )
        .success);

        // The seer phase is skipped outright.
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
    }

    #[test]
    fn submissions_outside_the_actor_phase_bounce() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Seer, Role::Villager]);
        advance_phase(&mut game, &mut queue, &registry, &phases);

        // Werewolf phase: the seer may not act yet.
        let out = submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(2, ActionKind::Check, 1),
        );
        assert!(!out.success);
        assert_eq!(out.message, "not this seat's phase");
    }

    #[test]
    fn unopposed_candidate_falls_through_to_discussion() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Villager, Role::Villager, Role::Seer]);
        game.phase = phase_of(&phases, PhaseKind::Election);

        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::plain(2, ActionKind::Signup)
        )
        .success);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(game.sheriff, Some(2));
        assert_eq!(r.kind, PhaseKind::Discussion);
    }

    #[test]
    fn tied_election_holds_the_phase_until_assignment() {
        let (mut game, mut queue, registry, phases) = setup(&[
            Role::Werewolf,
            Role::Villager,
            Role::Villager,
            Role::Villager,
            Role::Villager,
        ]);
        game.phase = phase_of(&phases, PhaseKind::Election);

        for seat in [1, 2] {
            assert!(submit_action(
                &mut game,
                &mut queue,
                &registry,
                &phases,
                &Action::plain(seat, ActionKind::Signup)
            )
            .success);
        }
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Election, "campaign stage");
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Election, "voting stage");

        assert!(submit_action(&mut game, &mut queue, &registry, &phases, &Action::targeted(3, ActionKind::Vote, 1)).success);
        assert!(submit_action(&mut game, &mut queue, &registry, &phases, &Action::targeted(4, ActionKind::Vote, 2)).success);
        assert!(submit_action(&mut game, &mut queue, &registry, &phases, &Action::plain(5, ActionKind::Vote)).success);
        assert_eq!(game.election.stage, ElectionStage::Tie);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Election, "tie holds the phase");

        assert!(vote::assign_badge(&mut game, Some(1)).success);
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Discussion);
        assert_eq!(game.sheriff, Some(1));
    }

    #[test]
    fn exile_vote_settles_and_good_wins() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Villager, Role::Villager, Role::Seer]);
        game.phase = phase_of(&phases, PhaseKind::Vote);

        for seat in [2, 3, 4] {
            assert!(submit_action(
                &mut game,
                &mut queue,
                &registry,
                &phases,
                &Action::targeted(seat, ActionKind::Vote, 1)
            )
            .success);
        }
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Vote, 2)
        )
        .success);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::DaySettle);
        assert!(!game.living(1));
        assert_eq!(r.winner, Some(Camp::Good));
        assert!(game.finished);
    }

    #[test]
    fn round_wraps_to_the_first_night_after_day_settle() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Villager, Role::Villager, Role::Seer]);
        game.election.completed = true;
        game.phase = phase_of(&phases, PhaseKind::DaySettle);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(game.round, 2);
        assert_eq!(r.kind, PhaseKind::Night(Role::Werewolf));

        // Round two never revisits the election.
        game.phase = phase_of(&phases, PhaseKind::Settle);
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Discussion);
    }

    #[test]
    fn hunter_shot_completes_through_the_pending_queue() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Hunter, Role::Werewolf, Role::Villager, Role::Villager]);

        advance_phase(&mut game, &mut queue, &registry, &phases);
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(2, ActionKind::Kill, 1)
        )
        .success);
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert!(!game.living(1));
        assert_eq!(queue.pending().count(), 1);

        let effect_id = queue.pending().next().unwrap().id;
        let out = complete_pending(&mut game, &mut queue, &registry, effect_id, 2);
        assert!(out.success);
        assert!(!game.living(2));
        assert_eq!(game.player(2).unwrap().out_reason, Some(DeathReason::HunterShot));
        assert_eq!(game.winner, Some(Camp::Good));
    }

    #[test]
    fn self_destruct_interrupts_the_day_and_arms_the_claw() {
        let (mut game, mut queue, registry, phases) = setup(&[
            Role::WhiteWolfKing,
            Role::Werewolf,
            Role::Villager,
            Role::Villager,
            Role::Seer,
        ]);
        game.phase = phase_of(&phases, PhaseKind::Discussion);

        let out = submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::plain(1, ActionKind::SelfDestruct),
        );
        assert!(out.success);
        assert!(!game.living(1), "the blast is immediate");
        assert_eq!(queue.pending().count(), 1, "the claw awaits its target");

        let effect_id = queue.pending().next().unwrap().id;
        assert!(complete_pending(&mut game, &mut queue, &registry, effect_id, 3).success);
        assert!(!game.living(3));
        assert_eq!(game.player(3).unwrap().out_reason, Some(DeathReason::Claw));
        assert!(!game.finished);

        // The blast ends the day: no exile vote follows.
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::DaySettle);
    }

    #[test]
    fn feared_seat_can_still_be_exiled() {
        let (mut game, mut queue, registry, phases) = setup(&[
            Role::Nightmare,
            Role::Werewolf,
            Role::Villager,
            Role::Villager,
            Role::Villager,
            Role::Villager,
        ]);
        game.election.completed = true;

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Night(Role::Nightmare));
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Fear, 3)
        )
        .success);
        advance_phase(&mut game, &mut queue, &registry, &phases); // wolf
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::plain(2, ActionKind::Skip)
        )
        .success);
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert!(game.player(3).unwrap().feared);

        advance_phase(&mut game, &mut queue, &registry, &phases); // discussion
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Vote);
        for seat in 1..=6 {
            assert!(submit_action(
                &mut game,
                &mut queue,
                &registry,
                &phases,
                &Action::targeted(seat, ActionKind::Vote, 3)
            )
            .success);
        }
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::DaySettle);
        assert!(!game.living(3), "fear does not grant exile immunity");
        assert_eq!(game.player(3).unwrap().out_reason, Some(DeathReason::Exile));
    }

    #[test]
    fn fear_on_a_packmate_does_not_cancel_the_shared_kill() {
        let (mut game, mut queue, registry, phases) = setup(&[
            Role::Nightmare,
            Role::Werewolf,
            Role::Werewolf,
            Role::Villager,
            Role::Villager,
            Role::Villager,
            Role::Villager,
            Role::Villager,
        ]);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Night(Role::Nightmare));
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Fear, 2)
        )
        .success);

        advance_phase(&mut game, &mut queue, &registry, &phases);
        // The unfeared wolf writes the vote; the kill is attributed to it.
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(3, ActionKind::Kill, 4)
        )
        .success);

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert!(!game.living(4), "the pack's kill lands despite the feared packmate");
        assert_eq!(game.player(4).unwrap().out_reason, Some(DeathReason::WolfKill));
        assert!(!game.finished);
    }

    #[test]
    fn day_interrupt_skips_the_exile_vote() {
        let (mut game, mut queue, registry, phases) = setup(&[
            Role::Knight,
            Role::Werewolf,
            Role::Villager,
            Role::Villager,
            Role::Seer,
        ]);
        game.election.completed = true;
        game.phase = phase_of(&phases, PhaseKind::Discussion);

        // A misfired duel kills the knight and ends the day.
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Duel, 3)
        )
        .success);
        assert!(!game.living(1));

        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::DaySettle, "the exile vote is skipped");
        assert!(r.messages.iter().any(|m| m.contains("nobody is exiled")));

        // The next round's vote is taken as usual.
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(game.round, 2);
        assert_eq!(r.kind, PhaseKind::Night(Role::Werewolf));
        assert!(!game.day_ended);
    }

    #[test]
    fn complete_pending_rejects_bad_ids_and_dead_targets() {
        let (mut game, mut queue, registry, _) =
            setup(&[Role::Hunter, Role::Werewolf, Role::Villager]);
        assert!(!complete_pending(&mut game, &mut queue, &registry, 99, 2).success);

        game.player_mut(1).unwrap().mark_dead(DeathReason::WolfKill);
        let id = queue.add(SkillEffect::kill(
            priority::DEFERRED,
            Timing::OnDeath,
            1,
            Target::Pending,
            DeathReason::HunterShot,
        ));
        game.player_mut(3).unwrap().mark_dead(DeathReason::Exile);
        assert!(!complete_pending(&mut game, &mut queue, &registry, id, 3).success);
        assert_eq!(queue.pending().count(), 1, "the shot is still owed");
    }

    #[test]
    fn feared_player_votes_but_cannot_duel() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Knight, Role::Werewolf, Role::Villager, Role::Villager]);
        game.player_mut(1).unwrap().feared = true;

        game.phase = phase_of(&phases, PhaseKind::Discussion);
        let out = submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Duel, 2),
        );
        assert!(!out.success);

        game.phase = phase_of(&phases, PhaseKind::Vote);
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Vote, 2)
        )
        .success);
    }

    #[test]
    fn sheriff_death_at_night_suspends_the_badge() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Villager, Role::Villager, Role::Seer]);
        game.sheriff = Some(3);
        game.election.completed = true;

        advance_phase(&mut game, &mut queue, &registry, &phases);
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Kill, 3)
        )
        .success);
        advance_phase(&mut game, &mut queue, &registry, &phases); // seer phase
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert_eq!(game.badge, BadgeState::PendingTransfer);
        assert!(vote::assign_badge(&mut game, Some(2)).success);
        assert_eq!(game.sheriff, Some(2));
    }

    #[test]
    fn wolf_parity_ends_the_game() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Werewolf, Role::Villager, Role::Villager, Role::Seer]);
        game.election.completed = true;

        advance_phase(&mut game, &mut queue, &registry, &phases);
        assert!(submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Kill, 5)
        )
        .success);
        advance_phase(&mut game, &mut queue, &registry, &phases); // seer phase skipped or acted
        let r = advance_phase(&mut game, &mut queue, &registry, &phases);
        assert_eq!(r.kind, PhaseKind::Settle);
        assert_eq!(game.winner, Some(Camp::Wolf), "two wolves against two villagers");
        assert!(game.finished);
    }

    #[test]
    fn no_actions_during_settlement_phases() {
        let (mut game, mut queue, registry, phases) =
            setup(&[Role::Werewolf, Role::Villager, Role::Villager]);
        game.phase = phase_of(&phases, PhaseKind::Settle);
        let out = submit_action(
            &mut game,
            &mut queue,
            &registry,
            &phases,
            &Action::targeted(1, ActionKind::Kill, 2),
        );
        assert!(!out.success);
    }
}
