//! Day action handlers: the knight's duel and the wolf self-destruct.

use super::{Action, ActionKind, ActionOutcome};
use crate::effect::{priority, DeathReason, SkillEffect, Target, Timing};
use crate::game::{BadgeState, Game};
use crate::role::{Camp, Role, RoleRegistry};

/// Dispatches one day submission.
pub fn handle_day_action(
    game: &mut Game,
    registry: &RoleRegistry,
    action: &Action,
) -> ActionOutcome {
    let Some(actor) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    let role = actor.role;

    if !registry.acts_by_day(role) {
        return ActionOutcome::fail("this role has no day action");
    }

    match (role, action.kind) {
        (Role::Knight, ActionKind::Duel) => knight_duel(game, action),
        (r, ActionKind::SelfDestruct) if r.camp() == Camp::Wolf => self_destruct(game, action),
        _ => ActionOutcome::fail("invalid action for this role"),
    }
}

/// The duel target's camp decides which duelist dies: a wolf target dies,
/// a good target costs the knight his life.
fn knight_duel(game: &mut Game, action: &Action) -> ActionOutcome {
    let Some(target) = action.target else {
        return ActionOutcome::fail("target required");
    };
    if !game.living(target) {
        return ActionOutcome::fail("target is dead or does not exist");
    }
    if target == action.actor {
        return ActionOutcome::fail("cannot duel yourself");
    }
    let Some(knight) = game.player(action.actor) else {
        return ActionOutcome::fail("no such seat");
    };
    if knight.ability.duel_used {
        return ActionOutcome::fail("the duel has already been fought");
    }

    let target_is_wolf = game.player(target).is_some_and(|p| p.camp == Camp::Wolf);
    let loser = if target_is_wolf { target } else { action.actor };

    if let Some(p) = game.player_mut(action.actor) {
        p.ability.duel_used = true;
    }
    ActionOutcome::with_effect(
        format!("seat {} falls in the duel", loser),
        SkillEffect::kill(
            priority::DEFERRED,
            Timing::Day,
            action.actor,
            Target::Player(loser),
            DeathReason::Duel,
        ),
    )
}

/// Any living wolf may detonate. The blast kills only the actor; a sheriff's
/// badge goes into pending assignment for the moderator to resolve. The
/// white wolf king's claw fires afterwards through his death trigger.
fn self_destruct(game: &mut Game, action: &Action) -> ActionOutcome {
    if game.is_sheriff(action.actor) {
        game.badge = BadgeState::PendingAssign;
    }
    ActionOutcome::with_effect(
        format!("seat {} self-destructs", action.actor),
        SkillEffect::kill(
            priority::DEFERRED,
            Timing::Day,
            action.actor,
            Target::Player(action.actor),
            DeathReason::SelfDestruct,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Target;
    use crate::game::Player;

    fn game_of(roles: &[Role]) -> Game {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, r)| Player::new(i as u32 + 1, *r))
            .collect();
        Game::new(players)
    }

    #[test]
    fn duel_against_wolf_kills_the_wolf() {
        let mut game = game_of(&[Role::Knight, Role::Werewolf, Role::Villager]);
        let r = RoleRegistry::standard();

        let out = handle_day_action(&mut game, &r, &Action::targeted(1, ActionKind::Duel, 2));
        assert!(out.success);
        let effect = out.effect.unwrap();
        assert_eq!(effect.target, Target::Player(2));
        assert_eq!(effect.reason, Some(DeathReason::Duel));
    }

    #[test]
    fn duel_against_good_kills_the_knight() {
        let mut game = game_of(&[Role::Knight, Role::Werewolf, Role::Villager]);
        let r = RoleRegistry::standard();

        let out = handle_day_action(&mut game, &r, &Action::targeted(1, ActionKind::Duel, 3));
        assert!(out.success);
        assert_eq!(out.effect.unwrap().target, Target::Player(1));
    }

    #[test]
    fn duel_is_single_use() {
        let mut game = game_of(&[Role::Knight, Role::Werewolf, Role::Werewolf]);
        let r = RoleRegistry::standard();

        assert!(handle_day_action(&mut game, &r, &Action::targeted(1, ActionKind::Duel, 2)).success);
        let again = handle_day_action(&mut game, &r, &Action::targeted(1, ActionKind::Duel, 3));
        assert!(!again.success);
    }

    #[test]
    fn self_destruct_kills_only_the_actor() {
        let mut game = game_of(&[Role::Werewolf, Role::Villager]);
        let r = RoleRegistry::standard();

        let out = handle_day_action(&mut game, &r, &Action::plain(1, ActionKind::SelfDestruct));
        assert!(out.success);
        let effect = out.effect.unwrap();
        assert_eq!(effect.target, Target::Player(1));
        assert_eq!(effect.reason, Some(DeathReason::SelfDestruct));
        assert_eq!(game.badge, BadgeState::Normal);
    }

    #[test]
    fn sheriff_self_destruct_suspends_the_badge() {
        let mut game = game_of(&[Role::Werewolf, Role::Villager]);
        game.sheriff = Some(1);
        let r = RoleRegistry::standard();

        let out = handle_day_action(&mut game, &r, &Action::plain(1, ActionKind::SelfDestruct));
        assert!(out.success);
        assert_eq!(game.badge, BadgeState::PendingAssign);
    }

    #[test]
    fn good_players_cannot_self_destruct() {
        let mut game = game_of(&[Role::Villager, Role::Werewolf]);
        let r = RoleRegistry::standard();
        let out = handle_day_action(&mut game, &r, &Action::plain(1, ActionKind::SelfDestruct));
        assert!(!out.success);
    }
}
