//! Legal target enumeration.
//!
//! Drives target-selection UIs and bots. Kept consistent with what the
//! night/day handlers would accept, so a listed target never bounces.

use crate::game::{Game, PlayerId};
use crate::role::{Camp, Role, RoleRegistry};

/// Returns the seats the given player could legally target with their
/// role's own action right now. Roles without a targeted action get an
/// empty list.
pub fn valid_targets(game: &Game, registry: &RoleRegistry, id: PlayerId) -> Vec<PlayerId> {
    let Some(player) = game.player(id) else {
        return Vec::new();
    };
    if !player.alive {
        return Vec::new();
    }
    if registry.spec(player.role).is_none() {
        return Vec::new();
    }

    let living_others = || -> Vec<PlayerId> {
        game.alive_players().map(|p| p.id).filter(|&t| t != id).collect()
    };

    match player.role {
        Role::Werewolf | Role::BlackWolfKing | Role::WhiteWolfKing => {
            game.alive_players().map(|p| p.id).collect()
        }
        Role::Seer | Role::Gargoyle | Role::Dreamer | Role::Nightmare | Role::Medusa => {
            living_others()
        }
        Role::Guard => game
            .alive_players()
            .map(|p| p.id)
            .filter(|&t| player.ability.last_guarded != Some(t))
            .collect(),
        Role::Witch => witch_targets(game, player.id),
        Role::WolfBeauty => game
            .alive_players()
            .filter(|p| p.camp != Camp::Wolf)
            .map(|p| p.id)
            .filter(|&t| t != id)
            .collect(),
        Role::Knight => {
            if player.ability.duel_used {
                Vec::new()
            } else {
                living_others()
            }
        }
        Role::Villager | Role::Hunter | Role::Idiot => Vec::new(),
    }
}

/// The witch may save tonight's victim and poison anyone else alive,
/// resources permitting.
fn witch_targets(game: &Game, id: PlayerId) -> Vec<PlayerId> {
    let Some(witch) = game.player(id) else {
        return Vec::new();
    };
    let mut targets = Vec::new();

    let save_legal = witch.ability.antidote && !(game.round == 1 && game.no_first_night_save);
    if save_legal {
        if let Some(victim) = game.wolf_target {
            if game.living(victim) {
                targets.push(victim);
            }
        }
    }
    if witch.ability.poison {
        for p in game.alive_players() {
            if p.id != id && !targets.contains(&p.id) {
                targets.push(p.id);
            }
        }
    }
    targets.sort_unstable();
    targets
}
