//! The ability dispatcher.
//!
//! Turns one player's submitted action (or a death event) into at most one
//! skill effect, after validating target legality against the current game
//! state. Handlers are grouped by timing the way the phase flow invokes
//! them: night actions, day actions, and death triggers, plus the
//! target-enumeration helper that drives selection UIs and bots.

pub mod day;
pub mod death;
pub mod night;
pub mod targets;

pub use day::handle_day_action;
pub use death::on_death;
pub use night::handle_night_action;
pub use targets::valid_targets;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::effect::SkillEffect;
use crate::game::PlayerId;

/// What a submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Wolf-camp shared kill vote.
    Kill,
    /// Seer or gargoyle check.
    Check,
    /// Witch antidote.
    Save,
    /// Witch poison.
    Poison,
    /// Guard protection.
    Protect,
    /// Dreamer visit.
    Dream,
    /// Nightmare fear.
    Fear,
    /// Medusa petrification.
    Petrify,
    /// Wolf beauty charm.
    Charm,
    /// Knight duel (day).
    Duel,
    /// Wolf self-destruct (day).
    SelfDestruct,
    /// Explicit no-op for skippable roles and feared players.
    Skip,
    /// Ballot in the exile vote or sheriff election.
    Vote,
    /// Sheriff election candidacy toggle.
    Signup,
    /// Sheriff election withdrawal during the campaign.
    Withdraw,
}

impl ActionKind {
    /// Returns the lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            ActionKind::Kill => "kill",
            ActionKind::Check => "check",
            ActionKind::Save => "save",
            ActionKind::Poison => "poison",
            ActionKind::Protect => "protect",
            ActionKind::Dream => "dream",
            ActionKind::Fear => "fear",
            ActionKind::Petrify => "petrify",
            ActionKind::Charm => "charm",
            ActionKind::Duel => "duel",
            ActionKind::SelfDestruct => "self-destruct",
            ActionKind::Skip => "skip",
            ActionKind::Vote => "vote",
            ActionKind::Signup => "signup",
            ActionKind::Withdraw => "withdraw",
        }
    }

    /// Parses an action from its display name.
    pub fn from_name(s: &str) -> Option<ActionKind> {
        const ALL: [ActionKind; 15] = [
            ActionKind::Kill,
            ActionKind::Check,
            ActionKind::Save,
            ActionKind::Poison,
            ActionKind::Protect,
            ActionKind::Dream,
            ActionKind::Fear,
            ActionKind::Petrify,
            ActionKind::Charm,
            ActionKind::Duel,
            ActionKind::SelfDestruct,
            ActionKind::Skip,
            ActionKind::Vote,
            ActionKind::Signup,
            ActionKind::Withdraw,
        ];
        ALL.into_iter().find(|k| k.name() == s)
    }
}

/// One authenticated submission routed in from the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub actor: PlayerId,
    pub kind: ActionKind,
    pub target: Option<PlayerId>,
}

impl Action {
    /// Creates an action with a target.
    pub fn targeted(actor: PlayerId, kind: ActionKind, target: PlayerId) -> Self {
        Action { actor, kind, target: Some(target) }
    }

    /// Creates a targetless action (skip, signup, abstain).
    pub fn plain(actor: PlayerId, kind: ActionKind) -> Self {
        Action { actor, kind, target: None }
    }
}

/// Result of dispatching one action: a failure message, or an optional
/// effect to queue plus optional data for the caller.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub effect: Option<SkillEffect>,
    pub data: Option<Value>,
}

impl ActionOutcome {
    /// A failed validation; game state is unchanged.
    pub fn fail(message: impl Into<String>) -> Self {
        ActionOutcome { success: false, message: message.into(), ..Default::default() }
    }

    /// A successful no-op (skip or vote-style bookkeeping).
    pub fn ok(message: impl Into<String>) -> Self {
        ActionOutcome { success: true, message: message.into(), ..Default::default() }
    }

    /// A success that queues an effect.
    pub fn with_effect(message: impl Into<String>, effect: SkillEffect) -> Self {
        ActionOutcome {
            success: true,
            message: message.into(),
            effect: Some(effect),
            data: None,
        }
    }
}
