//! Skill effect records and the settlement queue.
//!
//! Every role action that lands becomes one [`SkillEffect`], queued until the
//! next settlement boundary. Execution order is the integer priority with
//! stable insertion order as the tie-break. A kill's immunity class is the
//! explicit [`DeathReason`] on the record; the priority number orders
//! execution and nothing else, so renumbering priorities can never silently
//! change which protections apply.

pub mod resolve;

pub use resolve::{BlockedEffect, SettleOutcome};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::PlayerId;

/// Why a player died (or would have). Carried on kill effects and folded
/// into `Player.out_reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathReason {
    /// The ordinary shared wolf kill. The only reason guard or dream
    /// protection blocks, and the only reason the witch's antidote cures.
    WolfKill,
    Poison,
    /// Dreamer visited the same target twice in a row.
    DreamKill,
    Duel,
    SelfDestruct,
    /// Black or white wolf king's claw.
    Claw,
    Exile,
    HunterShot,
    /// Dragged down by a charm link.
    Linked,
}

impl DeathReason {
    /// Returns the lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            DeathReason::WolfKill => "wolf kill",
            DeathReason::Poison => "poison",
            DeathReason::DreamKill => "dream kill",
            DeathReason::Duel => "duel",
            DeathReason::SelfDestruct => "self-destruct",
            DeathReason::Claw => "claw",
            DeathReason::Exile => "exile",
            DeathReason::HunterShot => "hunter shot",
            DeathReason::Linked => "linked death",
        }
    }

    /// Death reasons that suppress on-death triggers (a poisoned hunter
    /// never shoots).
    pub const fn suppresses_death_trigger(self) -> bool {
        matches!(self, DeathReason::Poison)
    }
}

/// What an effect does when it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Kill,
    Protect,
    DreamProtect,
    Save,
    Check,
    Link,
    Fear,
    Petrify,
}

impl EffectKind {
    /// Kinds that are no-ops against a dead target.
    pub const fn requires_living_target(self) -> bool {
        match self {
            EffectKind::Kill
            | EffectKind::Protect
            | EffectKind::DreamProtect
            | EffectKind::Check
            | EffectKind::Link
            | EffectKind::Fear
            | EffectKind::Petrify => true,
            // The save's target is the pending-death victim, who is still
            // alive until deaths fold.
            EffectKind::Save => false,
        }
    }

    /// Kinds a petrified target is immune to.
    pub const fn blocked_by_petrify(self) -> bool {
        matches!(self, EffectKind::Kill | EffectKind::Check | EffectKind::Link)
    }
}

/// When an effect is eligible to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timing {
    Night,
    Day,
    /// Death-triggered; runs in whichever settlement it is completed in.
    OnDeath,
}

/// An effect's target: a seat, or a sentinel awaiting moderator input
/// (hunter shot, wolf-king claw).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Player(PlayerId),
    Pending,
}

impl Target {
    /// Returns the seat if resolved.
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Target::Player(id) => Some(id),
            Target::Pending => None,
        }
    }
}

/// Why an effect did not take hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// Target is dead (or the seat does not exist).
    DeadTarget,
    /// Target is petrified.
    Immune,
    /// Target is protected from the ordinary wolf kill.
    Protected,
    /// Actor is feared or petrified and cannot act.
    Incapacitated,
    /// The effect's precondition no longer holds (e.g. a save with no
    /// matching pending death).
    Precondition,
    /// An unrevealed idiot survives the exile by revealing.
    IdiotReveal,
    /// Timing class did not match the settlement.
    WrongTiming,
}

impl BlockReason {
    /// Returns the lowercase display name.
    pub const fn name(self) -> &'static str {
        match self {
            BlockReason::DeadTarget => "dead target",
            BlockReason::Immune => "immune",
            BlockReason::Protected => "protected",
            BlockReason::Incapacitated => "incapacitated",
            BlockReason::Precondition => "precondition failed",
            BlockReason::IdiotReveal => "idiot revealed",
            BlockReason::WrongTiming => "wrong timing",
        }
    }
}

/// Execution priorities. These order effects within one settlement pass and
/// carry no other meaning.
pub mod priority {
    pub const PETRIFY: u16 = 100;
    pub const FEAR: u16 = 120;
    pub const ROLE_CHECK: u16 = 150;
    pub const GUARD: u16 = 200;
    pub const DREAM: u16 = 210;
    pub const WOLF_KILL: u16 = 300;
    pub const CAMP_CHECK: u16 = 310;
    pub const CHARM: u16 = 320;
    pub const SAVE: u16 = 400;
    pub const POISON: u16 = 410;
    pub const EXILE: u16 = 500;
    pub const DEFERRED: u16 = 600;
}

/// One queued skill effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEffect {
    /// Assigned by the queue on insertion.
    pub id: u32,
    pub kind: EffectKind,
    /// Set on kills only.
    pub reason: Option<DeathReason>,
    pub priority: u16,
    pub timing: Timing,
    pub actor: PlayerId,
    pub target: Target,
    pub executed: bool,
    pub blocked: Option<BlockReason>,
    /// Effect-specific data, e.g. a check result.
    pub payload: Option<Value>,
}

impl SkillEffect {
    fn new(kind: EffectKind, priority: u16, timing: Timing, actor: PlayerId, target: Target) -> Self {
        SkillEffect {
            id: 0,
            kind,
            reason: None,
            priority,
            timing,
            actor,
            target,
            executed: false,
            blocked: None,
            payload: None,
        }
    }

    /// A kill effect with its explicit death reason.
    pub fn kill(
        priority: u16,
        timing: Timing,
        actor: PlayerId,
        target: Target,
        reason: DeathReason,
    ) -> Self {
        let mut e = Self::new(EffectKind::Kill, priority, timing, actor, target);
        e.reason = Some(reason);
        e
    }

    /// Guard protection for one night.
    pub fn protect(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Protect, priority::GUARD, Timing::Night, actor, Target::Player(target))
    }

    /// Dreamer protection for one night.
    pub fn dream_protect(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::DreamProtect, priority::DREAM, Timing::Night, actor, Target::Player(target))
    }

    /// The witch's antidote.
    pub fn save(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Save, priority::SAVE, Timing::Night, actor, Target::Player(target))
    }

    /// A camp or exact-role check; the result is attached at resolution.
    pub fn check(priority: u16, actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Check, priority, Timing::Night, actor, Target::Player(target))
    }

    /// The wolf beauty's charm link.
    pub fn link(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Link, priority::CHARM, Timing::Night, actor, Target::Player(target))
    }

    /// The nightmare's fear.
    pub fn fear(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Fear, priority::FEAR, Timing::Night, actor, Target::Player(target))
    }

    /// The medusa's petrification.
    pub fn petrify(actor: PlayerId, target: PlayerId) -> Self {
        Self::new(EffectKind::Petrify, priority::PETRIFY, Timing::Night, actor, Target::Player(target))
    }

    /// True if this effect awaits a moderator-supplied target.
    pub fn is_pending(&self) -> bool {
        self.target == Target::Pending
    }
}

/// The priority-ordered effect queue: the resolution engine's two entry
/// points are [`EffectQueue::add`] and [`EffectQueue::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectQueue {
    effects: Vec<SkillEffect>,
    next_id: u32,
}

impl EffectQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns an id, inserts, and re-sorts by priority. The sort is stable,
    /// so equal priorities keep submission order.
    pub fn add(&mut self, mut effect: SkillEffect) -> u32 {
        self.next_id += 1;
        effect.id = self.next_id;
        let id = effect.id;
        self.effects.push(effect);
        self.effects.sort_by_key(|e| e.priority);
        id
    }

    /// The queued effects in execution order.
    pub fn effects(&self) -> &[SkillEffect] {
        &self.effects
    }

    /// True if the actor already has a queued effect of this kind. Used by
    /// the dispatcher's double-submission guard.
    pub fn has_queued(&self, actor: PlayerId, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.actor == actor && e.kind == kind)
    }

    /// Effects still awaiting a moderator-supplied target.
    pub fn pending(&self) -> impl Iterator<Item = &SkillEffect> {
        self.effects.iter().filter(|e| e.is_pending())
    }

    /// Removes and returns a pending effect with its target filled in.
    /// Returns `None` if the id is unknown or the effect is not pending.
    pub fn take_pending(&mut self, id: u32, target: PlayerId) -> Option<SkillEffect> {
        let idx = self.effects.iter().position(|e| e.id == id && e.is_pending())?;
        let mut effect = self.effects.remove(idx);
        effect.target = Target::Player(target);
        Some(effect)
    }
}
