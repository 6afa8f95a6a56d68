//! Exile vote and sheriff election.
//!
//! Two structurally similar mini state machines sharing the weighted tally:
//! the current sheriff's ballot weighs 1.5, everyone else's 1.0, and only a
//! strict maximum decides. The sheriff badge lifecycle lives here too, since
//! both machines and the flow controller touch it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ability::ActionOutcome;
use crate::game::{BadgeState, Game, PlayerId};

/// Exile-vote sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExileStage {
    Voting,
    /// Tie-break runoff restricted to the tied seats.
    Pk,
    Done,
}

/// The day's exile vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExileVote {
    pub stage: ExileStage,
    ballots: BTreeMap<PlayerId, Option<PlayerId>>,
    /// Tied seats eligible in the runoff.
    pub pk: Vec<PlayerId>,
    /// `Some(Some(id))` exiles a seat, `Some(None)` exiles nobody.
    pub result: Option<Option<PlayerId>>,
}

impl ExileVote {
    /// A fresh vote in the voting stage.
    pub fn new() -> Self {
        ExileVote {
            stage: ExileStage::Voting,
            ballots: BTreeMap::new(),
            pk: Vec::new(),
            result: None,
        }
    }

    /// Resets for the next round's vote.
    pub fn reset(&mut self) {
        *self = ExileVote::new();
    }

    /// The recorded ballots.
    pub fn ballots(&self) -> &BTreeMap<PlayerId, Option<PlayerId>> {
        &self.ballots
    }
}

impl Default for ExileVote {
    fn default() -> Self {
        Self::new()
    }
}

/// Sheriff-election sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStage {
    Signup,
    Campaign,
    Voting,
    /// Tie awaiting the moderator's badge assignment.
    Tie,
    Done,
}

/// The round-one sheriff election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub stage: ElectionStage,
    pub candidates: Vec<PlayerId>,
    pub withdrawn: Vec<PlayerId>,
    ballots: BTreeMap<PlayerId, Option<PlayerId>>,
    pub tied: Vec<PlayerId>,
    /// Set once the election is over (elected, skipped, or abandoned); the
    /// flow controller skips the phase afterwards.
    pub completed: bool,
}

impl Election {
    /// A fresh election in the signup stage.
    pub fn new() -> Self {
        Election {
            stage: ElectionStage::Signup,
            candidates: Vec::new(),
            withdrawn: Vec::new(),
            ballots: BTreeMap::new(),
            tied: Vec::new(),
            completed: false,
        }
    }
}

impl Default for Election {
    fn default() -> Self {
        Self::new()
    }
}

/// Ballot weight: 1.5 for the sitting sheriff, 1.0 otherwise.
pub fn ballot_weight(game: &Game, voter: PlayerId) -> f64 {
    if game.is_sheriff(voter) {
        1.5
    } else {
        1.0
    }
}

/// Sums weighted ballots per target and returns the seats holding the strict
/// maximum (one seat means a clean result, several mean a tie, empty means
/// nobody received a vote).
fn weighted_maximum(game: &Game, ballots: &BTreeMap<PlayerId, Option<PlayerId>>) -> Vec<PlayerId> {
    let mut tally: BTreeMap<PlayerId, f64> = BTreeMap::new();
    for (&voter, &choice) in ballots {
        if let Some(target) = choice {
            *tally.entry(target).or_insert(0.0) += ballot_weight(game, voter);
        }
    }
    let Some(max) = tally.values().cloned().fold(None, |acc: Option<f64>, w| {
        Some(acc.map_or(w, |m| if w > m { w } else { m }))
    }) else {
        return Vec::new();
    };
    tally
        .iter()
        .filter(|(_, &w)| w == max)
        .map(|(&id, _)| id)
        .collect()
}

// ---------------------------------------------------------------------------
// Exile vote
// ---------------------------------------------------------------------------

/// Seats allowed to vote in the current exile stage.
fn exile_voters(game: &Game) -> Vec<PlayerId> {
    game.players()
        .iter()
        .filter(|p| p.may_vote())
        .filter(|p| game.exile.stage != ExileStage::Pk || !game.exile.pk.contains(&p.id))
        .map(|p| p.id)
        .collect()
}

/// Casts an exile ballot (`None` abstains). Once every eligible voter has
/// voted the tally runs automatically: a clean maximum finishes the vote, a
/// tie opens the runoff, and a tied runoff exiles nobody.
pub fn cast_exile(game: &mut Game, voter: PlayerId, target: Option<PlayerId>) -> ActionOutcome {
    if game.exile.stage == ExileStage::Done {
        return ActionOutcome::fail("the vote is over");
    }
    if !game.player(voter).is_some_and(|p| p.may_vote()) {
        return ActionOutcome::fail("you may not vote");
    }
    if game.exile.stage == ExileStage::Pk && game.exile.pk.contains(&voter) {
        return ActionOutcome::fail("tied candidates do not vote in the runoff");
    }
    if let Some(t) = target {
        if !game.living(t) {
            return ActionOutcome::fail("target is dead or does not exist");
        }
        if game.exile.stage == ExileStage::Pk && !game.exile.pk.contains(&t) {
            return ActionOutcome::fail("runoff ballots must name a tied candidate");
        }
    }

    game.exile.ballots.insert(voter, target);

    let voters = exile_voters(game);
    if voters.iter().all(|v| game.exile.ballots.contains_key(v)) {
        tally_exile(game);
    }
    ActionOutcome::ok("ballot recorded")
}

fn tally_exile(game: &mut Game) {
    let max_set = weighted_maximum(game, &game.exile.ballots);
    match (game.exile.stage, max_set.len()) {
        (_, 0) => {
            game.exile.result = Some(None);
            game.exile.stage = ExileStage::Done;
        }
        (_, 1) => {
            game.exile.result = Some(Some(max_set[0]));
            game.exile.stage = ExileStage::Done;
        }
        (ExileStage::Voting, _) => {
            tracing::debug!(tied = ?max_set, "exile vote tied, entering runoff");
            game.exile.stage = ExileStage::Pk;
            game.exile.pk = max_set;
            game.exile.ballots.clear();
        }
        // A second tie exiles nobody.
        (ExileStage::Pk, _) => {
            game.exile.result = Some(None);
            game.exile.stage = ExileStage::Done;
        }
        (ExileStage::Done, _) => {}
    }
}

/// Forces the vote to a conclusion at the settlement boundary and returns
/// the exiled seat, if any. An unresolved tie at this point exiles nobody.
pub fn finalize_exile(game: &mut Game) -> Option<PlayerId> {
    if game.exile.stage != ExileStage::Done {
        let max_set = weighted_maximum(game, &game.exile.ballots);
        game.exile.result = Some(if max_set.len() == 1 { Some(max_set[0]) } else { None });
        game.exile.stage = ExileStage::Done;
    }
    game.exile.result.flatten()
}

// ---------------------------------------------------------------------------
// Sheriff election
// ---------------------------------------------------------------------------

/// Toggles candidacy during signup.
pub fn signup_toggle(game: &mut Game, id: PlayerId) -> ActionOutcome {
    if game.election.stage != ElectionStage::Signup {
        return ActionOutcome::fail("signup is closed");
    }
    if !game.living(id) {
        return ActionOutcome::fail("dead players cannot run");
    }
    if let Some(pos) = game.election.candidates.iter().position(|&c| c == id) {
        game.election.candidates.remove(pos);
        ActionOutcome::ok("candidacy withdrawn")
    } else {
        game.election.candidates.push(id);
        ActionOutcome::ok("running for sheriff")
    }
}

/// Closes signup. Zero candidates skips the election entirely; exactly one
/// is elected unopposed.
pub fn begin_campaign(game: &mut Game) {
    if game.election.stage != ElectionStage::Signup {
        return;
    }
    game.election.stage = ElectionStage::Campaign;
    apply_auto_resolution(game);
}

/// Withdraws a candidate during the campaign; the zero/one auto-resolution
/// rules are reapplied.
pub fn withdraw(game: &mut Game, id: PlayerId) -> ActionOutcome {
    if game.election.stage != ElectionStage::Campaign {
        return ActionOutcome::fail("withdrawal is only possible during the campaign");
    }
    let Some(pos) = game.election.candidates.iter().position(|&c| c == id) else {
        return ActionOutcome::fail("not a candidate");
    };
    game.election.candidates.remove(pos);
    game.election.withdrawn.push(id);
    apply_auto_resolution(game);
    ActionOutcome::ok("withdrawn")
}

fn apply_auto_resolution(game: &mut Game) {
    match game.election.candidates.len() {
        0 => {
            tracing::debug!("no sheriff candidates, skipping the election");
            game.election.stage = ElectionStage::Done;
            game.election.completed = true;
        }
        1 => {
            let only = game.election.candidates[0];
            elect(game, only);
        }
        _ => {}
    }
}

/// Opens the ballot box.
pub fn begin_voting(game: &mut Game) {
    if game.election.stage == ElectionStage::Campaign {
        game.election.stage = ElectionStage::Voting;
    }
}

/// Seats allowed to vote in the election: living non-candidates who never
/// withdrew.
fn election_voters(game: &Game) -> Vec<PlayerId> {
    game.players()
        .iter()
        .filter(|p| p.may_vote())
        .filter(|p| !game.election.candidates.contains(&p.id))
        .filter(|p| !game.election.withdrawn.contains(&p.id))
        .map(|p| p.id)
        .collect()
}

/// Casts an election ballot (`None` abstains). A tie transitions to the
/// `Tie` stage, which only the moderator's badge assignment resolves.
pub fn cast_election(game: &mut Game, voter: PlayerId, target: Option<PlayerId>) -> ActionOutcome {
    if game.election.stage != ElectionStage::Voting {
        return ActionOutcome::fail("the election is not taking votes");
    }
    if !election_voters(game).contains(&voter) {
        return ActionOutcome::fail("you may not vote in the election");
    }
    if let Some(t) = target {
        if !game.election.candidates.contains(&t) {
            return ActionOutcome::fail("ballots must name a candidate");
        }
    }

    game.election.ballots.insert(voter, target);

    let voters = election_voters(game);
    if voters.iter().all(|v| game.election.ballots.contains_key(v)) {
        tally_election(game);
    }
    ActionOutcome::ok("ballot recorded")
}

fn tally_election(game: &mut Game) {
    let max_set = weighted_maximum(game, &game.election.ballots);
    match max_set.len() {
        0 => {
            game.election.stage = ElectionStage::Done;
            game.election.completed = true;
        }
        1 => elect(game, max_set[0]),
        _ => {
            tracing::debug!(tied = ?max_set, "sheriff election tied");
            game.election.stage = ElectionStage::Tie;
            game.election.tied = max_set;
        }
    }
}

fn elect(game: &mut Game, id: PlayerId) {
    game.sheriff = Some(id);
    game.badge = BadgeState::Normal;
    game.election.stage = ElectionStage::Done;
    game.election.completed = true;
    tracing::debug!(sheriff = id, "sheriff elected");
}

// ---------------------------------------------------------------------------
// Badge lifecycle
// ---------------------------------------------------------------------------

/// Moves the badge into the state an ordinary sheriff death demands.
/// Self-destruct sets `PendingAssign` at submission instead.
pub fn on_sheriff_death(game: &mut Game) {
    if game.badge == BadgeState::Normal && game.sheriff.is_some() {
        game.badge = BadgeState::PendingTransfer;
    }
}

/// The moderator's privileged assignment operation.
///
/// Resolves whichever decision is outstanding: a tied election, a pending
/// badge transfer, or a pending assignment. `None` destroys the badge; doing
/// so while an election tie is outstanding also force-completes the
/// election.
pub fn assign_badge(game: &mut Game, choice: Option<PlayerId>) -> ActionOutcome {
    if game.election.stage == ElectionStage::Tie {
        return match choice {
            Some(id) => {
                if !game.election.tied.contains(&id) {
                    return ActionOutcome::fail("the badge must go to a tied candidate");
                }
                elect(game, id);
                ActionOutcome::ok("tie resolved")
            }
            None => {
                game.election.stage = ElectionStage::Done;
                game.election.completed = true;
                game.sheriff = None;
                game.badge = BadgeState::Destroyed;
                ActionOutcome::ok("badge destroyed, election abandoned")
            }
        };
    }

    match game.badge {
        BadgeState::PendingTransfer | BadgeState::PendingAssign => match choice {
            Some(id) => {
                if !game.living(id) {
                    return ActionOutcome::fail("the badge must go to a living player");
                }
                game.sheriff = Some(id);
                game.badge = BadgeState::Normal;
                ActionOutcome::ok("badge transferred")
            }
            None => {
                game.sheriff = None;
                game.badge = BadgeState::Destroyed;
                ActionOutcome::ok("badge destroyed")
            }
        },
        _ => ActionOutcome::fail("no badge decision is pending"),
    }
}
