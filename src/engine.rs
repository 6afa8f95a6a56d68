//! Moderator session management.
//!
//! This is the line-oriented surface a moderator client drives: one command
//! per line in, one JSON object per line out. The session holds the game
//! aggregate, the effect queue, the role registry, and the generated phase
//! list, and routes commands into the flow controller.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;

use crate::ability::{Action, ActionKind};
use crate::config::{ConfigError, PhaseKind, PhaseSpec, RoomConfig};
use crate::effect::EffectQueue;
use crate::flow;
use crate::game::Game;
use crate::role::RoleRegistry;
use crate::vote;

/// A malformed or inapplicable command line.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error("unknown action {0:?}")]
    BadAction(String),
    #[error("no game in progress")]
    NoGame,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A parsed moderator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a fresh room: `newgame <players> [seed]`.
    NewGame { players: usize, seed: Option<u64> },

    /// Relay a player submission: `act <seat> <action> [target]`.
    Act(Action),

    /// Move to the next phase: `advance`.
    Advance,

    /// Complete a pending death skill: `complete <effect> <target>`.
    Complete { effect: u32, target: u32 },

    /// Resolve a badge decision: `assignbadge <seat>` or `assignbadge destroy`.
    AssignBadge(Option<u32>),

    /// Dump the current room snapshot: `state`.
    State,

    /// Dump the action history: `history`.
    History,

    /// End the session: `quit`.
    Quit,
}

fn number<T: FromStr>(token: &str) -> Result<T, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::BadNumber(token.to_string()))
}

/// Parses a single line into a [`Command`]. Returns `None` for blank lines.
pub fn parse_command(line: &str) -> Option<Result<Command, CommandError>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (&head, rest) = tokens.split_first()?;
    Some(parse_tokens(head, rest))
}

fn parse_tokens(head: &str, rest: &[&str]) -> Result<Command, CommandError> {
    match head {
        "advance" => Ok(Command::Advance),
        "state" => Ok(Command::State),
        "history" => Ok(Command::History),
        "quit" => Ok(Command::Quit),

        "newgame" => match rest {
            [players] => Ok(Command::NewGame { players: number(players)?, seed: None }),
            [players, seed] => Ok(Command::NewGame {
                players: number(players)?,
                seed: Some(number(seed)?),
            }),
            _ => Err(CommandError::Usage("newgame <players> [seed]")),
        },

        "act" => match rest {
            [seat, kind] => Ok(Command::Act(Action::plain(number(seat)?, action_kind(kind)?))),
            [seat, kind, target] => Ok(Command::Act(Action::targeted(
                number(seat)?,
                action_kind(kind)?,
                number(target)?,
            ))),
            _ => Err(CommandError::Usage("act <seat> <action> [target]")),
        },

        "complete" => match rest {
            [effect, target] => Ok(Command::Complete {
                effect: number(effect)?,
                target: number(target)?,
            }),
            _ => Err(CommandError::Usage("complete <effect> <target>")),
        },

        "assignbadge" => match rest {
            ["destroy"] => Ok(Command::AssignBadge(None)),
            [seat] => Ok(Command::AssignBadge(Some(number(seat)?))),
            _ => Err(CommandError::Usage("assignbadge <seat>|destroy")),
        },

        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn action_kind(token: &str) -> Result<ActionKind, CommandError> {
    ActionKind::from_name(token).ok_or_else(|| CommandError::BadAction(token.to_string()))
}

/// One live room plus its resolution machinery.
struct Session {
    game: Game,
    queue: EffectQueue,
    registry: RoleRegistry,
    phases: Vec<PhaseSpec>,
}

/// Holds the mutable state of the moderator session between commands.
pub struct Engine {
    session: Option<Session>,
}

impl Engine {
    /// Creates an engine with no game in progress.
    pub fn new() -> Self {
        Engine { session: None }
    }

    /// Runs the command loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        for line in input.lines() {
            if !self.handle_line(&line?, &mut out)? {
                break;
            }
        }
        Ok(())
    }

    /// Handles one input line, writing exactly one JSON response for every
    /// non-blank line. Returns `false` once the session should end.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        let Some(parsed) = parse_command(line) else {
            return Ok(true);
        };
        let response = match parsed {
            Ok(Command::Quit) => {
                writeln!(out, "{}", json!({ "ok": true, "bye": true }))?;
                out.flush()?;
                return Ok(false);
            }
            Ok(command) => self.dispatch(command),
            Err(e) => Err(e),
        };
        let body = response.unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }));
        writeln!(out, "{}", body)?;
        out.flush()?;
        Ok(true)
    }

    fn dispatch(&mut self, command: Command) -> Result<Value, CommandError> {
        match command {
            Command::NewGame { players, seed } => self.new_game(players, seed),
            Command::Act(action) => self.act(&action),
            Command::Advance => self.advance(),
            Command::Complete { effect, target } => self.complete(effect, target),
            Command::AssignBadge(choice) => self.assign_badge(choice),
            Command::State => self.state(),
            Command::History => self.history(),
            Command::Quit => unreachable!("quit is handled by the loop"),
        }
    }

    fn session(&mut self) -> Result<&mut Session, CommandError> {
        self.session.as_mut().ok_or(CommandError::NoGame)
    }

    fn new_game(&mut self, players: usize, seed: Option<u64>) -> Result<Value, CommandError> {
        let config = RoomConfig::sized(players)
            .ok_or(CommandError::Usage("newgame <players between 6 and 18> [seed]"))?;
        let registry = RoleRegistry::standard();
        let game = config.build_game(&registry, seed)?;
        let phases = config.phases(&registry);

        let deal: Vec<Value> = game
            .players()
            .iter()
            .map(|p| json!({ "seat": p.id, "role": p.role.name(), "camp": p.camp.name() }))
            .collect();
        tracing::info!(players, ?seed, "new game dealt");
        self.session = Some(Session { game, queue: EffectQueue::new(), registry, phases });
        Ok(json!({ "ok": true, "players": players, "deal": deal }))
    }

    fn act(&mut self, action: &Action) -> Result<Value, CommandError> {
        let s = self.session()?;
        let out = flow::submit_action(&mut s.game, &mut s.queue, &s.registry, &s.phases, action);
        Ok(json!({
            "ok": out.success,
            "message": out.message,
            "data": out.data,
        }))
    }

    fn advance(&mut self) -> Result<Value, CommandError> {
        let s = self.session()?;
        let result = flow::advance_phase(&mut s.game, &mut s.queue, &s.registry, &s.phases);
        let acting = match result.kind {
            PhaseKind::Night(role) => Some(role.name()),
            _ => None,
        };
        Ok(json!({
            "ok": true,
            "round": result.round,
            "phase": result.phase,
            "kind": result.kind.name(),
            "acting": acting,
            "messages": result.messages,
            "finished": result.finished,
            "winner": result.winner.map(|c| c.name()),
        }))
    }

    fn complete(&mut self, effect: u32, target: u32) -> Result<Value, CommandError> {
        let s = self.session()?;
        let out = flow::complete_pending(&mut s.game, &mut s.queue, &s.registry, effect, target);
        Ok(json!({ "ok": out.success, "message": out.message, "data": out.data }))
    }

    fn assign_badge(&mut self, choice: Option<u32>) -> Result<Value, CommandError> {
        let s = self.session()?;
        let out = vote::assign_badge(&mut s.game, choice);
        Ok(json!({ "ok": out.success, "message": out.message }))
    }

    fn state(&mut self) -> Result<Value, CommandError> {
        let s = self.session()?;
        let players: Vec<Value> = s
            .game
            .players()
            .iter()
            .map(|p| {
                json!({
                    "seat": p.id,
                    "role": p.role.name(),
                    "camp": p.camp.name(),
                    "alive": p.alive,
                    "out": p.out_reason.map(|r| r.name()),
                })
            })
            .collect();
        let pending: Vec<Value> = s
            .queue
            .pending()
            .map(|e| {
                json!({
                    "effect": e.id,
                    "actor": e.actor,
                    "reason": e.reason.map(|r| r.name()),
                })
            })
            .collect();
        Ok(json!({
            "ok": true,
            "round": s.game.round,
            "phase": s.game.phase,
            "sheriff": s.game.sheriff,
            "badge": s.game.badge,
            "exile": s.game.exile.stage,
            "election": s.game.election.stage,
            "finished": s.game.finished,
            "winner": s.game.winner.map(|c| c.name()),
            "players": players,
            "pending": pending,
        }))
    }

    fn history(&mut self) -> Result<Value, CommandError> {
        let s = self.session()?;
        Ok(json!({ "ok": true, "entries": s.game.history }))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
