//! Nocturne werewolf resolution engine library.
//!
//! Exposes the game aggregate, role table, ability dispatcher, effect
//! resolution engine, phase flow controller, and voting subsystem for use by
//! integration tests and the moderator binary.

pub mod ability;
pub mod config;
pub mod effect;
pub mod engine;
pub mod flow;
pub mod game;
pub mod role;
pub mod vote;
