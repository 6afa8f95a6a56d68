//! Game aggregate: players, history, and the room-level state record.

pub mod history;
pub mod player;
pub mod state;

pub use history::{HistoryEntry, Scope};
pub use player::{AbilityState, Player, PlayerId};
pub use state::{BadgeState, Game};
