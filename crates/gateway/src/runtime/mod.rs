pub mod orchestrator;
pub mod tools;

pub use orchestrator::{run_turn, ChatOutcome, HistoryTurn, TurnInput};
