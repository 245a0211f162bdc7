pub mod deck;
pub mod error;
pub mod execution;
pub mod machine;
pub mod night;
pub mod vote;
pub mod win;

pub use deck::{build_deck, shuffle_deck, summarize, DeckSummary};
pub use error::{DeckIssue, GameError};
pub use execution::{resolve_execution, ExecutionOutcome};
pub use machine::PhaseMachine;
pub use night::{resolve_night, NightOutcome};
pub use vote::{cast_vote, tally_votes};
pub use win::evaluate_winner;
