use itertools::Itertools;
use thiserror::Error;
use types::{Phase, PlayerId};

/// A reason a deck configuration cannot be dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckIssue {
    NoMafia,
    TooManySpecials { specials: usize, players: usize },
    NegativeCitizens,
}

impl std::fmt::Display for DeckIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckIssue::NoMafia => write!(f, "at least one mafia card is required"),
            DeckIssue::TooManySpecials { specials, players } => write!(
                f,
                "special roles ({specials}) exceed the number of players ({players})"
            ),
            DeckIssue::NegativeCitizens => write!(f, "citizen count would be negative"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid deck configuration: {}", .0.iter().join("; "))]
    InvalidDeckConfig(Vec<DeckIssue>),

    #[error("A second, living oxidation target must be chosen before confirming")]
    MissingOxidationTarget,

    #[error("Cannot {action} during {from}")]
    IllegalTransition { from: Phase, action: &'static str },

    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player is not alive: {0}")]
    PlayerNotAlive(PlayerId),

    #[error("No execution target has been nominated")]
    NoExecutionTarget,

    #[error("Card {0} is not available")]
    CardUnavailable(usize),

    #[error("Player already holds a card: {0}")]
    AlreadyAssigned(PlayerId),

    #[error("Nothing to undo")]
    NothingToUndo,
}
