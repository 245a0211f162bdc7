use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use types::{DeckConfig, Role};

use crate::error::{DeckIssue, GameError};

/// Counts derived from a deck configuration for a given table size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeckSummary {
    pub sum_non_citizen: usize,
    pub citizen_count: i64,
    pub total: usize,
    pub issues: Vec<DeckIssue>,
}

impl DeckSummary {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn summarize(config: &DeckConfig, num_players: usize) -> DeckSummary {
    let sum_non_citizen = config.sum_non_citizen();
    let citizen_count = num_players as i64 - sum_non_citizen as i64;
    let mut issues = Vec::new();
    if config.count(Role::Mafia) < 1 {
        issues.push(DeckIssue::NoMafia);
    }
    if sum_non_citizen > num_players {
        issues.push(DeckIssue::TooManySpecials {
            specials: sum_non_citizen,
            players: num_players,
        });
    }
    if citizen_count < 0 {
        issues.push(DeckIssue::NegativeCitizens);
    }
    DeckSummary {
        sum_non_citizen,
        citizen_count,
        total: sum_non_citizen + citizen_count.max(0) as usize,
        issues,
    }
}

/// Expands a configuration into an unshuffled deck: specials in deck order,
/// citizens last.
pub fn build_deck(config: &DeckConfig, num_players: usize) -> Result<Vec<Role>, GameError> {
    let summary = summarize(config, num_players);
    if !summary.is_valid() {
        log::warn!(
            "Rejected deck config for {num_players} players: {:?}",
            summary.issues
        );
        return Err(GameError::InvalidDeckConfig(summary.issues));
    }
    let specials = Role::non_citizen()
        .flat_map(|role| std::iter::repeat(role).take(config.count(role) as usize));
    let citizens = std::iter::repeat(Role::Citizen).take(summary.citizen_count as usize);
    Ok(specials.chain(citizens).collect_vec())
}

pub fn shuffle_deck<R: Rng + ?Sized>(deck: &mut [Role], rng: &mut R) {
    deck.shuffle(rng);
}
