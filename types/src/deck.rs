use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::role::Role;

pub const MIN_PLAYERS: usize = 8;
pub const MAX_PLAYERS: usize = 12;
pub const MAX_PER_ROLE: u8 = 3;

/// Card count per non-citizen role. Citizens fill whatever is left.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckConfig {
    counts: BTreeMap<Role, u8>,
}

impl DeckConfig {
    pub fn from_counts<I: IntoIterator<Item = (Role, u8)>>(counts: I) -> Self {
        let mut config = Self::default();
        for (role, count) in counts {
            config.set(role, count);
        }
        config
    }

    pub fn count(&self, role: Role) -> u8 {
        self.counts.get(&role).copied().unwrap_or(0)
    }

    /// Stores a clamped count. Citizens are derived, so setting them is ignored.
    pub fn set(&mut self, role: Role, count: u8) {
        if role == Role::Citizen {
            return;
        }
        self.counts.insert(role, count.min(MAX_PER_ROLE));
    }

    pub fn sum_non_citizen(&self) -> usize {
        Role::non_citizen().map(|r| self.count(r) as usize).sum()
    }

    /// Suggested table setup for each supported player count.
    pub fn default_for(num_players: usize) -> Self {
        use Role::*;
        let counts: &[(Role, u8)] = match num_players {
            8 => &[
                (Mafia, 2),
                (Spy, 1),
                (Police, 1),
                (Doctor, 1),
                (Reporter, 1),
                (Politician, 1),
            ],
            9 => &[
                (Mafia, 2),
                (Spy, 1),
                (Police, 1),
                (Doctor, 1),
                (Terrorist, 1),
                (Reporter, 1),
                (Detective, 1),
                (Army, 1),
            ],
            10 => &[
                (Mafia, 3),
                (Police, 1),
                (Doctor, 1),
                (Politician, 1),
                (Detective, 1),
            ],
            11 => &[
                (Mafia, 3),
                (Spy, 1),
                (Police, 1),
                (Doctor, 1),
                (Politician, 1),
                (Detective, 1),
                (Army, 1),
                (Reporter, 1),
            ],
            12 => &[
                (Mafia, 3),
                (Spy, 1),
                (Police, 1),
                (Doctor, 1),
                (Politician, 1),
                (Detective, 1),
                (Army, 1),
                (Reporter, 1),
                (Terrorist, 1),
            ],
            n => {
                // outside the supported range: one of each special role in deck order
                return Self::from_counts(Role::non_citizen().take(n).map(|role| (role, 1)));
            }
        };
        Self::from_counts(counts.iter().copied())
    }
}

/// Deck configurations remembered per player count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckBook {
    by_count: BTreeMap<usize, DeckConfig>,
}

impl DeckBook {
    pub fn save(&mut self, num_players: usize, config: DeckConfig) {
        self.by_count.insert(num_players, config);
    }

    /// The saved config for this count, falling back to the default one.
    pub fn load(&self, num_players: usize) -> DeckConfig {
        self.by_count
            .get(&num_players)
            .cloned()
            .unwrap_or_else(|| DeckConfig::default_for(num_players))
    }
}
