use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Mafia,
    Spy,
    Werewolf,
    Madam,
    Police,
    Doctor,
    Reporter,
    Politician,
    Terrorist,
    Detective,
    Army,
    Vigilante,
    Agent,
    Citizen,
}

impl Role {
    /// Order in which roles are laid out when a deck is expanded. Mafia team first,
    /// citizen team next, plain citizens last.
    pub const DECK_ORDER: [Role; 14] = [
        Role::Mafia,
        Role::Spy,
        Role::Werewolf,
        Role::Madam,
        Role::Police,
        Role::Doctor,
        Role::Reporter,
        Role::Politician,
        Role::Terrorist,
        Role::Detective,
        Role::Army,
        Role::Vigilante,
        Role::Agent,
        Role::Citizen,
    ];

    pub fn non_citizen() -> impl Iterator<Item = Role> {
        Role::DECK_ORDER
            .into_iter()
            .filter(|&role| role != Role::Citizen)
    }

    pub fn team(self) -> Team {
        match self {
            Role::Mafia | Role::Spy | Role::Werewolf | Role::Madam => Team::Mafia,
            _ => Team::Citizen,
        }
    }

    pub fn is_mafia_aligned(self) -> bool {
        self.team() == Team::Mafia
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Mafia => "Mafia",
            Role::Spy => "Spy",
            Role::Werewolf => "Werewolf",
            Role::Madam => "Madam",
            Role::Police => "Police",
            Role::Doctor => "Doctor",
            Role::Reporter => "Reporter",
            Role::Politician => "Politician",
            Role::Terrorist => "Terrorist",
            Role::Detective => "Detective",
            Role::Army => "Army",
            Role::Vigilante => "Vigilante",
            Role::Agent => "Agent",
            Role::Citizen => "Citizen",
        };
        write!(f, "{name}")
    }
}

/// Winning side. Also used as the `winner` flag on the game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Citizen,
    Mafia,
}

impl Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Citizen => write!(f, "Citizen team"),
            Team::Mafia => write!(f, "Mafia team"),
        }
    }
}
