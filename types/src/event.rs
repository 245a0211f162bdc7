use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{player_state::PlayerId, role::Role};

/// Narrative notification played once by Displays. Not game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum NarrativeEvent {
    DealReveal {
        player_id: PlayerId,
        role: Role,
        card_index: usize,
    },
    DoctorSave {
        target_id: PlayerId,
    },
    ArmySave {
        target_id: PlayerId,
    },
    MafiaKill {
        target_id: PlayerId,
    },
    WerewolfThirst {
        target_id: PlayerId,
    },
    TerrorSelfDestruct {
        terrorist_id: PlayerId,
        target_id: PlayerId,
    },
    VigilantePurge {
        target_id: PlayerId,
    },
    ReporterNews {
        target_id: PlayerId,
        role: Role,
    },
    Lobby {
        politician_id: PlayerId,
    },
    TerrorOxidation {
        terrorist_id: PlayerId,
        target_id: PlayerId,
    },
    Execution {
        executed_id: PlayerId,
    },
    Rejected,
    Nothing,
}

impl Display for NarrativeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NarrativeEvent::DealReveal {
                player_id, role, ..
            } => write!(f, "P{} drew {role}", player_id + 1),
            NarrativeEvent::DoctorSave { target_id } => {
                write!(f, "Doctor saved P{}", target_id + 1)
            }
            NarrativeEvent::ArmySave { target_id } => {
                write!(f, "Armor saved P{}", target_id + 1)
            }
            NarrativeEvent::MafiaKill { target_id } => {
                write!(f, "Mafia killed P{}", target_id + 1)
            }
            NarrativeEvent::WerewolfThirst { target_id } => {
                write!(f, "Werewolf thirst killed P{}", target_id + 1)
            }
            NarrativeEvent::TerrorSelfDestruct {
                terrorist_id,
                target_id,
            } => write!(
                f,
                "Terrorist P{} took P{} down",
                terrorist_id + 1,
                target_id + 1
            ),
            NarrativeEvent::VigilantePurge { target_id } => {
                write!(f, "Vigilante purged P{}", target_id + 1)
            }
            NarrativeEvent::ReporterNews { target_id, role } => {
                write!(f, "Breaking news: P{} is {role}", target_id + 1)
            }
            NarrativeEvent::Lobby { politician_id } => {
                write!(f, "Politician P{} lobbied out of execution", politician_id + 1)
            }
            NarrativeEvent::TerrorOxidation {
                terrorist_id,
                target_id,
            } => write!(
                f,
                "Terrorist P{} oxidized with P{}",
                terrorist_id + 1,
                target_id + 1
            ),
            NarrativeEvent::Execution { executed_id } => {
                write!(f, "P{} was executed", executed_id + 1)
            }
            NarrativeEvent::Rejected => write!(f, "Vote rejected"),
            NarrativeEvent::Nothing => write!(f, "Nothing happened"),
        }
    }
}

/// Token-stamped batch of narrative events. A Display replays `events` only
/// when `token` differs from the last token it played.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueue {
    pub token: u64,
    pub events: Vec<NarrativeEvent>,
}

impl EventQueue {
    /// Replaces the pending batch, bumping the token. Displays replay the
    /// batch once per token, so a writer emitting several batches between two
    /// publishes has to merge them itself.
    pub fn emit(&mut self, events: Vec<NarrativeEvent>) {
        self.token += 1;
        self.events = events;
    }
}
