use std::fmt::{Debug, Display};

use crate::{player_state::PlayerId, role::Role, GameState};

/// A decision the moderator (or a player through the moderator) has to make.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prompt {
    MafiaAttack,
    DoctorProtect,
    PoliceInvestigate,
    TerroristMark,
    WerewolfMark,
    MadamMark,
    ReporterReveal,
    VigilantePurge,
    Vote { voter: PlayerId },
    Nominate,
    Oxidation,
    DealPick { player: PlayerId },
}

impl Prompt {
    /// Night prompts in the order the moderator asks them.
    pub const NIGHT: [Prompt; 8] = [
        Prompt::MafiaAttack,
        Prompt::DoctorProtect,
        Prompt::PoliceInvestigate,
        Prompt::TerroristMark,
        Prompt::WerewolfMark,
        Prompt::MadamMark,
        Prompt::ReporterReveal,
        Prompt::VigilantePurge,
    ];

    /// The role that answers a night prompt.
    pub fn night_role(&self) -> Option<Role> {
        match self {
            Prompt::MafiaAttack => Some(Role::Mafia),
            Prompt::DoctorProtect => Some(Role::Doctor),
            Prompt::PoliceInvestigate => Some(Role::Police),
            Prompt::TerroristMark => Some(Role::Terrorist),
            Prompt::WerewolfMark => Some(Role::Werewolf),
            Prompt::MadamMark => Some(Role::Madam),
            Prompt::ReporterReveal => Some(Role::Reporter),
            Prompt::VigilantePurge => Some(Role::Vigilante),
            _ => None,
        }
    }

    /// Optional prompts may be answered with `None`.
    pub fn is_optional(&self) -> bool {
        !matches!(
            self,
            Prompt::MafiaAttack | Prompt::Oxidation | Prompt::DealPick { .. }
        )
    }
}

impl Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prompt::Vote { voter } => write!(f, "Vote for P{}", voter + 1),
            Prompt::DealPick { player } => write!(f, "Card pick for P{}", player + 1),
            other => write!(f, "{other:?}"),
        }
    }
}

pub trait Strategy: Debug {
    fn select_target(
        &mut self,
        prompt: Prompt,
        state: &GameState,
        candidates: &[PlayerId],
    ) -> Option<PlayerId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_night_prompt_has_a_role() {
        let roles = Prompt::NIGHT
            .iter()
            .filter_map(|p| p.night_role())
            .collect::<Vec<_>>();
        assert_eq!(roles.len(), Prompt::NIGHT.len());
        assert_eq!(roles[0], Role::Mafia);
        assert_eq!(Prompt::Nominate.night_role(), None);
        assert!(!Prompt::MafiaAttack.is_optional());
        assert!(Prompt::ReporterReveal.is_optional());
    }
}
