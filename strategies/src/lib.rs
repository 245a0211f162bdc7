pub mod input_strategy;

use rand::{rngs::ThreadRng, seq::SliceRandom, Rng};
use types::{GameState, PlayerId, Prompt, Strategy};

pub use crate::input_strategy::InputStrategy;

#[derive(Debug, Default)]
pub struct RandomStrategy {
    rng: ThreadRng,
}

impl Strategy for RandomStrategy {
    fn select_target(
        &mut self,
        prompt: Prompt,
        _state: &GameState,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        if prompt.is_optional() && self.rng.gen_bool(0.25) {
            return None;
        }
        candidates.choose(&mut self.rng).copied()
    }
}

/// Deterministic table play: everybody piles onto the lowest seat they can,
/// and the mafia team never targets its own.
#[derive(Debug, Default)]
pub struct DefaultStrategy {}

impl Strategy for DefaultStrategy {
    fn select_target(
        &mut self,
        prompt: Prompt,
        state: &GameState,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        let first_outsider = || {
            candidates
                .iter()
                .copied()
                .find(|&id| state.player(id).is_some_and(|p| !p.is_mafia_aligned()))
        };
        let first_insider = || {
            candidates
                .iter()
                .copied()
                .find(|&id| state.player(id).is_some_and(|p| p.is_mafia_aligned()))
        };

        match prompt {
            Prompt::MafiaAttack | Prompt::WerewolfMark | Prompt::MadamMark => {
                first_outsider().or_else(|| candidates.first().copied())
            }
            Prompt::TerroristMark | Prompt::Oxidation | Prompt::VigilantePurge => {
                first_insider().or_else(|| candidates.first().copied())
            }
            Prompt::Vote { voter } => {
                let voter_is_mafia = state.player(voter).is_some_and(|p| p.is_mafia_aligned());
                if voter_is_mafia {
                    first_outsider()
                } else {
                    candidates.first().copied()
                }
            }
            // Police have no effect on the resolution, skip them.
            Prompt::PoliceInvestigate => None,
            Prompt::DoctorProtect
            | Prompt::ReporterReveal
            | Prompt::Nominate
            | Prompt::DealPick { .. } => candidates.first().copied(),
        }
    }
}
