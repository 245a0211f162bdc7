use types::{GameState, NarrativeEvent, PlayerId, Role};

use crate::error::GameError;

/// Result of confirming the day's execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The Politician talked their way out; nobody dies.
    Lobby { politician: PlayerId },
    /// The Terrorist takes a second player down with them.
    Oxidation {
        terrorist: PlayerId,
        target: PlayerId,
    },
    Executed { target: PlayerId },
}

impl ExecutionOutcome {
    pub fn dead(&self) -> Vec<PlayerId> {
        match *self {
            ExecutionOutcome::Lobby { .. } => vec![],
            ExecutionOutcome::Oxidation { terrorist, target } => vec![terrorist, target],
            ExecutionOutcome::Executed { target } => vec![target],
        }
    }

    pub fn event(&self) -> NarrativeEvent {
        match *self {
            ExecutionOutcome::Lobby { politician } => NarrativeEvent::Lobby {
                politician_id: politician,
            },
            ExecutionOutcome::Oxidation { terrorist, target } => NarrativeEvent::TerrorOxidation {
                terrorist_id: terrorist,
                target_id: target,
            },
            ExecutionOutcome::Executed { target } => NarrativeEvent::Execution {
                executed_id: target,
            },
        }
    }

    pub fn apply(&self, state: &mut GameState) {
        match *self {
            ExecutionOutcome::Lobby { politician } => {
                if let Some(player) = state.player_mut(politician) {
                    player.reveal();
                }
            }
            ExecutionOutcome::Oxidation { terrorist, .. } => {
                if let Some(player) = state.player_mut(terrorist) {
                    player.reveal();
                }
            }
            ExecutionOutcome::Executed { .. } => {}
        }
        for id in self.dead() {
            if let Some(player) = state.player_mut(id) {
                player.alive = false;
            }
        }
    }
}

/// Picks the execution branch for the nominated player. A sealed Politician or
/// Terrorist is executed like anyone else.
pub fn resolve_execution(
    state: &GameState,
    target: PlayerId,
    oxidation_target: Option<PlayerId>,
) -> Result<ExecutionOutcome, GameError> {
    let player = state.player(target).ok_or(GameError::UnknownPlayer(target))?;
    if !player.alive {
        return Err(GameError::PlayerNotAlive(target));
    }
    let sealed = player.is_sealed(state.night);
    if sealed {
        log::info!("{} is sealed, abilities ignored", player.name);
    }

    if player.has_role(Role::Politician) && !sealed {
        return Ok(ExecutionOutcome::Lobby { politician: target });
    }
    if player.has_role(Role::Terrorist) && !sealed {
        let second = oxidation_target
            .filter(|&id| id != target && state.is_alive(id))
            .ok_or(GameError::MissingOxidationTarget)?;
        return Ok(ExecutionOutcome::Oxidation {
            terrorist: target,
            target: second,
        });
    }
    Ok(ExecutionOutcome::Executed { target })
}
