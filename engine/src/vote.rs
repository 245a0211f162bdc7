use itertools::Itertools;
use types::{GameState, PlayerId};

use crate::error::GameError;

/// Records (or overwrites) a vote. `None` is an explicit abstention.
pub fn cast_vote(
    state: &mut GameState,
    voter: PlayerId,
    target: Option<PlayerId>,
) -> Result<(), GameError> {
    let voter_state = state.player(voter).ok_or(GameError::UnknownPlayer(voter))?;
    if !voter_state.alive {
        return Err(GameError::PlayerNotAlive(voter));
    }
    if let Some(target) = target {
        state.player(target).ok_or(GameError::UnknownPlayer(target))?;
        if !state.is_alive(target) {
            return Err(GameError::PlayerNotAlive(target));
        }
    }
    state.votes.insert(voter, target);
    Ok(())
}

/// Plurality winner among non-null votes. Ties and empty ballots give `None`.
pub fn tally_votes(state: &GameState) -> Option<PlayerId> {
    let counts = state.votes.values().flatten().copied().counts();
    let max = counts.values().copied().max()?;
    let mut leaders = counts.into_iter().filter(|&(_, c)| c == max);
    let (leader, _) = leaders.next()?;
    leaders.next().is_none().then_some(leader)
}
