use types::{GameState, Role, Team};

/// Mafia-aligned players win once they match the effective citizen count; an
/// alive Politician counts as one extra citizen.
pub fn evaluate_winner(state: &GameState) -> Option<Team> {
    let (mafia, citizens): (Vec<_>, Vec<_>) =
        state.alive_players().partition(|p| p.is_mafia_aligned());
    let politician_bonus = citizens.iter().any(|p| p.has_role(Role::Politician)) as usize;
    let effective_citizens = citizens.len() + politician_bonus;

    if mafia.is_empty() {
        Some(Team::Citizen)
    } else if mafia.len() >= effective_citizens {
        Some(Team::Mafia)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(roles: &[Role]) -> GameState {
        let names = (1..=roles.len()).map(|i| format!("P{i}")).collect::<Vec<_>>();
        let mut state = GameState::new(&names);
        for (player, &role) in state.players.iter_mut().zip(roles) {
            player.deal(role);
        }
        state
    }

    #[test]
    fn test_politician_counts_double() {
        use Role::*;
        let mut state = table(&[
            Mafia, Mafia, Politician, Citizen, Citizen, Citizen, Citizen, Citizen,
        ]);
        state.players[3].alive = false;
        state.players[4].alive = false;
        state.players[5].alive = false;
        // 2 mafia vs 1 politician + 2 citizens, effectively 4
        assert_eq!(evaluate_winner(&state), None);

        state.players[6].alive = false;
        // 2 mafia vs 1 politician + 1 citizen, effectively 3
        assert_eq!(evaluate_winner(&state), None);

        state.players[7].alive = false;
        assert_eq!(evaluate_winner(&state), Some(Team::Mafia));
    }

    #[test]
    fn test_eight_player_threshold() {
        use Role::*;
        let mut state = table(&[
            Mafia, Mafia, Politician, Citizen, Citizen, Citizen, Citizen, Citizen,
        ]);
        assert_eq!(evaluate_winner(&state), None);
        state.players[2].alive = false;
        state.players[3].alive = false;
        state.players[4].alive = false;
        state.players[5].alive = false;
        // 2 mafia vs 2 citizens
        assert_eq!(evaluate_winner(&state), Some(Team::Mafia));
    }

    #[test]
    fn test_no_mafia_left_is_citizen_win() {
        use Role::*;
        let mut state = table(&[Mafia, Spy, Doctor, Citizen]);
        state.players[0].alive = false;
        assert_eq!(evaluate_winner(&state), None);
        state.players[1].alive = false;
        assert_eq!(evaluate_winner(&state), Some(Team::Citizen));
    }

    #[test]
    fn test_all_mafia_aligned_roles_count() {
        use Role::*;
        let state = table(&[Werewolf, Madam, Doctor, Citizen]);
        assert_eq!(evaluate_winner(&state), Some(Team::Mafia));
    }
}
