use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt::Display,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    deck::DeckConfig,
    draft::NightDraft,
    event::EventQueue,
    player_state::{PlayerId, PlayerState, PublicPlayerState},
    role::{Role, Team},
    timer::Timer,
};

/// Max number of snapshots kept for undo.
pub const HISTORY_LIMIT: usize = 40;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Setup,
    Deal,
    Night,
    Day,
    Vote,
    Execution,
    End,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Setup => "Setup",
            Phase::Deal => "Deal",
            Phase::Night => "Night",
            Phase::Day => "Day",
            Phase::Vote => "Vote",
            Phase::Execution => "Execution",
            Phase::End => "End",
        };
        write!(f, "{name}")
    }
}

/// Global one-shot ability. Only ever goes from `Ready` to `Spent` within a game.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Charge {
    #[default]
    Ready,
    Spent,
}

impl Charge {
    pub fn is_spent(self) -> bool {
        self == Charge::Spent
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: Phase,
    pub night: u32,
    pub timer: Timer,
    pub players: Vec<PlayerState>,
    pub deck: Option<Vec<Role>>,
    pub deck_used: Option<Vec<bool>>,
    pub votes: BTreeMap<PlayerId, Option<PlayerId>>,
    pub execution_target: Option<PlayerId>,
    pub execution_oxidation_target: Option<PlayerId>,
    pub journalist_reveals: BTreeSet<PlayerId>,
    pub reporter_charge: Charge,
    pub vigilante_charge: Charge,
    pub werewolf_contact: bool,
    pub winner: Option<Team>,
    pub event_queue: EventQueue,
    pub deck_config: DeckConfig,
    pub day_seconds: Option<u64>,
    #[serde(skip)]
    pub history: VecDeque<GameState>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckInfo {
    pub count: usize,
    pub used: Vec<bool>,
}

/// Everything a Display is allowed to see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicState {
    pub phase: Phase,
    pub night: u32,
    pub timer: Timer,
    pub players: Vec<PublicPlayerState>,
    pub deck_info: Option<DeckInfo>,
    pub votes: BTreeMap<PlayerId, Option<PlayerId>>,
    pub execution_target: Option<PlayerId>,
    pub journalist_reveals: BTreeSet<PlayerId>,
    pub event_queue: EventQueue,
    pub winner: Option<Team>,
}

impl PublicState {
    pub fn card_used(&self, card_index: usize) -> bool {
        self.deck_info
            .as_ref()
            .and_then(|info| info.used.get(card_index).copied())
            .unwrap_or(false)
    }
}

/// Full Host-side state, read back only by Host instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateState {
    pub game: GameState,
    pub draft: Option<NightDraft>,
}

impl GameState {
    pub fn new<S: AsRef<str>>(player_names: &[S]) -> Self {
        let players = player_names
            .iter()
            .enumerate()
            .map(|(id, name)| PlayerState::new(id, name.as_ref().to_string()))
            .collect_vec();
        log::info!("New game with {} players", players.len());
        let deck_config = DeckConfig::default_for(players.len());
        Self {
            phase: Phase::Setup,
            night: 1,
            timer: Timer::stopped(),
            players,
            deck: None,
            deck_used: None,
            votes: BTreeMap::new(),
            execution_target: None,
            execution_oxidation_target: None,
            journalist_reveals: BTreeSet::new(),
            reporter_charge: Charge::Ready,
            vigilante_charge: Charge::Ready,
            werewolf_contact: false,
            winner: None,
            event_queue: EventQueue::default(),
            deck_config,
            day_seconds: None,
            history: VecDeque::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(|p| p.alive)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| p.alive)
    }

    /// First living holder of a role.
    pub fn holder_of(&self, role: Role) -> Option<PlayerId> {
        self.alive_players()
            .find(|p| p.has_role(role))
            .map(|p| p.id)
    }

    pub fn cards_used(&self) -> usize {
        self.deck_used
            .as_ref()
            .map_or(0, |used| used.iter().filter(|&&u| u).count())
    }

    pub fn all_assigned(&self) -> bool {
        self.players.iter().all(|p| p.assigned)
    }

    /// Pushes a copy of the current state onto the bounded undo stack.
    pub fn snapshot(&mut self) {
        let snapshot = self.clone_without_history();
        self.history.push_back(snapshot);
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// Restores the latest snapshot. The event token is kept so Displays never
    /// replay a batch they already played.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop_back() else {
            return false;
        };
        let history = std::mem::take(&mut self.history);
        let token = self.event_queue.token;
        *self = previous;
        self.history = history;
        self.event_queue.token = token;
        log::info!("Undo: back to {} (night {})", self.phase, self.night);
        true
    }

    pub fn public_info(&self) -> PublicState {
        PublicState {
            phase: self.phase,
            night: self.night,
            timer: self.timer,
            players: self.players.iter().map_into().collect(),
            deck_info: self.deck_used.as_ref().map(|used| DeckInfo {
                count: used.len(),
                used: used.clone(),
            }),
            votes: self.votes.clone(),
            execution_target: self.execution_target,
            journalist_reveals: self.journalist_reveals.clone(),
            event_queue: self.event_queue.clone(),
            winner: self.winner,
        }
    }

    pub fn private_info(&self, draft: Option<&NightDraft>) -> PrivateState {
        PrivateState {
            game: self.clone_without_history(),
            draft: draft.cloned(),
        }
    }

    /// Adopts a private partition written by another Host instance. Local undo
    /// history and the deck config are kept.
    pub fn adopt_private(&mut self, private: PrivateState) {
        let history = std::mem::take(&mut self.history);
        let deck_config = self.deck_config.clone();
        *self = private.game;
        self.history = history;
        self.deck_config = deck_config;
    }

    fn clone_without_history(&self) -> GameState {
        GameState {
            phase: self.phase,
            night: self.night,
            timer: self.timer,
            players: self.players.clone(),
            deck: self.deck.clone(),
            deck_used: self.deck_used.clone(),
            votes: self.votes.clone(),
            execution_target: self.execution_target,
            execution_oxidation_target: self.execution_oxidation_target,
            journalist_reveals: self.journalist_reveals.clone(),
            reporter_charge: self.reporter_charge,
            vigilante_charge: self.vigilante_charge,
            werewolf_contact: self.werewolf_contact,
            winner: self.winner,
            event_queue: self.event_queue.clone(),
            deck_config: self.deck_config.clone(),
            day_seconds: self.day_seconds,
            history: VecDeque::new(),
        }
    }
}

impl Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let winner_str = self
            .winner
            .map(|team| team.to_string())
            .unwrap_or("None".to_string());
        let players_str = self.players.iter().map(|p| p.to_string()).join("\n");
        write!(
            f,
            "\nPhase: {} (night {})\nWinner: {}\nTable:\n{}",
            self.phase, self.night, winner_str, players_str
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NarrativeEvent;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("P{i}")).collect()
    }

    #[test]
    fn test_undo_restores_single_step() {
        let mut state = GameState::new(&names(8));
        state.snapshot();
        state.phase = Phase::Deal;
        state.snapshot();
        state.phase = Phase::Night;

        assert!(state.undo());
        assert_eq!(state.phase, Phase::Deal);
        assert!(state.undo());
        assert_eq!(state.phase, Phase::Setup);
        assert!(!state.undo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = GameState::new(&names(8));
        for night in 0..(HISTORY_LIMIT as u32 + 10) {
            state.night = night;
            state.snapshot();
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert!(state.history.iter().all(|s| s.history.is_empty()));
    }

    #[test]
    fn test_undo_never_rewinds_event_token() {
        let mut state = GameState::new(&names(8));
        state.snapshot();
        state.event_queue.emit(vec![NarrativeEvent::Nothing]);
        assert!(state.undo());
        assert_eq!(state.event_queue.token, 1);
        assert!(state.event_queue.events.is_empty());
    }

    #[test]
    fn test_public_info_hides_roles() {
        let mut state = GameState::new(&names(8));
        state.players[0].deal(Role::Mafia);
        state.deck = Some(vec![Role::Mafia; 8]);
        state.deck_used = Some(vec![true, false, false, false, false, false, false, false]);
        let public = serde_json::to_string(&state.public_info()).unwrap();
        assert!(!public.contains("MAFIA"));
        assert!(public.contains("deckInfo"));
        assert!(state.public_info().card_used(0));
        assert!(!state.public_info().card_used(1));
    }

    #[test]
    fn test_adopt_private_keeps_local_history() {
        let mut host = GameState::new(&names(8));
        host.snapshot();
        let mut other = GameState::new(&names(8));
        other.phase = Phase::Night;
        other.night = 3;
        host.adopt_private(other.private_info(None));
        assert_eq!(host.phase, Phase::Night);
        assert_eq!(host.night, 3);
        assert_eq!(host.history.len(), 1);
    }
}
