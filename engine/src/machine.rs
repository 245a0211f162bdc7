//! Host-side orchestration of a game: legal phase transitions, their side
//! effects on the timer and the night draft, and single-step undo.

use itertools::Itertools;
use rand::Rng;
use types::{
    deck::{MAX_PLAYERS, MIN_PLAYERS},
    Charge, DeckBook, DeckConfig, GameState, NarrativeEvent, NightDraft, OptionalChoice, Phase,
    PlayerId, PrivateState, Prompt, Role, RoleChoice, Team, Timer,
};

use crate::{
    deck::{build_deck, shuffle_deck, summarize, DeckSummary},
    error::GameError,
    execution::{resolve_execution, ExecutionOutcome},
    night::{resolve_night, NightOutcome},
    vote::{cast_vote, tally_votes},
    win::evaluate_winner,
};

#[derive(Clone, Debug)]
pub struct PhaseMachine {
    pub state: GameState,
    pub draft: Option<NightDraft>,
    pub deck_book: DeckBook,
}

impl PhaseMachine {
    pub fn new(state: GameState) -> Self {
        let mut deck_book = DeckBook::default();
        deck_book.save(state.players.len(), state.deck_config.clone());
        Self {
            state,
            draft: None,
            deck_book,
        }
    }

    pub fn with_players<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(GameState::new(names))
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn winner(&self) -> Option<Team> {
        self.state.winner
    }

    pub fn private_info(&self) -> PrivateState {
        self.state.private_info(self.draft.as_ref())
    }

    /// Takes over a private partition written by another Host instance.
    pub fn adopt_private(&mut self, private: PrivateState) {
        self.deck_book
            .save(private.game.players.len(), private.game.deck_config.clone());
        self.state.adopt_private(private.clone());
        self.draft = private.draft;
    }

    fn expect_phase(&self, allowed: &[Phase], action: &'static str) -> Result<(), GameError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(GameError::IllegalTransition {
                from: self.state.phase,
                action,
            })
        }
    }

    fn living(&self, id: PlayerId) -> Result<(), GameError> {
        let player = self.state.player(id).ok_or(GameError::UnknownPlayer(id))?;
        if player.alive {
            Ok(())
        } else {
            Err(GameError::PlayerNotAlive(id))
        }
    }

    /// Resizes the table and renames players. Blank names fall back to `P{n}`.
    pub fn apply_setup<S: AsRef<str>>(&mut self, count: usize, names: &[S]) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Setup], "apply setup")?;
        let count = count.clamp(MIN_PLAYERS, MAX_PLAYERS);
        let names = (0..count)
            .map(|i| {
                names
                    .get(i)
                    .map(|n| n.as_ref().trim())
                    .filter(|n| !n.is_empty())
                    .map_or_else(|| format!("P{}", i + 1), str::to_string)
            })
            .collect_vec();

        self.state.snapshot();
        let previous_count = self.state.players.len();
        let deck_config = if previous_count == count {
            self.state.deck_config.clone()
        } else {
            self.deck_book.load(count)
        };
        let mut fresh = GameState::new(&names);
        fresh.deck_config = deck_config;
        fresh.day_seconds = self.state.day_seconds;
        fresh.event_queue = self.state.event_queue.clone();
        fresh.history = std::mem::take(&mut self.state.history);
        self.state = fresh;
        self.draft = None;
        log::info!("Setup applied: {count} players");
        Ok(())
    }

    /// Stores a deck configuration for the current table size and reports
    /// whether it can be dealt.
    pub fn set_deck_config(&mut self, config: DeckConfig) -> DeckSummary {
        let num_players = self.state.players.len();
        let summary = summarize(&config, num_players);
        self.deck_book.save(num_players, config.clone());
        self.state.deck_config = config;
        summary
    }

    pub fn deck_summary(&self) -> DeckSummary {
        summarize(&self.state.deck_config, self.state.players.len())
    }

    /// SETUP → DEAL. Resets every player and lays out a freshly shuffled deck.
    pub fn start_deal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Setup, Phase::End], "start dealing")?;
        let mut deck = build_deck(&self.state.deck_config, self.state.players.len())?;
        shuffle_deck(&mut deck, rng);

        self.state.snapshot();
        let state = &mut self.state;
        state.players.iter_mut().for_each(|p| p.reset());
        state.deck_used = Some(vec![false; deck.len()]);
        state.deck = Some(deck);
        state.phase = Phase::Deal;
        state.night = 1;
        state.timer = Timer::stopped();
        state.winner = None;
        state.votes.clear();
        state.execution_target = None;
        state.execution_oxidation_target = None;
        state.journalist_reveals.clear();
        state.reporter_charge = Charge::Ready;
        state.vigilante_charge = Charge::Ready;
        state.werewolf_contact = false;
        self.draft = None;
        log::info!("Dealing {} cards", state.players.len());
        Ok(())
    }

    /// Hands card `card_index` to `player_id`. Once every player holds a card
    /// the first night starts.
    pub fn deal_pick(
        &mut self,
        card_index: usize,
        player_id: PlayerId,
    ) -> Result<NarrativeEvent, GameError> {
        self.expect_phase(&[Phase::Deal], "pick a card")?;
        let role = self
            .state
            .deck
            .as_ref()
            .and_then(|deck| deck.get(card_index).copied())
            .ok_or(GameError::CardUnavailable(card_index))?;
        let used = self
            .state
            .deck_used
            .as_ref()
            .and_then(|used| used.get(card_index).copied())
            .unwrap_or(true);
        if used {
            return Err(GameError::CardUnavailable(card_index));
        }
        let player = self
            .state
            .player(player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        if player.assigned {
            return Err(GameError::AlreadyAssigned(player_id));
        }

        self.state.snapshot();
        if let Some(used) = self.state.deck_used.as_mut() {
            used[card_index] = true;
        }
        if let Some(player) = self.state.player_mut(player_id) {
            player.deal(role);
        }
        let event = NarrativeEvent::DealReveal {
            player_id,
            role,
            card_index,
        };
        self.state.event_queue.emit(vec![event]);
        log::debug!("Card {card_index} dealt to P{}", player_id + 1);

        if self.state.all_assigned() {
            self.enter_night();
        }
        Ok(event)
    }

    /// Draft for the current night, one entry per special role with its
    /// living holder as actor.
    pub fn init_draft(&self) -> NightDraft {
        let state = &self.state;
        let terrorist = state.holder_of(Role::Terrorist);
        NightDraft {
            mafia: RoleChoice::actor(state.holder_of(Role::Mafia)),
            doctor: RoleChoice::actor(state.holder_of(Role::Doctor)),
            police: RoleChoice::actor(state.holder_of(Role::Police)),
            terrorist: RoleChoice {
                actor: terrorist,
                target: terrorist
                    .and_then(|id| state.player(id))
                    .and_then(|p| p.terrorist_target()),
            },
            werewolf: RoleChoice::actor(state.holder_of(Role::Werewolf)),
            madam: RoleChoice::actor(state.holder_of(Role::Madam)),
            reporter: OptionalChoice::actor(state.holder_of(Role::Reporter)),
            vigilante: OptionalChoice::actor(state.holder_of(Role::Vigilante)),
        }
    }

    fn enter_night(&mut self) {
        self.state.phase = Phase::Night;
        self.state.timer = Timer::infinite();
        self.draft = Some(self.init_draft());
        log::info!("Night {} begins", self.state.night);
    }

    fn day_timer(&self, now_ms: i64) -> Timer {
        match self.state.day_seconds {
            Some(secs) => Timer::countdown(secs, now_ms),
            None => Timer::stopped(),
        }
    }

    /// Records a night choice for the prompt's role. Optional abilities are
    /// switched on by choosing a target and off by choosing `None`.
    pub fn set_night_choice(
        &mut self,
        prompt: Prompt,
        target: Option<PlayerId>,
    ) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Night], "choose a night target")?;
        if let Some(target) = target {
            self.living(target)?;
        }
        let fallback = self.init_draft();
        let draft = self.draft.get_or_insert(fallback);
        let choice = match prompt {
            Prompt::MafiaAttack => &mut draft.mafia,
            Prompt::DoctorProtect => &mut draft.doctor,
            Prompt::PoliceInvestigate => &mut draft.police,
            Prompt::TerroristMark => &mut draft.terrorist,
            Prompt::WerewolfMark => &mut draft.werewolf,
            Prompt::MadamMark => &mut draft.madam,
            Prompt::ReporterReveal | Prompt::VigilantePurge => {
                let optional = if prompt == Prompt::ReporterReveal {
                    &mut draft.reporter
                } else {
                    &mut draft.vigilante
                };
                optional.used = target.is_some();
                optional.target = target;
                return Ok(());
            }
            _ => {
                return Err(GameError::IllegalTransition {
                    from: Phase::Night,
                    action: "answer a day prompt",
                })
            }
        };
        choice.target = target;
        Ok(())
    }

    /// NIGHT → DAY, or END when the night decides the game.
    pub fn resolve_night(&mut self, now_ms: i64) -> Result<NightOutcome, GameError> {
        self.expect_phase(&[Phase::Night], "resolve the night")?;
        let draft = self.draft.take().unwrap_or_else(|| self.init_draft());
        let outcome = resolve_night(&self.state, &draft);

        self.state.snapshot();
        outcome.apply(&mut self.state);
        self.state.event_queue.emit(outcome.events.clone());
        log::info!(
            "Night {} resolved: {}",
            self.state.night,
            outcome.events.iter().join(", ")
        );
        if !self.finish_if_won() {
            self.state.phase = Phase::Day;
            self.state.timer = self.day_timer(now_ms);
        }
        Ok(outcome)
    }

    /// DAY → VOTE with a clean ballot.
    pub fn begin_vote(&mut self) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Day], "start the vote")?;
        self.state.snapshot();
        self.state.phase = Phase::Vote;
        self.state.timer = Timer::infinite();
        self.state.votes.clear();
        self.state.execution_target = None;
        self.state.execution_oxidation_target = None;
        Ok(())
    }

    pub fn cast_vote(&mut self, voter: PlayerId, target: Option<PlayerId>) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Vote], "cast a vote")?;
        cast_vote(&mut self.state, voter, target)
    }

    pub fn tally(&self) -> Option<PlayerId> {
        tally_votes(&self.state)
    }

    /// VOTE → EXECUTION with the chosen player on the block.
    pub fn nominate(&mut self, target: PlayerId) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Vote], "nominate")?;
        self.living(target)?;
        self.state.snapshot();
        self.state.phase = Phase::Execution;
        self.state.timer = Timer::infinite();
        self.state.execution_target = Some(target);
        self.state.execution_oxidation_target = None;
        log::info!("P{} nominated for execution", target + 1);
        Ok(())
    }

    pub fn set_oxidation_target(&mut self, target: Option<PlayerId>) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Execution], "pick an oxidation target")?;
        if let Some(target) = target {
            self.living(target)?;
        }
        self.state.execution_oxidation_target = target;
        Ok(())
    }

    pub fn confirm_execution(&mut self) -> Result<ExecutionOutcome, GameError> {
        self.expect_phase(&[Phase::Execution], "confirm the execution")?;
        let target = self
            .state
            .execution_target
            .ok_or(GameError::NoExecutionTarget)?;
        let outcome = resolve_execution(
            &self.state,
            target,
            self.state.execution_oxidation_target,
        )?;

        self.state.snapshot();
        outcome.apply(&mut self.state);
        self.state.event_queue.emit(vec![outcome.event()]);
        log::info!("Execution: {}", outcome.event());
        if !self.finish_if_won() {
            self.advance_night();
        }
        Ok(outcome)
    }

    /// Voids the vote and moves on to the next night.
    pub fn reject_execution(&mut self) -> Result<(), GameError> {
        self.expect_phase(&[Phase::Vote, Phase::Execution], "reject the vote")?;
        self.state.snapshot();
        self.state.event_queue.emit(vec![NarrativeEvent::Rejected]);
        log::info!("Vote rejected");
        self.advance_night();
        Ok(())
    }

    fn advance_night(&mut self) {
        self.state.night += 1;
        self.state.votes.clear();
        self.state.execution_target = None;
        self.state.execution_oxidation_target = None;
        self.enter_night();
    }

    fn finish_if_won(&mut self) -> bool {
        let Some(team) = evaluate_winner(&self.state) else {
            return false;
        };
        self.state.winner = Some(team);
        self.state.phase = Phase::End;
        self.state.timer = Timer::stopped();
        self.state.players.iter_mut().for_each(|p| p.reveal());
        self.draft = None;
        log::info!("{team} team wins on night {}", self.state.night);
        true
    }

    /// Back to SETUP from anywhere, keeping the table.
    pub fn force_end(&mut self) {
        self.state.snapshot();
        let state = &mut self.state;
        state.players.iter_mut().for_each(|p| p.reset());
        state.phase = Phase::Setup;
        state.night = 1;
        state.timer = Timer::stopped();
        state.deck = None;
        state.deck_used = None;
        state.votes.clear();
        state.execution_target = None;
        state.execution_oxidation_target = None;
        state.journalist_reveals.clear();
        state.winner = None;
        self.draft = None;
        log::info!("Game force-ended");
    }

    pub fn undo(&mut self) -> Result<(), GameError> {
        if !self.state.undo() {
            return Err(GameError::NothingToUndo);
        }
        self.draft = (self.state.phase == Phase::Night).then(|| self.init_draft());
        Ok(())
    }

    /// Moderator override that jumps straight to a phase, applying only the
    /// timer and draft side effects of entering it.
    pub fn set_phase(&mut self, phase: Phase, now_ms: i64) {
        self.state.snapshot();
        self.state.phase = phase;
        self.state.timer = match phase {
            Phase::Night | Phase::Vote | Phase::Execution => Timer::infinite(),
            Phase::Day => self.day_timer(now_ms),
            Phase::Setup | Phase::Deal | Phase::End => Timer::stopped(),
        };
        self.draft = (phase == Phase::Night).then(|| self.init_draft());
        log::warn!("Phase manually set to {phase}");
    }

    /// Starts a countdown and remembers it as the day length.
    pub fn start_countdown(&mut self, seconds: u64, now_ms: i64) {
        self.state.snapshot();
        self.state.timer = Timer::countdown(seconds, now_ms);
        self.state.day_seconds = Some(seconds);
    }

    pub fn pause_timer(&mut self, now_ms: i64) -> bool {
        let mut timer = self.state.timer;
        if !timer.pause(now_ms) {
            return false;
        }
        self.state.snapshot();
        self.state.timer = timer;
        true
    }

    pub fn resume_timer(&mut self, now_ms: i64) -> bool {
        let mut timer = self.state.timer;
        if !timer.resume(now_ms) {
            return false;
        }
        self.state.snapshot();
        self.state.timer = timer;
        true
    }

    /// Puts the timer back to what entering the current phase would set.
    pub fn reset_timer(&mut self, now_ms: i64) {
        self.state.snapshot();
        self.state.timer = match self.state.phase {
            Phase::Night | Phase::Vote | Phase::Execution => Timer::infinite(),
            Phase::Day => self.day_timer(now_ms),
            _ => Timer::stopped(),
        };
    }

    /// Daytime reporter reveal, run by the moderator outside the night draft.
    pub fn manual_reveal(&mut self, target: PlayerId) -> Result<NarrativeEvent, GameError> {
        self.expect_phase(&[Phase::Day], "reveal a card")?;
        let role = self
            .state
            .player(target)
            .ok_or(GameError::UnknownPlayer(target))?
            .role
            .ok_or(GameError::UnknownPlayer(target))?;

        self.state.snapshot();
        if let Some(player) = self.state.player_mut(target) {
            player.reveal();
        }
        self.state.journalist_reveals.insert(target);
        self.state.reporter_charge = Charge::Spent;
        let event = NarrativeEvent::ReporterNews {
            target_id: target,
            role,
        };
        self.state.event_queue.emit(vec![event]);
        Ok(event)
    }

    /// Legal answers for a prompt. For [`Prompt::DealPick`] these are card
    /// indices rather than player ids.
    pub fn candidates_for(&self, prompt: Prompt) -> Vec<PlayerId> {
        let state = &self.state;
        let alive_except = |excluded: Option<PlayerId>| {
            state
                .alive_players()
                .filter(|p| Some(p.id) != excluded)
                .map(|p| p.id)
                .collect_vec()
        };
        let actor_of = |role: Role| state.holder_of(role);
        match prompt {
            Prompt::MafiaAttack => state
                .alive_players()
                .filter(|p| !p.has_role(Role::Mafia))
                .map(|p| p.id)
                .collect_vec(),
            Prompt::DoctorProtect | Prompt::Nominate => alive_except(None),
            Prompt::PoliceInvestigate => alive_except(actor_of(Role::Police)),
            Prompt::TerroristMark => alive_except(actor_of(Role::Terrorist)),
            Prompt::WerewolfMark => alive_except(actor_of(Role::Werewolf)),
            Prompt::MadamMark => alive_except(actor_of(Role::Madam)),
            Prompt::ReporterReveal => {
                if state.night < 2 || state.reporter_charge.is_spent() {
                    return vec![];
                }
                let reporter = actor_of(Role::Reporter);
                state
                    .alive_players()
                    .filter(|p| p.assigned && Some(p.id) != reporter)
                    .filter(|p| !state.journalist_reveals.contains(&p.id))
                    .map(|p| p.id)
                    .collect_vec()
            }
            Prompt::VigilantePurge => {
                if state.vigilante_charge.is_spent() {
                    return vec![];
                }
                alive_except(actor_of(Role::Vigilante))
            }
            Prompt::Vote { voter } => alive_except(Some(voter)),
            Prompt::Oxidation => alive_except(state.execution_target),
            Prompt::DealPick { .. } => state
                .deck_used
                .as_ref()
                .map(|used| {
                    used.iter()
                        .enumerate()
                        .filter(|&(_, &u)| !u)
                        .map(|(i, _)| i)
                        .collect_vec()
                })
                .unwrap_or_default(),
        }
    }
}
