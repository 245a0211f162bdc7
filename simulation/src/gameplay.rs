//! Headless games: a Host and one Display talk through a store while
//! strategies answer every prompt a moderator would put to the table.

use std::{sync::Arc, time::Duration};

use engine::PhaseMachine;
use itertools::Itertools;
use rand::thread_rng;
use room::{now_ms, DisplaySync, HostSync, RemoteStore, RoomCode};
use tokio::time::sleep;
use types::{NarrativeEvent, Phase, PlayerId, Prompt, Role, Strategy, Team};

use crate::{config::SimulationConfig, error::SimulationError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    pub room: RoomCode,
    /// `None` when the game hit the night limit.
    pub winner: Option<Team>,
    pub nights: u32,
    /// Everything the Display played back, in order.
    pub events: Vec<NarrativeEvent>,
}

struct Table<'a> {
    host: HostSync,
    display: DisplaySync,
    seats: &'a mut [Box<dyn Strategy>],
    events: Vec<NarrativeEvent>,
    delay: Option<Duration>,
}

impl Table<'_> {
    /// One Host tick followed by one Display poll.
    async fn sync(&mut self) -> Result<(), SimulationError> {
        self.host.tick().await?;
        let update = self.display.poll().await?;
        for event in update.events.iter() {
            log::info!("Display: {event}");
        }
        self.events.extend(update.events);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        Ok(())
    }

    async fn ask(&mut self, seat: PlayerId, prompt: Prompt) -> Option<PlayerId> {
        let (state, candidates) = self
            .host
            .read(|m| (m.state.clone(), m.candidates_for(prompt)))
            .await;
        if candidates.is_empty() {
            return None;
        }
        let choice = self
            .seats
            .get_mut(seat)?
            .select_target(prompt, &state, &candidates);
        log::debug!("{prompt}: P{} chose {choice:?} from {candidates:?}", seat + 1);
        match choice {
            Some(choice) if candidates.contains(&choice) => Some(choice),
            _ if prompt.is_optional() => None,
            _ => candidates.first().copied(),
        }
    }

    async fn deal(&mut self) -> Result<(), SimulationError> {
        for player in 0..self.seats.len() {
            let card = self
                .ask(player, Prompt::DealPick { player })
                .await
                .ok_or_else(|| SimulationError::Stalled(format!("card for P{}", player + 1)))?;
            self.display.submit_deal_pick(card, player).await?;
            self.sync().await?;
        }
        Ok(())
    }

    async fn play_night(&mut self) -> Result<(), SimulationError> {
        for prompt in Prompt::NIGHT {
            let Some(role) = prompt.night_role() else {
                continue;
            };
            let Some(actor) = self.host.read(|m| m.state.holder_of(role)).await else {
                continue;
            };
            let target = self.ask(actor, prompt).await;
            self.host
                .command(|m| m.set_night_choice(prompt, target))
                .await?;
        }
        self.host.command(|m| m.resolve_night(now_ms())).await?;
        self.sync().await
    }

    async fn play_day(&mut self) -> Result<(), SimulationError> {
        self.host.command(|m| m.begin_vote()).await?;
        self.sync().await?;

        let voters = self
            .host
            .read(|m| m.state.alive_players().map(|p| p.id).collect_vec())
            .await;
        for voter in voters {
            let target = self.ask(voter, Prompt::Vote { voter }).await;
            self.display.cast_vote(voter, target).await?;
        }
        self.sync().await?;

        match self.host.read(|m| m.tally()).await {
            Some(target) => {
                self.host.command(|m| m.nominate(target)).await?;
                let is_terrorist = self
                    .host
                    .read(|m| m.state.player(target).is_some_and(|p| p.has_role(Role::Terrorist)))
                    .await;
                if is_terrorist {
                    let second = self.ask(target, Prompt::Oxidation).await;
                    self.host
                        .command(|m| m.set_oxidation_target(second))
                        .await?;
                }
                self.host.command(|m| m.confirm_execution()).await?;
            }
            None => self.host.command(|m| m.reject_execution()).await?,
        }
        self.sync().await
    }
}

/// Plays one full game. `seats` holds one strategy per player, in seat order.
pub async fn run_game(
    store: Arc<dyn RemoteStore>,
    config: &SimulationConfig,
    seats: &mut [Box<dyn Strategy>],
) -> Result<GameSummary, SimulationError> {
    if seats.len() != config.players.len() {
        return Err(SimulationError::SeatMismatch {
            players: config.players.len(),
            seats: seats.len(),
        });
    }

    let mut machine = PhaseMachine::with_players(&config.players);
    if let Some(deck) = &config.deck {
        let summary = machine.set_deck_config(deck.clone());
        log::info!(
            "Deck: {} specials, {} citizens",
            summary.sum_non_citizen,
            summary.citizen_count
        );
    }
    machine.state.day_seconds = config.day_seconds;

    let host = HostSync::open(store.clone(), config.sync.clone(), machine).await?;
    let display = DisplaySync::new(store, host.room().clone(), config.sync.clone());
    display.hello().await?;
    let mut table = Table {
        host,
        display,
        seats,
        events: Vec::new(),
        delay: config.step_delay_ms.map(Duration::from_millis),
    };

    table
        .host
        .command(|m| m.start_deal(&mut thread_rng()))
        .await?;
    table.sync().await?;
    table.deal().await?;

    let nights = loop {
        let (phase, night) = table.host.read(|m| (m.phase(), m.state.night)).await;
        match phase {
            Phase::End => break night,
            _ if night > config.max_nights => {
                log::warn!("No winner after {} nights, ending the game", config.max_nights);
                table
                    .host
                    .command(|m| {
                        m.force_end();
                        Ok(())
                    })
                    .await?;
                table.sync().await?;
                break config.max_nights;
            }
            Phase::Night => table.play_night().await?,
            Phase::Day => table.play_day().await?,
            other => return Err(SimulationError::UnexpectedPhase(other)),
        }
    };

    let winner = table.host.read(|m| m.winner()).await;
    match winner {
        Some(team) => log::info!("{team} team wins after {nights} nights"),
        None => log::info!("Game abandoned after {nights} nights"),
    }
    Ok(GameSummary {
        room: table.host.room().clone(),
        winner,
        nights,
        events: table.events,
    })
}
