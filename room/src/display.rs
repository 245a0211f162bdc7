//! Display side of the action sync protocol.
//!
//! A Display never writes the room blob. It polls the public partition, keeps a
//! fingerprint so it only re-renders on visible changes, replays narrative
//! events once per `eventQueue.token`, and submits intents to the action queue
//! while locking the matching affordance until the Host's answer shows up.

use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use tokio::{
    sync::{mpsc, watch, Mutex},
    time::{interval, Instant, MissedTickBehavior},
};
use types::{Intent, NarrativeEvent, Phase, PlayerId, PublicState};
use uuid::Uuid;

use crate::{
    blob::DisplayView, config::SyncConfig, connectivity::Connectivity, error::SyncError, now_ms,
    room_code::RoomCode, store::RemoteStore,
};

/// The affordance a submitted intent locks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PendingKey {
    DealCard(usize),
    Vote(PlayerId),
}

#[derive(Clone, Copy, Debug)]
struct PendingIntent {
    intent: Intent,
    submitted_at: Instant,
    reported: bool,
}

/// Result of one poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub skipped: bool,
    /// The visible state changed and should be re-rendered.
    pub changed: bool,
    /// Narrative events to play, at most once per token.
    pub events: Vec<NarrativeEvent>,
    /// Pending intents that just went unanswered past the timeout, each
    /// reported once. They stay locked until [`DisplaySync::cancel`].
    pub timed_out: Vec<PendingKey>,
}

/// Summary of everything a Display draws. Timer ticks computed locally from
/// `endAt` do not change it.
pub fn fingerprint(state: &PublicState) -> String {
    let seats = state
        .players
        .iter()
        .map(|p| format!("{:?}:{}{}", p.name, u8::from(p.alive), u8::from(p.assigned)))
        .join(",");
    let cards = state.players.iter().map(|p| p.public_card).join("|");
    let used = state
        .deck_info
        .as_ref()
        .map(|info| info.used.iter().map(|&u| if u { '1' } else { '0' }).collect::<String>())
        .unwrap_or_default();
    let votes = state
        .votes
        .iter()
        .map(|(voter, target)| format!("{voter}>{}", target.map_or("-".to_string(), |t| t.to_string())))
        .join(",");
    format!(
        "{}|{}|{:?}|{}|{:?}|{:?}|{seats}|{cards}|{used}|{votes}|{:?}|{:?}",
        state.phase,
        state.night,
        state.timer.mode,
        state.timer.duration_sec,
        state.timer.end_at,
        state.timer.running,
        state.execution_target,
        state.winner
    )
}

struct DisplayInner {
    view: Option<PublicState>,
    host_heartbeat: Option<i64>,
    fingerprint: Option<String>,
    last_token: Option<u64>,
    pending: HashMap<PendingKey, PendingIntent>,
    connectivity: Connectivity,
}

impl DisplayInner {
    /// Releases locks whose outcome is visible in `state`.
    fn settle_pending(&mut self, state: &PublicState) {
        self.pending.retain(|key, pending| match (key, pending.intent) {
            (PendingKey::DealCard(index), _) => {
                state.phase == Phase::Deal && !state.card_used(*index)
            }
            (
                PendingKey::Vote(voter),
                Intent::CastVote { target_id, .. },
            ) => state.phase == Phase::Vote && state.votes.get(voter) != Some(&target_id),
            _ => false,
        });
    }
}

pub struct DisplaySync {
    store: Arc<dyn RemoteStore>,
    room: RoomCode,
    config: SyncConfig,
    client_id: Uuid,
    flight: Mutex<()>,
    inner: Mutex<DisplayInner>,
}

impl DisplaySync {
    pub fn new(store: Arc<dyn RemoteStore>, room: RoomCode, config: SyncConfig) -> Self {
        let connectivity = Connectivity::new(config.failures_to_disconnect);
        Self {
            store,
            room,
            config,
            client_id: Uuid::new_v4(),
            flight: Mutex::new(()),
            inner: Mutex::new(DisplayInner {
                view: None,
                host_heartbeat: None,
                fingerprint: None,
                last_token: None,
                pending: HashMap::new(),
                connectivity,
            }),
        }
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    pub async fn view(&self) -> Option<PublicState> {
        self.inner.lock().await.view.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.connectivity.is_connected()
    }

    pub async fn is_pending(&self, key: PendingKey) -> bool {
        self.inner.lock().await.pending.contains_key(&key)
    }

    /// Reads the room blob once. A missing room, a failed read or a stale
    /// Host heartbeat all count as a missed beat.
    pub async fn poll(&self) -> Result<DisplayUpdate, SyncError> {
        let Ok(_flight) = self.flight.try_lock() else {
            tracing::debug!("Display poll dropped, previous poll still in flight");
            return Ok(DisplayUpdate {
                skipped: true,
                ..Default::default()
            });
        };

        let fetched = self.store.get(&self.room).await.and_then(|value| {
            serde_json::from_value::<DisplayView>(value).map_err(SyncError::from)
        });
        let mut inner = self.inner.lock().await;
        let view = match fetched {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!("Room {} poll failed: {err}", self.room);
                inner.connectivity.record_failure();
                return Err(err);
            }
        };

        let age = now_ms() - view.host_heartbeat;
        if age < self.config.heartbeat_stale_after_ms() {
            inner.connectivity.record_success();
        } else {
            tracing::debug!("Host heartbeat is {age} ms old");
            inner.connectivity.record_failure();
        }
        inner.host_heartbeat = Some(view.host_heartbeat);

        let state = view.public_state;
        let mut update = DisplayUpdate::default();

        let key = fingerprint(&state);
        if inner.fingerprint.as_ref() != Some(&key) {
            inner.fingerprint = Some(key);
            update.changed = true;
        }

        let token = state.event_queue.token;
        if inner.last_token != Some(token) {
            inner.last_token = Some(token);
            update.events = state.event_queue.events.clone();
        }

        inner.settle_pending(&state);
        let timeout = self.config.intent_timeout();
        update.timed_out = inner
            .pending
            .iter_mut()
            .filter(|(_, pending)| !pending.reported && pending.submitted_at.elapsed() >= timeout)
            .map(|(key, pending)| {
                pending.reported = true;
                *key
            })
            .sorted()
            .collect();
        for key in update.timed_out.iter() {
            tracing::warn!("{}", SyncError::IntentTimeout(*key));
        }

        inner.view = Some(state);
        Ok(update)
    }

    async fn append(&self, intent: Intent) -> Result<u64, SyncError> {
        let msg = serde_json::to_value(intent)?;
        self.store.append_action(&self.room, msg).await
    }

    /// Locks `key`, appends the intent and unlocks again if the append fails.
    async fn submit_locked(&self, key: PendingKey, intent: Intent) -> Result<u64, SyncError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.pending.contains_key(&key) {
                return Err(SyncError::IntentPending(key));
            }
            inner.pending.insert(
                key,
                PendingIntent {
                    intent,
                    submitted_at: Instant::now(),
                    reported: false,
                },
            );
        }
        match self.append(intent).await {
            Ok(id) => {
                tracing::debug!("Submitted {intent} as action {id}");
                Ok(id)
            }
            Err(err) => {
                self.inner.lock().await.pending.remove(&key);
                Err(err)
            }
        }
    }

    pub async fn hello(&self) -> Result<u64, SyncError> {
        self.append(Intent::Hello {
            client_id: self.client_id,
        })
        .await
    }

    pub async fn heartbeat(&self) -> Result<u64, SyncError> {
        self.append(Intent::Ping).await
    }

    pub async fn request_sync(&self) -> Result<u64, SyncError> {
        self.append(Intent::ReqSync).await
    }

    pub async fn submit_deal_pick(
        &self,
        card_index: usize,
        player_id: PlayerId,
    ) -> Result<u64, SyncError> {
        let used = self
            .inner
            .lock()
            .await
            .view
            .as_ref()
            .is_some_and(|view| view.card_used(card_index));
        if used {
            return Err(engine::GameError::CardUnavailable(card_index).into());
        }
        self.submit_locked(
            PendingKey::DealCard(card_index),
            Intent::DealPick {
                card_index,
                player_id,
            },
        )
        .await
    }

    pub async fn cast_vote(
        &self,
        voter_id: PlayerId,
        target_id: Option<PlayerId>,
    ) -> Result<u64, SyncError> {
        self.submit_locked(
            PendingKey::Vote(voter_id),
            Intent::CastVote {
                voter_id,
                target_id,
            },
        )
        .await
    }

    /// Drops a pending lock so the intent can be submitted again.
    pub async fn cancel(&self, key: PendingKey) -> bool {
        self.inner.lock().await.pending.remove(&key).is_some()
    }

    /// Polls every `display_poll_ms` and pings every `heartbeat_ms` until
    /// `shutdown` flips to true. Updates worth rendering go to `updates`.
    pub async fn run(
        self: Arc<Self>,
        updates: mpsc::UnboundedSender<DisplayUpdate>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if let Err(err) = self.hello().await {
            tracing::warn!("Hello for room {} failed: {err}", self.room);
        }
        let mut poll_ticker = interval(self.config.display_poll());
        poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut beat_ticker = interval(self.config.heartbeat());
        beat_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = poll_ticker.tick() => {
                    if let Ok(update) = self.poll().await {
                        let worth_sending = update.changed
                            || !update.events.is_empty()
                            || !update.timed_out.is_empty();
                        if worth_sending && updates.send(update).is_err() {
                            break;
                        }
                    }
                }
                _ = beat_ticker.tick() => {
                    if let Err(err) = self.heartbeat().await {
                        tracing::debug!("Ping for room {} failed: {err}", self.room);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Display loop for room {} stopped", self.room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blob::RoomBlob, store::MemoryStore};
    use engine::PhaseMachine;

    async fn seeded() -> (Arc<dyn RemoteStore>, RoomCode, PhaseMachine) {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::default());
        let room: RoomCode = "1357".parse().unwrap();
        let names = (1..=8).map(|i| format!("P{i}")).collect::<Vec<_>>();
        let machine = PhaseMachine::with_players(&names);
        write(&store, &room, &machine).await;
        (store, room, machine)
    }

    async fn write(store: &Arc<dyn RemoteStore>, room: &RoomCode, machine: &PhaseMachine) {
        let blob = RoomBlob {
            public_state: machine.state.public_info(),
            private_state: machine.private_info(),
            host_heartbeat: now_ms(),
        };
        store
            .set(room, serde_json::to_value(blob).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_same_blob_twice_plays_nothing_new() {
        let (store, room, mut machine) = seeded().await;
        machine.state.event_queue.emit(vec![NarrativeEvent::Nothing]);
        write(&store, &room, &machine).await;

        let display = DisplaySync::new(store.clone(), room.clone(), SyncConfig::default());
        let first = display.poll().await.unwrap();
        assert!(first.changed);
        assert_eq!(first.events, vec![NarrativeEvent::Nothing]);

        let second = display.poll().await.unwrap();
        assert!(!second.changed);
        assert!(second.events.is_empty());
        assert!(display.is_connected().await);
    }

    #[tokio::test]
    async fn test_new_token_plays_once() {
        let (store, room, mut machine) = seeded().await;
        let display = DisplaySync::new(store.clone(), room.clone(), SyncConfig::default());
        display.poll().await.unwrap();

        machine.state.event_queue.emit(vec![NarrativeEvent::Rejected]);
        write(&store, &room, &machine).await;
        assert_eq!(
            display.poll().await.unwrap().events,
            vec![NarrativeEvent::Rejected]
        );
        assert!(display.poll().await.unwrap().events.is_empty());
    }

    #[tokio::test]
    async fn test_missing_room_counts_as_failure() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::default());
        let config = SyncConfig {
            failures_to_disconnect: 1,
            ..Default::default()
        };
        let display = DisplaySync::new(store, "1000".parse().unwrap(), config);
        assert!(matches!(
            display.poll().await,
            Err(SyncError::NotFound(_))
        ));
        assert!(!display.is_connected().await);
    }

    #[tokio::test]
    async fn test_stale_heartbeat_disconnects() {
        let (store, room, _) = seeded().await;
        let config = SyncConfig {
            failures_to_disconnect: 2,
            ..Default::default()
        };
        let display = DisplaySync::new(store.clone(), room.clone(), config);
        display.poll().await.unwrap();
        assert!(display.is_connected().await);

        store
            .patch(&room, crate::blob::heartbeat_patch(now_ms() - 60_000))
            .await
            .unwrap();
        display.poll().await.unwrap();
        assert!(display.is_connected().await);
        display.poll().await.unwrap();
        assert!(!display.is_connected().await);
    }

    #[tokio::test]
    async fn test_pending_lock_blocks_resubmission() {
        let (store, room, _) = seeded().await;
        let display = DisplaySync::new(store.clone(), room.clone(), SyncConfig::default());
        display.cast_vote(0, Some(3)).await.unwrap();
        assert!(matches!(
            display.cast_vote(0, Some(4)).await,
            Err(SyncError::IntentPending(PendingKey::Vote(0)))
        ));
        assert!(display.cancel(PendingKey::Vote(0)).await);
        display.cast_vote(0, Some(4)).await.unwrap();
        assert_eq!(store.drain_actions(&room).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lock_released_when_vote_is_visible() {
        let (store, room, mut machine) = seeded().await;
        machine.set_phase(Phase::Vote, 0);
        write(&store, &room, &machine).await;

        let display = DisplaySync::new(store.clone(), room.clone(), SyncConfig::default());
        display.poll().await.unwrap();
        display.cast_vote(0, Some(3)).await.unwrap();
        display.poll().await.unwrap();
        assert!(display.is_pending(PendingKey::Vote(0)).await);

        machine.cast_vote(0, Some(3)).unwrap();
        write(&store, &room, &machine).await;
        let update = display.poll().await.unwrap();
        assert!(update.changed);
        assert!(!display.is_pending(PendingKey::Vote(0)).await);
    }

    #[tokio::test]
    async fn test_timed_out_intent_is_reported_once_and_stays_locked() {
        let (store, room, mut machine) = seeded().await;
        machine.set_phase(Phase::Vote, 0);
        write(&store, &room, &machine).await;
        let config = SyncConfig {
            intent_timeout_ms: 10,
            ..Default::default()
        };
        let display = DisplaySync::new(store.clone(), room.clone(), config);
        display.cast_vote(2, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        let update = display.poll().await.unwrap();
        assert_eq!(update.timed_out, vec![PendingKey::Vote(2)]);
        assert!(display.is_pending(PendingKey::Vote(2)).await);
        assert!(display.poll().await.unwrap().timed_out.is_empty());

        assert!(display.cancel(PendingKey::Vote(2)).await);
        display.cast_vote(2, Some(1)).await.unwrap();
    }

    #[test]
    fn test_fingerprint_ignores_events() {
        let names = (1..=8).map(|i| format!("P{i}")).collect::<Vec<_>>();
        let mut machine = PhaseMachine::with_players(&names);
        let before = fingerprint(&machine.state.public_info());
        machine.state.event_queue.emit(vec![NarrativeEvent::Nothing]);
        assert_eq!(before, fingerprint(&machine.state.public_info()));
        machine.state.players[2].alive = false;
        assert_ne!(before, fingerprint(&machine.state.public_info()));
    }

    #[test]
    fn test_fingerprint_tracks_names_and_durations() {
        let names = (1..=8).map(|i| format!("P{i}")).collect::<Vec<_>>();
        let mut machine = PhaseMachine::with_players(&names);
        let before = fingerprint(&machine.state.public_info());

        machine.state.players[0].name = "Alice".to_string();
        let renamed = fingerprint(&machine.state.public_info());
        assert_ne!(before, renamed);

        machine.state.timer.duration_sec += 30;
        let longer = fingerprint(&machine.state.public_info());
        assert_ne!(renamed, longer);

        machine.state.players[1].assigned = true;
        assert_ne!(longer, fingerprint(&machine.state.public_info()));
    }
}
