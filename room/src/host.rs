//! Host side of the action sync protocol.
//!
//! The Host is the only writer of the room blob. Each tick drains the action
//! queue, applies every action newer than the `last_action_id` watermark,
//! clears the queue up to the watermark once, and then writes one consolidated
//! blob if anything changed. Ticks are single-flight: a tick that starts while
//! another is still talking to the store is dropped.

use std::sync::Arc;

use engine::{GameError, PhaseMachine};
use rand::thread_rng;
use tokio::{
    sync::{watch, Mutex},
    time::{interval, Instant, MissedTickBehavior},
};
use types::{Intent, NarrativeEvent, PublicState};

use crate::{
    blob::{heartbeat_patch, HostView, RoomBlob},
    config::SyncConfig,
    connectivity::Connectivity,
    error::SyncError,
    now_ms,
    retry::retry_with_backoff,
    room_code::RoomCode,
    store::{RawAction, RemoteStore},
};

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub skipped: bool,
    pub applied: Vec<u64>,
    pub cleared_upto: Option<u64>,
    pub wrote_state: bool,
    pub wrote_heartbeat: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostStatus {
    pub connected: bool,
    pub client_present: bool,
    pub last_action_id: Option<u64>,
    pub dirty: bool,
}

struct HostInner {
    machine: PhaseMachine,
    last_action_id: Option<u64>,
    dirty: bool,
    last_write: Option<Instant>,
    last_client_ping: Option<Instant>,
    connectivity: Connectivity,
    /// Event token last folded into `unpublished`.
    seen_token: u64,
    /// Events emitted since the last successful write.
    unpublished: Vec<NarrativeEvent>,
}

impl HostInner {
    fn mark_client_seen(&mut self) {
        self.last_client_ping = Some(Instant::now());
    }

    /// Folds a freshly emitted batch into the events awaiting the next write.
    fn collect_events(&mut self) {
        let queue = &self.machine.state.event_queue;
        if queue.token != self.seen_token {
            self.seen_token = queue.token;
            self.unpublished.extend(queue.events.iter().cloned());
        }
    }

    /// Publishes every event emitted since the last write under the latest
    /// token. Skipped when an undo replaced the queue in between.
    fn merge_unpublished(&mut self) {
        let queue = &mut self.machine.state.event_queue;
        if queue.token == self.seen_token
            && self.unpublished.len() > queue.events.len()
            && self.unpublished.ends_with(&queue.events)
        {
            queue.events = self.unpublished.clone();
        }
    }

    /// Applies one intent, returning whether the blob must be rewritten.
    /// Presence intents only refresh the client ping.
    fn apply_intent(&mut self, intent: Intent) -> bool {
        let result: Result<(), GameError> = match intent {
            Intent::Hello { client_id } => {
                tracing::info!("Display {client_id} joined");
                self.mark_client_seen();
                Ok(())
            }
            Intent::Ping => {
                self.mark_client_seen();
                Ok(())
            }
            Intent::ReqSync => return true,
            Intent::DealPick {
                card_index,
                player_id,
            } => self.machine.deal_pick(card_index, player_id).map(|_| ()),
            Intent::CastVote {
                voter_id,
                target_id,
            } => self.machine.cast_vote(voter_id, target_id),
        };
        match result {
            Ok(()) => intent.is_mutating(),
            Err(err) => {
                tracing::warn!("Ignoring intent {intent}: {err}");
                false
            }
        }
    }

    /// Applies the actions newer than the watermark. Returns the applied ids.
    fn apply_batch(&mut self, mut actions: Vec<RawAction>) -> Vec<u64> {
        actions.sort_by_key(|a| a.id);
        let mut applied = Vec::new();
        for action in actions {
            if let Some(watermark) = self.last_action_id {
                if action.id <= watermark {
                    let err = SyncError::StaleActionIgnored {
                        id: action.id,
                        watermark,
                    };
                    tracing::debug!("{err}");
                    continue;
                }
            }
            let id = action.id;
            self.last_action_id = Some(id);
            applied.push(id);
            match action.decode() {
                Ok(message) => {
                    if self.apply_intent(message.msg) {
                        self.dirty = true;
                    }
                    self.collect_events();
                }
                Err(err) => tracing::warn!("Dropping undecodable action {id}: {err}"),
            }
        }
        applied
    }

    fn blob(&self, now_ms: i64) -> RoomBlob {
        RoomBlob {
            public_state: self.machine.state.public_info(),
            private_state: self.machine.private_info(),
            host_heartbeat: now_ms,
        }
    }
}

pub struct HostSync {
    store: Arc<dyn RemoteStore>,
    room: RoomCode,
    config: SyncConfig,
    flight: Mutex<()>,
    inner: Mutex<HostInner>,
}

impl HostSync {
    fn with_room(
        store: Arc<dyn RemoteStore>,
        room: RoomCode,
        config: SyncConfig,
        machine: PhaseMachine,
    ) -> Self {
        let connectivity = Connectivity::new(config.failures_to_disconnect);
        let seen_token = machine.state.event_queue.token;
        Self {
            store,
            room,
            config,
            flight: Mutex::new(()),
            inner: Mutex::new(HostInner {
                machine,
                last_action_id: None,
                dirty: true,
                last_write: None,
                last_client_ping: None,
                connectivity,
                seen_token,
                unpublished: Vec::new(),
            }),
        }
    }

    /// Creates a room under a fresh code and writes the first blob.
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        config: SyncConfig,
        machine: PhaseMachine,
    ) -> Result<Self, SyncError> {
        let room = RoomCode::generate(&mut thread_rng());
        Self::open_with_code(store, room, config, machine).await
    }

    pub async fn open_with_code(
        store: Arc<dyn RemoteStore>,
        room: RoomCode,
        config: SyncConfig,
        machine: PhaseMachine,
    ) -> Result<Self, SyncError> {
        let host = Self::with_room(store, room, config, machine);
        let blob = serde_json::to_value(host.inner.lock().await.blob(now_ms()))?;
        let store = host.store.clone();
        let room = host.room.clone();
        retry_with_backoff(
            "room creation",
            move || {
                let store = store.clone();
                let room = room.clone();
                let blob = blob.clone();
                Box::pin(async move { store.set(&room, blob).await })
            },
            host.config.retry_attempts,
            host.config.retry_initial_delay(),
        )
        .await?;

        let mut inner = host.inner.lock().await;
        inner.dirty = false;
        inner.last_write = Some(Instant::now());
        inner.connectivity.record_success();
        drop(inner);
        tracing::info!("Room {} opened", host.room);
        Ok(host)
    }

    /// Re-attaches to an existing room by adopting its private partition.
    /// Actions still queued are treated as new.
    pub async fn resume(
        store: Arc<dyn RemoteStore>,
        room: RoomCode,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        let value = store.get(&room).await?;
        let view: HostView = serde_json::from_value(value)?;
        let mut machine = PhaseMachine::new(view.private_state.game.clone());
        machine.adopt_private(view.private_state);
        let host = Self::with_room(store, room, config, machine);
        host.inner.lock().await.connectivity.record_success();
        tracing::info!("Resumed room {}", host.room);
        Ok(host)
    }

    /// Pulls the private partition again, keeping local undo history and
    /// deck configs.
    pub async fn restore_from_store(&self) -> Result<(), SyncError> {
        let value = self.store.get(&self.room).await?;
        let view: HostView = serde_json::from_value(value)?;
        let mut inner = self.inner.lock().await;
        inner.machine.adopt_private(view.private_state);
        inner.seen_token = inner.machine.state.event_queue.token;
        inner.unpublished.clear();
        Ok(())
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs a moderator command. The result is flushed on the next tick when
    /// it succeeds.
    pub async fn command<T>(
        &self,
        f: impl FnOnce(&mut PhaseMachine) -> Result<T, GameError>,
    ) -> Result<T, SyncError> {
        let mut inner = self.inner.lock().await;
        let result = f(&mut inner.machine)?;
        inner.dirty = true;
        inner.collect_events();
        Ok(result)
    }

    pub async fn read<T>(&self, f: impl FnOnce(&PhaseMachine) -> T) -> T {
        f(&self.inner.lock().await.machine)
    }

    pub async fn public_state(&self) -> PublicState {
        self.read(|machine| machine.state.public_info()).await
    }

    pub async fn status(&self) -> HostStatus {
        let inner = self.inner.lock().await;
        let presence_timeout = self.config.presence_timeout();
        HostStatus {
            connected: inner.connectivity.is_connected(),
            client_present: inner
                .last_client_ping
                .is_some_and(|at| at.elapsed() < presence_timeout),
            last_action_id: inner.last_action_id,
            dirty: inner.dirty,
        }
    }

    /// One round trip with the store. Transport failures are counted towards
    /// the disconnect threshold and returned; nothing is lost, the next tick
    /// retries.
    pub async fn tick(&self) -> Result<TickReport, SyncError> {
        let Ok(_flight) = self.flight.try_lock() else {
            tracing::debug!("Host tick dropped, previous tick still in flight");
            return Ok(TickReport {
                skipped: true,
                ..Default::default()
            });
        };

        let result = self.exchange().await;
        let mut inner = self.inner.lock().await;
        match &result {
            Ok(_) => {
                if inner.connectivity.record_success() {
                    tracing::info!("Room {} store connection restored", self.room);
                }
            }
            Err(err) => {
                tracing::warn!("Room {} sync failed: {err}", self.room);
                if inner.connectivity.record_failure() {
                    tracing::warn!("Room {} store connection lost", self.room);
                }
            }
        }
        result
    }

    async fn exchange(&self) -> Result<TickReport, SyncError> {
        let mut report = TickReport::default();

        let actions = self.store.drain_actions(&self.room).await?;
        if !actions.is_empty() {
            let watermark = {
                let mut inner = self.inner.lock().await;
                report.applied = inner.apply_batch(actions);
                inner.last_action_id
            };
            if let Some(upto) = watermark {
                self.store.clear_actions(&self.room, upto).await?;
                report.cleared_upto = Some(upto);
            }
        }

        let now = now_ms();
        let pending_blob = {
            let mut inner = self.inner.lock().await;
            if inner.dirty {
                inner.dirty = false;
                inner.merge_unpublished();
                Some(serde_json::to_value(inner.blob(now))?)
            } else {
                None
            }
        };
        if let Some(blob) = pending_blob {
            if let Err(err) = self.store.set(&self.room, blob).await {
                self.inner.lock().await.dirty = true;
                return Err(err);
            }
            let mut inner = self.inner.lock().await;
            inner.last_write = Some(Instant::now());
            inner.unpublished.clear();
            report.wrote_state = true;
            return Ok(report);
        }

        let heartbeat_due = {
            let inner = self.inner.lock().await;
            inner
                .last_write
                .map_or(true, |at| at.elapsed() >= self.config.heartbeat())
        };
        if heartbeat_due {
            self.store.patch(&self.room, heartbeat_patch(now)).await?;
            self.inner.lock().await.last_write = Some(Instant::now());
            report.wrote_heartbeat = true;
        }
        Ok(report)
    }

    /// Ticks every `host_poll_ms` until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.host_poll());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // failures are already logged and counted
                    let _ = self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Host loop for room {} stopped", self.room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use types::Phase;

    fn machine() -> PhaseMachine {
        PhaseMachine::with_players(&(1..=8).map(|i| format!("P{i}")).collect::<Vec<_>>())
    }

    fn raw(id: u64, intent: Intent) -> RawAction {
        RawAction {
            id,
            msg: serde_json::to_value(intent).unwrap(),
        }
    }

    fn inner() -> HostInner {
        HostInner {
            machine: machine(),
            last_action_id: None,
            dirty: false,
            last_write: None,
            last_client_ping: None,
            connectivity: Connectivity::new(6),
            seen_token: 0,
            unpublished: Vec::new(),
        }
    }

    #[test]
    fn test_watermark_skips_applied_ids() {
        let mut inner = inner();
        inner.last_action_id = Some(6);
        let applied = inner.apply_batch(vec![
            raw(5, Intent::ReqSync),
            raw(7, Intent::ReqSync),
            raw(6, Intent::ReqSync),
        ]);
        assert_eq!(applied, vec![7]);
        assert_eq!(inner.last_action_id, Some(7));
        assert!(inner.dirty);
    }

    #[test]
    fn test_presence_intents_do_not_dirty() {
        let mut inner = inner();
        inner.apply_batch(vec![
            raw(1, Intent::Hello {
                client_id: uuid::Uuid::new_v4(),
            }),
            raw(2, Intent::Ping),
        ]);
        assert!(!inner.dirty);
        assert!(inner.last_client_ping.is_some());
    }

    #[test]
    fn test_only_accepted_picks_and_sync_requests_dirty() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut inner = inner();
        inner
            .machine
            .start_deal(&mut StdRng::seed_from_u64(7))
            .unwrap();
        inner.apply_batch(vec![raw(1, Intent::Ping)]);
        assert!(!inner.dirty);
        inner.apply_batch(vec![raw(
            2,
            Intent::DealPick {
                card_index: 3,
                player_id: 3,
            },
        )]);
        assert!(inner.dirty);
        assert_eq!(inner.machine.state.cards_used(), 1);

        inner.dirty = false;
        inner.apply_batch(vec![raw(3, Intent::ReqSync)]);
        assert!(inner.dirty);
    }

    #[test]
    fn test_picks_in_one_batch_publish_every_reveal() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut inner = inner();
        inner
            .machine
            .start_deal(&mut StdRng::seed_from_u64(7))
            .unwrap();
        inner.collect_events();
        inner.unpublished.clear();
        inner.apply_batch(
            (0..3)
                .map(|seat| {
                    raw(
                        seat as u64 + 1,
                        Intent::DealPick {
                            card_index: seat,
                            player_id: seat,
                        },
                    )
                })
                .collect(),
        );
        inner.merge_unpublished();
        let seats = inner
            .machine
            .state
            .event_queue
            .events
            .iter()
            .map(|event| match event {
                NarrativeEvent::DealReveal { player_id, .. } => Some(*player_id),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(seats, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_rejected_and_garbled_intents_advance_watermark() {
        let mut inner = inner();
        let applied = inner.apply_batch(vec![
            raw(1, Intent::DealPick {
                card_index: 0,
                player_id: 0,
            }),
            RawAction {
                id: 2,
                msg: json!({"type": "NOT_A_THING"}),
            },
        ]);
        assert_eq!(applied, vec![1, 2]);
        assert!(!inner.dirty);
        assert_eq!(inner.machine.phase(), Phase::Setup);
    }

    #[tokio::test]
    async fn test_tick_clears_then_writes_once() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::default());
        let room: RoomCode = "2468".parse().unwrap();
        let host = HostSync::open_with_code(store.clone(), room.clone(), SyncConfig::default(), machine())
            .await
            .unwrap();
        for _ in 0..3 {
            store
                .append_action(&room, serde_json::to_value(Intent::ReqSync).unwrap())
                .await
                .unwrap();
        }
        let report = host.tick().await.unwrap();
        assert_eq!(report.applied, vec![1, 2, 3]);
        assert_eq!(report.cleared_upto, Some(3));
        assert!(report.wrote_state);
        assert!(store.drain_actions(&room).await.unwrap().is_empty());

        let idle = host.tick().await.unwrap();
        assert!(idle.applied.is_empty());
        assert!(!idle.wrote_state);
        assert!(!idle.wrote_heartbeat);
    }

    #[tokio::test]
    async fn test_command_marks_dirty() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::default());
        let host = HostSync::open(store.clone(), SyncConfig::default(), machine())
            .await
            .unwrap();
        assert!(!host.status().await.dirty);
        assert!(host.command(|m| m.begin_vote()).await.is_err());
        assert!(!host.status().await.dirty);
        host.command(|m| {
            m.force_end();
            Ok(())
        })
        .await
        .unwrap();
        assert!(host.status().await.dirty);
        assert!(host.tick().await.unwrap().wrote_state);
    }
}
