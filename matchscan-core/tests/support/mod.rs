#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use matchscan_contracts::prelude::*;
use matchscan_core::{Clock, ProviderRegistry, ScanCoordinator, ScanEventBus};
use matchscan_model::{
    CollectionId, EventId, GameId, GameSettings, MatchOrdering, MatchOutcome,
    MatchResult, PartitionId, PlayerId, ScheduledEvent,
};

pub const LABEL: &str = "scanner-01";

pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
}

pub fn scheduled_event() -> ScheduledEvent {
    ScheduledEvent {
        id: EventId::new("spring-ladder"),
        live_start: event_start(),
        event_end: event_start() + TimeDelta::hours(1),
        game: GameSettings {
            game_id: GameId::StarCraft,
            refresh_interval: TimeDelta::minutes(15),
            matches_per_query: 25,
        },
    }
}

pub fn win_at(played_at: DateTime<Utc>) -> MatchResult {
    MatchResult {
        outcome: MatchOutcome::Win,
        played_at,
        map: "Alcyone LE".to_string(),
        match_type: "SOLO".to_string(),
        decision: "WIN".to_string(),
        counts_toward_official: true,
    }
}

pub fn loss_at(played_at: DateTime<Utc>) -> MatchResult {
    MatchResult {
        outcome: MatchOutcome::Loss,
        decision: "LOSS".to_string(),
        ..win_at(played_at)
    }
}

/// Wall clock that follows tokio's (paused) clock from a fixed origin, plus
/// manual jumps.
pub struct TestClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
    offset: Mutex<TimeDelta>,
}

impl TestClock {
    pub fn starting_at(base: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            base,
            origin: tokio::time::Instant::now(),
            offset: Mutex::new(TimeDelta::zero()),
        })
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap();
        self.base + elapsed + *self.offset.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Distributed tasks
// ---------------------------------------------------------------------------

/// Everything participants reported on a task.
#[derive(Default)]
pub struct TaskJournal {
    pub leaves: Mutex<Vec<(String, ParticipantState)>>,
    pub heartbeats: AtomicU64,
    pub app_states: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<(InfoLevel, String)>>,
    pub records: Mutex<Vec<HashMap<String, InfoValue>>>,
    pub work_items: AtomicU64,
}

impl TaskJournal {
    pub fn leaves(&self) -> Vec<(String, ParticipantState)> {
        self.leaves.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<HashMap<String, InfoValue>> {
        self.records.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<(InfoLevel, String)> {
        self.infos.lock().unwrap().clone()
    }
}

struct TaskState {
    id: String,
    task_type: String,
    param_string: String,
    participants: Mutex<HashSet<String>>,
    over: AtomicBool,
    journal: Arc<TaskJournal>,
}

#[derive(Clone)]
pub struct MemoryTask {
    state: Arc<TaskState>,
}

impl MemoryTask {
    pub fn new(id: &str, task_type: &str, param_string: &str) -> Self {
        Self {
            state: Arc::new(TaskState {
                id: id.to_string(),
                task_type: task_type.to_string(),
                param_string: param_string.to_string(),
                participants: Mutex::new(HashSet::new()),
                over: AtomicBool::new(false),
                journal: Arc::new(TaskJournal::default()),
            }),
        }
    }

    pub fn journal(&self) -> Arc<TaskJournal> {
        Arc::clone(&self.state.journal)
    }

    pub fn is_over(&self) -> bool {
        self.state.over.load(Ordering::SeqCst)
    }

    fn join_as(
        &self,
        participant: &str,
        started: bool,
    ) -> ContractResult<Arc<dyn ParticipationHandle>> {
        if self.is_over() {
            return Err(ContractError::TaskIsOver);
        }
        self.state
            .participants
            .lock()
            .unwrap()
            .insert(participant.to_string());
        Ok(Arc::new(MemoryParticipation {
            task: Arc::clone(&self.state),
            participant: participant.to_string(),
            started,
        }))
    }
}

#[async_trait]
impl DistributedTask for MemoryTask {
    fn task_id(&self) -> &str {
        &self.state.id
    }

    fn task_type_id(&self) -> &str {
        &self.state.task_type
    }

    fn param_string(&self) -> &str {
        &self.state.param_string
    }

    async fn join(
        &self,
        participant: &str,
    ) -> ContractResult<Arc<dyn ParticipationHandle>> {
        self.join_as(participant, false)
    }
}

struct MemoryParticipation {
    task: Arc<TaskState>,
    participant: String,
    started: bool,
}

#[async_trait]
impl ParticipationHandle for MemoryParticipation {
    fn was_task_started(&self) -> bool {
        self.started
    }

    async fn leave(&self, state: ParticipantState) -> ContractResult<bool> {
        self.task
            .journal
            .leaves
            .lock()
            .unwrap()
            .push((self.participant.clone(), state));

        let mut participants = self.task.participants.lock().unwrap();
        participants.remove(&self.participant);
        let last = state == ParticipantState::Complete && participants.is_empty();
        if last {
            self.task.over.store(true, Ordering::SeqCst);
        }
        Ok(last)
    }

    async fn heartbeat(&self) -> ContractResult<()> {
        self.task.journal.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_app_state(&self, state: &str) -> ContractResult<()> {
        self.task
            .journal
            .app_states
            .lock()
            .unwrap()
            .push(state.to_string());
        Ok(())
    }

    async fn add_info(
        &self,
        level: InfoLevel,
        message: &str,
        _detail: Option<&str>,
    ) -> ContractResult<()> {
        self.task
            .journal
            .infos
            .lock()
            .unwrap()
            .push((level, message.to_string()));
        Ok(())
    }

    fn create_detailed_info_record(
        &self,
        _level: InfoLevel,
    ) -> Box<dyn DetailedInfoRecord> {
        Box::new(MemoryRecord {
            journal: Arc::clone(&self.task.journal),
            entries: HashMap::new(),
        })
    }

    async fn increment_work_items_completed(
        &self,
        count: u64,
    ) -> ContractResult<()> {
        self.task.journal.work_items.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryRecord {
    journal: Arc<TaskJournal>,
    entries: HashMap<String, InfoValue>,
}

#[async_trait]
impl DetailedInfoRecord for MemoryRecord {
    fn add_entry(&mut self, key: &str, value: InfoValue) {
        self.entries.insert(key.to_string(), value);
    }

    async fn save(&mut self) -> ContractResult<()> {
        self.journal
            .records
            .lock()
            .unwrap()
            .push(std::mem::take(&mut self.entries));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTaskManager {
    tasks: Mutex<HashMap<String, MemoryTask>>,
}

impl MemoryTaskManager {
    pub fn task(&self, task_id: &str) -> Option<MemoryTask> {
        self.tasks.lock().unwrap().get(task_id).cloned()
    }

    pub fn requests(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskManager for MemoryTaskManager {
    async fn join_or_begin(
        &self,
        request: TaskRequest,
    ) -> ContractResult<Arc<dyn ParticipationHandle>> {
        let (task, started) = {
            let mut tasks = self.tasks.lock().unwrap();
            match tasks.get(&request.task_id) {
                Some(task) => (task.clone(), false),
                None => {
                    let task = MemoryTask::new(
                        &request.task_id,
                        &request.task_type,
                        &request.param_string,
                    );
                    tasks.insert(request.task_id.clone(), task.clone());
                    (task, true)
                }
            }
        };
        task.join_as(&request.participant, started)
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub struct MemoryPlayer {
    id: PlayerId,
    token: String,
    matches: Mutex<Vec<MatchResult>>,
    continuation: Mutex<Option<String>>,
    error_count: AtomicU32,
    flush_failures: AtomicU32,
    credited_wins: AtomicU32,
    lease_expired: Arc<AtomicBool>,
}

impl MemoryPlayer {
    fn check_lease(&self) -> ContractResult<()> {
        if self.lease_expired.load(Ordering::SeqCst) {
            return Err(ContractError::LeaseExpired);
        }
        Ok(())
    }

    pub fn stored(&self) -> Vec<MatchResult> {
        self.matches.lock().unwrap().clone()
    }

    pub fn set_stored(&self, matches: Vec<MatchResult>) {
        *self.matches.lock().unwrap() = matches;
    }

    pub fn errors(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }

    pub fn credited_wins(&self) -> u32 {
        self.credited_wins.load(Ordering::SeqCst)
    }

    /// The next `count` flushes fail with a transient storage fault.
    pub fn fail_flushes(&self, count: u32) {
        self.flush_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl WritablePlayerResults for MemoryPlayer {
    fn player_id(&self) -> &PlayerId {
        &self.id
    }

    fn results_token(&self) -> &str {
        &self.token
    }

    fn continuation_token(&self) -> Option<String> {
        self.continuation.lock().unwrap().clone()
    }

    fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }

    async fn get_matches(
        &self,
        max_count: u32,
    ) -> ContractResult<Vec<MatchResult>> {
        self.check_lease()?;
        let matches = self.matches.lock().unwrap();
        Ok(matches.iter().take(max_count as usize).cloned().collect())
    }

    async fn add_matches_and_flush(
        &self,
        new_matches: &[MatchResult],
        continuation_token: Option<&str>,
        win_delta: u32,
    ) -> ContractResult<()> {
        self.check_lease()?;
        if self
            .flush_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(ContractError::Storage("flush timed out".to_string()));
        }

        let mut matches = self.matches.lock().unwrap();
        let mut merged = new_matches.to_vec();
        merged.extend(matches.drain(..));
        *matches = merged;
        *self.continuation.lock().unwrap() = continuation_token.map(str::to_string);
        self.credited_wins.fetch_add(win_delta, Ordering::SeqCst);
        Ok(())
    }

    async fn update_error_count(&self, error_count: u32) -> ContractResult<()> {
        self.error_count.store(error_count, Ordering::SeqCst);
        Ok(())
    }
}

struct PartitionState {
    id: PartitionId,
    last_refreshed: Option<DateTime<Utc>>,
    leased_until: Option<DateTime<Utc>>,
    wins: u64,
    lease_expired: Arc<AtomicBool>,
    players: Vec<Arc<MemoryPlayer>>,
}

struct CollectionState {
    clock: Arc<dyn Clock>,
    partitions: Mutex<Vec<PartitionState>>,
    expire_next_lease: AtomicBool,
    leases_granted: AtomicU64,
}

/// Result collection with staleness-aware partition selection.
#[derive(Clone)]
pub struct MemoryCollection {
    state: Arc<CollectionState>,
}

impl MemoryCollection {
    /// `partitions` lists the provider tokens of each partition's players.
    pub fn new(clock: Arc<dyn Clock>, partitions: &[&[&str]]) -> Self {
        let partitions = partitions
            .iter()
            .enumerate()
            .map(|(index, tokens)| {
                let lease_expired = Arc::new(AtomicBool::new(false));
                let players = tokens
                    .iter()
                    .map(|token| {
                        Arc::new(MemoryPlayer {
                            id: PlayerId::new(format!("player-{token}")),
                            token: token.to_string(),
                            matches: Mutex::new(Vec::new()),
                            continuation: Mutex::new(None),
                            error_count: AtomicU32::new(0),
                            flush_failures: AtomicU32::new(0),
                            credited_wins: AtomicU32::new(0),
                            lease_expired: Arc::clone(&lease_expired),
                        })
                    })
                    .collect();
                PartitionState {
                    id: PartitionId::new(format!("partition-{index}")),
                    last_refreshed: None,
                    leased_until: None,
                    wins: 0,
                    lease_expired,
                    players,
                }
            })
            .collect();

        Self {
            state: Arc::new(CollectionState {
                clock,
                partitions: Mutex::new(partitions),
                expire_next_lease: AtomicBool::new(false),
                leases_granted: AtomicU64::new(0),
            }),
        }
    }

    pub fn player(&self, token: &str) -> Arc<MemoryPlayer> {
        let partitions = self.state.partitions.lock().unwrap();
        partitions
            .iter()
            .flat_map(|partition| partition.players.iter())
            .find(|player| player.token == token)
            .cloned()
            .unwrap()
    }

    pub fn partition_wins(&self, index: usize) -> u64 {
        self.state.partitions.lock().unwrap()[index].wins
    }

    pub fn last_refreshed(&self, index: usize) -> Option<DateTime<Utc>> {
        self.state.partitions.lock().unwrap()[index].last_refreshed
    }

    pub fn leases_granted(&self) -> u64 {
        self.state.leases_granted.load(Ordering::SeqCst)
    }

    /// The next lease handed out is already lost.
    pub fn expire_next_lease(&self) {
        self.state.expire_next_lease.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResultCollection for MemoryCollection {
    async fn next_player_collection_for_update(
        &self,
        stale_threshold: TimeDelta,
        lease_duration: TimeDelta,
    ) -> ContractResult<NextPartition> {
        let now = self.state.clock.now();
        let mut partitions = self.state.partitions.lock().unwrap();

        let stalest = partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.leased_until.is_none_or(|until| until <= now))
            .filter(|(_, p)| {
                p.last_refreshed
                    .is_none_or(|last| now - last > stale_threshold)
            })
            .min_by_key(|(_, p)| p.last_refreshed)
            .map(|(index, _)| index);

        let Some(index) = stalest else {
            let time_til_next_update = partitions
                .iter()
                .filter_map(|p| p.last_refreshed)
                .map(|last| last + stale_threshold - now)
                .min()
                .unwrap_or(stale_threshold)
                .max(TimeDelta::zero());
            return Ok(NextPartition::NoneStale {
                time_til_next_update,
            });
        };

        let partition = &mut partitions[index];
        partition.leased_until = Some(now + lease_duration);
        let expired = self.state.expire_next_lease.swap(false, Ordering::SeqCst);
        partition.lease_expired.store(expired, Ordering::SeqCst);
        self.state.leases_granted.fetch_add(1, Ordering::SeqCst);

        Ok(NextPartition::Stale(StalePartition {
            partition_id: partition.id.clone(),
            players: partition
                .players
                .iter()
                .map(|player| Arc::clone(player) as Arc<dyn WritablePlayerResults>)
                .collect(),
            lock: Box::new(MemoryLock {
                collection: Arc::clone(&self.state),
                index,
                wins: 0,
            }),
        }))
    }
}

struct MemoryLock {
    collection: Arc<CollectionState>,
    index: usize,
    wins: u64,
}

#[async_trait]
impl PartitionLock for MemoryLock {
    fn add_wins(&mut self, wins: u64) {
        self.wins += wins;
    }

    async fn release(&mut self) -> ContractResult<()> {
        let now = self.collection.clock.now();
        let mut partitions = self.collection.partitions.lock().unwrap();
        let partition = &mut partitions[self.index];
        partition.leased_until = None;
        if partition.lease_expired.swap(false, Ordering::SeqCst) {
            return Err(ContractError::LeaseExpired);
        }
        partition.last_refreshed = Some(now);
        partition.wins += self.wins;
        Ok(())
    }
}

pub struct MemoryEvent {
    id: EventId,
    collections: Mutex<HashMap<CollectionId, MemoryCollection>>,
    layout: Vec<Vec<String>>,
    clock: Arc<dyn Clock>,
}

impl MemoryEvent {
    /// The collection, created with the event's layout on first access.
    fn collection(&self, collection_id: &CollectionId) -> MemoryCollection {
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection_id.clone())
            .or_insert_with(|| {
                let layout: Vec<Vec<&str>> = self
                    .layout
                    .iter()
                    .map(|tokens| tokens.iter().map(String::as_str).collect())
                    .collect();
                let layout: Vec<&[&str]> = layout.iter().map(Vec::as_slice).collect();
                MemoryCollection::new(Arc::clone(&self.clock), &layout)
            })
            .clone()
    }
}

#[async_trait]
impl MatchHistoryEvent for MemoryEvent {
    fn event_id(&self) -> &EventId {
        &self.id
    }

    async fn result_collection(
        &self,
        collection_id: &CollectionId,
    ) -> ContractResult<Arc<dyn ResultCollection>> {
        Ok(Arc::new(self.collection(collection_id)))
    }
}

/// Storage holding one event whose collections share a partition layout.
pub struct MemoryStorage {
    event: Arc<MemoryEvent>,
}

impl MemoryStorage {
    pub fn new(
        clock: Arc<dyn Clock>,
        event_id: &EventId,
        partitions: &[&[&str]],
    ) -> Self {
        Self {
            event: Arc::new(MemoryEvent {
                id: event_id.clone(),
                collections: Mutex::new(HashMap::new()),
                layout: partitions
                    .iter()
                    .map(|tokens| tokens.iter().map(|t| t.to_string()).collect())
                    .collect(),
                clock,
            }),
        }
    }

    pub fn collection(&self, collection_id: &CollectionId) -> MemoryCollection {
        self.event.collection(collection_id)
    }
}

#[async_trait]
impl MatchHistoryStorage for MemoryStorage {
    async fn get_event(
        &self,
        event_id: &EventId,
    ) -> ContractResult<Arc<dyn MatchHistoryEvent>> {
        if *event_id != self.event.id {
            return Err(ContractError::NotFound(format!("event {event_id}")));
        }
        Ok(Arc::clone(&self.event) as Arc<dyn MatchHistoryEvent>)
    }
}

// ---------------------------------------------------------------------------
// Provider and registrations
// ---------------------------------------------------------------------------

/// Provider returning scripted histories, most recent first unless told
/// otherwise.
pub struct ScriptedProvider {
    histories: Mutex<HashMap<String, Vec<MatchResult>>>,
    failures: Mutex<HashMap<String, VecDeque<ContractError>>>,
    order: Mutex<MatchOrdering>,
    calls: AtomicU64,
    latency: Mutex<Option<std::time::Duration>>,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            order: Mutex::new(MatchOrdering::MostRecentlyPlayedFirst),
            calls: AtomicU64::new(0),
            latency: Mutex::new(None),
            in_flight: AtomicU64::new(0),
            peak_in_flight: AtomicU64::new(0),
        }
    }
}

impl ScriptedProvider {
    pub fn set_history(&self, token: &str, matches: Vec<MatchResult>) {
        self.histories
            .lock()
            .unwrap()
            .insert(token.to_string(), matches);
    }

    /// Records a newly played match at the top of the history.
    pub fn play(&self, token: &str, result: MatchResult) {
        self.histories
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .insert(0, result);
    }

    pub fn fail_next(&self, token: &str, error: ContractError) {
        self.failures
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn set_order(&self, order: MatchOrdering) {
        *self.order.lock().unwrap() = order;
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every fetch sleeps for `latency` before answering.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Most fetches observed in flight at once since the last reset.
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_peak(&self) {
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl MatchResultsProvider for ScriptedProvider {
    async fn get_matches_for_player(
        &self,
        provider_player_id: &str,
        _continuation_token: Option<&str>,
    ) -> ContractResult<ProviderMatches> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if let Some(error) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(provider_player_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        let matches = self
            .histories
            .lock()
            .unwrap()
            .get(provider_player_id)
            .cloned()
            .unwrap_or_default();
        Ok(ProviderMatches {
            continuation_token: None,
            order: *self.order.lock().unwrap(),
            matches,
        })
    }
}

#[derive(Default)]
pub struct MemoryRegistrations {
    wins: Mutex<HashMap<PlayerId, u32>>,
    transient_failures: AtomicU32,
}

impl MemoryRegistrations {
    pub fn wins(&self, player: &str) -> u32 {
        self.wins
            .lock()
            .unwrap()
            .get(&PlayerId::new(format!("player-{player}")))
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_next(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrations {
    async fn add_wins(
        &self,
        player: &PlayerId,
        _event: &EventId,
        wins: u32,
    ) -> ContractResult<()> {
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(ContractError::Storage("deadlock victim".to_string()));
        }
        *self.wins.lock().unwrap().entry(player.clone()).or_default() += wins;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub clock: Arc<TestClock>,
    pub tasks: Arc<MemoryTaskManager>,
    pub storage: Arc<MemoryStorage>,
    pub provider: Arc<ScriptedProvider>,
    pub registrations: Arc<MemoryRegistrations>,
    pub events: Arc<ScanEventBus>,
    pub event: ScheduledEvent,
}

impl Harness {
    /// Event starting at [`event_start`] with one hour of play; the clock
    /// starts at `now`.
    pub fn new(now: DateTime<Utc>, partitions: &[&[&str]]) -> Self {
        let clock = TestClock::starting_at(now);
        let event = scheduled_event();
        Self {
            storage: Arc::new(MemoryStorage::new(
                Arc::clone(&clock) as Arc<dyn Clock>,
                &event.id,
                partitions,
            )),
            clock,
            tasks: Arc::new(MemoryTaskManager::default()),
            provider: Arc::new(ScriptedProvider::default()),
            registrations: Arc::new(MemoryRegistrations::default()),
            events: Arc::new(ScanEventBus::default()),
            event,
        }
    }

    pub fn coordinator(&self) -> ScanCoordinator {
        let providers = ProviderRegistry::new().with_provider(
            GameId::StarCraft,
            Arc::clone(&self.provider) as Arc<dyn MatchResultsProvider>,
        );
        ScanCoordinator::new(
            LABEL,
            Arc::clone(&self.tasks) as Arc<dyn TaskManager>,
            Arc::clone(&self.storage) as Arc<dyn MatchHistoryStorage>,
            Arc::new(providers),
            Arc::clone(&self.registrations) as Arc<dyn RegistrationStore>,
        )
        .with_clock(Arc::clone(&self.clock) as Arc<dyn Clock>)
        .with_events(Arc::clone(&self.events))
    }

    pub fn task(&self, task_id: &str) -> MemoryTask {
        self.tasks.task(task_id).unwrap()
    }
}
