//! Storage and cache test doubles
//!
//! Wrappers around `MemoryStore` that slow down, fail or bypass specific
//! operations, plus an in-memory roster cache and a scripted code source.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use meal_planner::database::store::{GroupStorage, MealStatusStorage};
use meal_planner::database::MemoryStore;
use meal_planner::models::{Group, MealStatusRecord, Role, RosterEntry};
use meal_planner::services::{InviteCodeSource, RosterCache};
use meal_planner::utils::errors::{MealPlannerError, Result};

/// Status reads take a per-date amount of (tokio) time
#[derive(Clone)]
pub struct SlowStatusStorage {
    inner: MemoryStore,
    delays: HashMap<NaiveDate, Duration>,
}

impl SlowStatusStorage {
    pub fn new(inner: MemoryStore, delays: Vec<(NaiveDate, Duration)>) -> Self {
        Self {
            inner,
            delays: delays.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MealStatusStorage for SlowStatusStorage {
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()> {
        self.inner.upsert_status(record).await
    }

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>> {
        if let Some(delay) = self.delays.get(&date) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.find_status(uid, date).await
    }
}

/// Status reads return what was stored when the read began, then take
/// `lag` of (tokio) time to arrive
#[derive(Clone)]
pub struct LaggingStatusStorage {
    inner: MemoryStore,
    lag: Duration,
}

impl LaggingStatusStorage {
    pub fn new(inner: MemoryStore, lag: Duration) -> Self {
        Self { inner, lag }
    }
}

#[async_trait]
impl MealStatusStorage for LaggingStatusStorage {
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()> {
        self.inner.upsert_status(record).await
    }

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>> {
        let snapshot = self.inner.find_status(uid, date).await;
        tokio::time::sleep(self.lag).await;
        snapshot
    }
}

/// Status reads for the listed users fail with a transient error
#[derive(Clone)]
pub struct FailingStatusStorage {
    inner: MemoryStore,
    failing_uids: HashSet<String>,
    reads: std::sync::Arc<AtomicUsize>,
}

impl FailingStatusStorage {
    pub fn new(inner: MemoryStore, failing_uids: &[&str]) -> Self {
        Self {
            inner,
            failing_uids: failing_uids.iter().map(|uid| uid.to_string()).collect(),
            reads: Default::default(),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MealStatusStorage for FailingStatusStorage {
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()> {
        self.inner.upsert_status(record).await
    }

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_uids.contains(uid) {
            return Err(MealPlannerError::Transient(format!("status read for {} timed out", uid)));
        }
        self.inner.find_status(uid, date).await
    }
}

/// Reports every code as free so uniqueness is only enforced by the write,
/// like two creators racing for the same code
#[derive(Clone)]
pub struct UncheckedCodes {
    inner: MemoryStore,
}

impl UncheckedCodes {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl GroupStorage for UncheckedCodes {
    async fn code_in_use(&self, _code: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create_group(&self, group: &Group, creator_uid: &str) -> Result<Group> {
        self.inner.create_group(group, creator_uid).await
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>> {
        self.inner.find_group(id).await
    }

    async fn find_group_by_code(&self, code: &str) -> Result<Option<Group>> {
        self.inner.find_group_by_code(code).await
    }

    async fn find_group_by_member(&self, uid: &str) -> Result<Option<Group>> {
        self.inner.find_group_by_member(uid).await
    }

    async fn add_member(&self, group_id: Uuid, uid: &str, role: Role) -> Result<Group> {
        self.inner.add_member(group_id, uid, role).await
    }
}

/// Hands out codes from a fixed script, repeating the last one when exhausted
pub struct ScriptedCodes {
    codes: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
            last: Mutex::new(codes.last().map(|c| c.to_string()).unwrap_or_default()),
        }
    }
}

impl InviteCodeSource for ScriptedCodes {
    fn next_code(&self) -> String {
        match self.codes.lock().unwrap().pop_front() {
            Some(code) => code,
            None => self.last.lock().unwrap().clone(),
        }
    }
}

/// Roster cache kept in a map, counting hits and invalidations
#[derive(Default)]
pub struct InMemoryRosterCache {
    state: Mutex<CacheState>,
    pub hits: AtomicUsize,
    pub invalidations: AtomicUsize,
}

#[derive(Default)]
struct CacheState {
    generations: HashMap<Uuid, u64>,
    entries: HashMap<(Uuid, NaiveDate), (u64, Vec<RosterEntry>)>,
}

impl CacheState {
    fn generation(&self, group_id: Uuid) -> u64 {
        self.generations.get(&group_id).copied().unwrap_or(0)
    }

    fn current(&self, group_id: Uuid, date: NaiveDate) -> Option<&Vec<RosterEntry>> {
        match self.entries.get(&(group_id, date)) {
            Some((stamp, roster)) if *stamp == self.generation(group_id) => Some(roster),
            _ => None,
        }
    }
}

impl InMemoryRosterCache {
    /// Whether a servable roster is cached for the pair
    pub fn contains(&self, group_id: Uuid, date: NaiveDate) -> bool {
        self.state.lock().unwrap().current(group_id, date).is_some()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RosterCache for InMemoryRosterCache {
    async fn generation(&self, group_id: Uuid) -> Result<u64> {
        Ok(self.state.lock().unwrap().generation(group_id))
    }

    async fn get_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<Option<Vec<RosterEntry>>> {
        let roster = self.state.lock().unwrap().current(group_id, date).cloned();
        if roster.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(roster)
    }

    async fn put_roster(&self, group_id: Uuid, date: NaiveDate, generation: u64, roster: &[RosterEntry]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert((group_id, date), (generation, roster.to_vec()));
        Ok(())
    }

    async fn invalidate_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        *state.generations.entry(group_id).or_default() += 1;
        state.entries.remove(&(group_id, date));
        Ok(())
    }

    async fn invalidate_group(&self, group_id: Uuid) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        *state.generations.entry(group_id).or_default() += 1;
        state.entries.retain(|(id, _), _| *id != group_id);
        Ok(())
    }
}
