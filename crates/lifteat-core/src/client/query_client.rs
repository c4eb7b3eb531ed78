use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::QueryError;
use super::filter::QueryFilter;
use super::managers::{FocusManager, FocusSink, OnlineManager, OnlineSink};
use crate::cache::{CacheConfig, CacheEntry, CacheOverrides, FetchStatus, QueryKey};
use crate::category::DataCategory;
use crate::config::ClientConfig;

/// Type-erased fetcher kept with each entry so it can be refetched later.
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

pub(crate) fn into_fetcher<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Serialize + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move {
            let data = fut.await?;
            Ok::<Value, anyhow::Error>(serde_json::to_value(data)?)
        }
        .boxed()
    })
}

/// Backoff between fetch attempts: `base_delay * 2^attempt`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

/// Diagnostic view of one entry.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySnapshot {
    pub key: QueryKey,
    pub category: DataCategory,
    pub status: FetchStatus,
    pub stale: bool,
    pub age: String,
}

struct QueryState {
    entry: CacheEntry,
    config: CacheConfig,
    fetcher: Option<Fetcher>,
    /// Bumped whenever an in-flight fetch of this entry settles.
    settled: watch::Sender<()>,
}

impl QueryState {
    fn new(category: DataCategory, config: CacheConfig) -> Self {
        let (settled, _) = watch::channel(());
        Self {
            entry: CacheEntry::new(category),
            config,
            fetcher: None,
            settled,
        }
    }

    /// Mark the entry as waiting for the network and serve whatever it has.
    fn pause(&mut self, key: &QueryKey) -> Result<Value, QueryError> {
        self.entry.status = FetchStatus::Paused;
        match &self.entry.data {
            Some(data) => {
                debug!(key = %key, "Offline, serving cached data");
                Ok(data.clone())
            }
            None => {
                info!(key = %key, "Offline, query paused");
                Err(QueryError::Offline(key.clone()))
            }
        }
    }
}

/// Claim on an entry's fetch. While held the entry is `Fetching` and other
/// callers wait for it instead of running the fetcher again. Dropping the
/// claim wakes them, and a fetch that never finished (cancelled, or never
/// started) falls back to `Idle`.
struct InFlight<'a> {
    client: &'a QueryClient,
    key: QueryKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.client.queries.write().get_mut(&self.key) {
            if state.entry.status == FetchStatus::Fetching {
                state.entry.status = FetchStatus::Idle;
            }
            state.settled.send_modify(|_| ());
        }
    }
}

enum FetchStep {
    Ready(Result<Value, QueryError>),
    Wait(watch::Receiver<()>),
    Run(CacheConfig),
}

type RefetchTarget<'a> = (InFlight<'a>, Fetcher, CacheConfig);

/// In-memory query cache with category-tagged entries.
///
/// Entries hold JSON payloads; typed access goes through serde. The client
/// owns the online and focus flags and decides when paused or stale queries
/// are refetched.
pub struct QueryClient {
    queries: RwLock<HashMap<QueryKey, QueryState>>,
    online: OnlineManager,
    focus: FocusManager,
    retry: RetryPolicy,
    max_concurrent_refetches: usize,
    gc_interval: Duration,
    overrides: HashMap<DataCategory, CacheOverrides>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            queries: RwLock::new(HashMap::new()),
            online: OnlineManager::new(config.start_online),
            focus: FocusManager::default(),
            retry: RetryPolicy {
                base_delay: Duration::from_millis(config.retry_delay_ms),
                max_delay: Duration::from_millis(config.max_retry_delay_ms),
            },
            max_concurrent_refetches: config.max_concurrent_refetches.max(1),
            gc_interval: Duration::from_millis(config.gc_interval_ms.max(1)),
            overrides: config.cache_overrides.clone(),
        }
    }

    /// Effective policy for a category, file overrides included.
    pub fn config_for(&self, category: DataCategory) -> CacheConfig {
        let base = CacheConfig::for_category(category);
        match self.overrides.get(&category) {
            Some(overrides) => base.with_overrides(overrides),
            None => base,
        }
    }

    // ===== Connectivity and focus =====

    pub fn is_online(&self) -> bool {
        self.online.is_online()
    }

    /// Returns `true` on an actual transition.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.set_online(online)
    }

    pub fn is_focused(&self) -> bool {
        self.focus.is_focused()
    }

    pub fn set_focused(&self, focused: bool) -> bool {
        self.focus.set_focused(focused)
    }

    // ===== Reads and writes =====

    /// Return fresh cached data, or fetch it.
    ///
    /// Offline, stale data is served as-is and the entry is paused until
    /// the network returns; with nothing cached this yields
    /// [`QueryError::Offline`].
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        category: DataCategory,
        fetcher: F,
    ) -> Result<T, QueryError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let value = self
            .fetch_value(key.clone(), category, into_fetcher(fetcher))
            .await?;
        decode(&key, value)
    }

    /// Like [`fetch_query`](Self::fetch_query) without decoding the result.
    pub async fn prefetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        category: DataCategory,
        fetcher: F,
    ) -> Result<(), QueryError>
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.fetch_value(key, category, into_fetcher(fetcher))
            .await
            .map(|_| ())
    }

    pub(crate) async fn fetch_value(
        &self,
        key: QueryKey,
        category: DataCategory,
        fetcher: Fetcher,
    ) -> Result<Value, QueryError> {
        let mut joined = false;

        loop {
            let step = {
                let mut queries = self.queries.write();
                let state = queries
                    .entry(key.clone())
                    .or_insert_with(|| QueryState::new(category, self.config_for(category)));

                if state.entry.category != category {
                    return Err(QueryError::CategoryConflict {
                        existing: state.entry.category,
                        requested: category,
                        key,
                    });
                }

                state.fetcher = Some(Arc::clone(&fetcher));
                state.entry.touch();

                let fresh = state
                    .entry
                    .data
                    .as_ref()
                    .filter(|_| !state.entry.is_stale(state.config.stale_time))
                    .cloned();

                if let Some(data) = fresh {
                    debug!(key = %key, "Cache hit");
                    FetchStep::Ready(Ok(data))
                } else if state.entry.status == FetchStatus::Fetching {
                    debug!(key = %key, "Joining in-flight fetch");
                    FetchStep::Wait(state.settled.subscribe())
                } else if joined && state.entry.status == FetchStatus::Error {
                    FetchStep::Ready(Err(QueryError::Fetch {
                        key: key.clone(),
                        attempts: state.config.retry + 1,
                        message: state.entry.error.clone().unwrap_or_default(),
                    }))
                } else if !self.is_online() {
                    FetchStep::Ready(state.pause(&key))
                } else {
                    state.entry.status = FetchStatus::Fetching;
                    FetchStep::Run(state.config)
                }
            };

            match step {
                FetchStep::Ready(result) => return result,
                FetchStep::Wait(mut settled) => {
                    // An error means the entry was removed; start over.
                    let _ = settled.changed().await;
                    joined = true;
                }
                FetchStep::Run(config) => {
                    let _claim = InFlight {
                        client: self,
                        key: key.clone(),
                    };
                    return self.run_fetch(&key, &fetcher, &config).await;
                }
            }
        }
    }

    async fn run_fetch(
        &self,
        key: &QueryKey,
        fetcher: &Fetcher,
        config: &CacheConfig,
    ) -> Result<Value, QueryError> {
        let mut attempt: u32 = 0;

        loop {
            if !self.is_online() {
                let mut queries = self.queries.write();
                return match queries.get_mut(key) {
                    Some(state) => state.pause(key),
                    None => Err(QueryError::Offline(key.clone())),
                };
            }

            self.update_entry(key, |entry| entry.status = FetchStatus::Fetching);

            match (**fetcher)().await {
                Ok(data) => {
                    self.update_entry(key, |entry| entry.store(data.clone()));
                    debug!(key = %key, attempt, "Fetch succeeded");
                    return Ok(data);
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    let exhausted = attempt >= config.retry;
                    self.update_entry(key, |entry| {
                        entry.failure_count += 1;
                        entry.error = Some(message.clone());
                        if exhausted {
                            entry.status = FetchStatus::Error;
                        }
                    });

                    if exhausted {
                        warn!(key = %key, attempts = attempt + 1, error = %message, "Fetch failed");
                        return Err(QueryError::Fetch {
                            key: key.clone(),
                            attempts: attempt + 1,
                            message,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        key = %key,
                        retry = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn update_entry(&self, key: &QueryKey, update: impl FnOnce(&mut CacheEntry)) {
        if let Some(state) = self.queries.write().get_mut(key) {
            update(&mut state.entry);
        }
    }

    pub fn get_query_data<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<T>, QueryError> {
        let data = self.queries.write().get_mut(key).and_then(|state| {
            state.entry.touch();
            state.entry.data.clone()
        });
        data.map(|value| decode(key, value)).transpose()
    }

    pub fn set_query_data<T: Serialize>(
        &self,
        key: QueryKey,
        category: DataCategory,
        data: &T,
    ) -> Result<(), QueryError> {
        let value = serde_json::to_value(data)
            .map_err(|e| QueryError::Encode(key.clone(), e.to_string()))?;

        let mut queries = self.queries.write();
        let state = queries
            .entry(key.clone())
            .or_insert_with(|| QueryState::new(category, self.config_for(category)));

        if state.entry.category != category {
            return Err(QueryError::CategoryConflict {
                existing: state.entry.category,
                requested: category,
                key,
            });
        }

        state.entry.store(value);
        Ok(())
    }

    pub fn get_entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.queries.read().get(key).map(|state| state.entry.clone())
    }

    pub fn query_status(&self, key: &QueryKey) -> Option<FetchStatus> {
        self.queries.read().get(key).map(|state| state.entry.status)
    }

    pub fn len(&self) -> usize {
        self.queries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<QuerySnapshot> {
        let mut snapshot: Vec<QuerySnapshot> = self
            .queries
            .read()
            .iter()
            .map(|(key, state)| QuerySnapshot {
                key: key.clone(),
                category: state.entry.category,
                status: state.entry.status,
                stale: state.entry.is_stale(state.config.stale_time),
                age: state.entry.age_display(),
            })
            .collect();
        snapshot.sort_by_cached_key(|s| s.key.to_string());
        snapshot
    }

    // ===== Invalidation and refetch =====

    /// Mark matching entries stale. Returns how many matched.
    pub fn invalidate_queries(&self, filter: &QueryFilter) -> usize {
        let mut queries = self.queries.write();
        let mut count = 0;
        for (key, state) in queries.iter_mut() {
            if filter.matches(key, state.entry.category) {
                state.entry.invalidated = true;
                count += 1;
            }
        }
        debug!(?filter, count, "Invalidated queries");
        count
    }

    /// Refetch matching entries that have a known fetcher. Returns how many
    /// refetches succeeded; nothing runs while offline. Entries already
    /// being fetched are left to that fetch.
    pub async fn refetch_queries(&self, filter: &QueryFilter) -> usize {
        let targets = self.claim_targets(|key, state| filter.matches(key, state.entry.category));
        self.refetch_all(targets).await
    }

    /// Refetch every query paused while offline.
    pub async fn resume_paused_queries(&self) -> usize {
        let targets = self.claim_targets(|_, state| state.entry.status == FetchStatus::Paused);
        self.refetch_all(targets).await
    }

    /// Called on an offline to online transition.
    pub async fn on_reconnect(&self) -> usize {
        let targets = self.claim_targets(|_, state| {
            state.entry.status == FetchStatus::Paused
                || (state.config.refetch_on_reconnect
                    && state.entry.is_stale(state.config.stale_time))
        });
        self.refetch_all(targets).await
    }

    /// Called when the app regains focus.
    pub async fn on_focus(&self) -> usize {
        let targets = self.claim_targets(|_, state| {
            state.config.refetch_on_window_focus && state.entry.is_stale(state.config.stale_time)
        });
        self.refetch_all(targets).await
    }

    /// Mark matching entries `Fetching` and hand out their claims. Empty
    /// while offline.
    fn claim_targets(
        &self,
        predicate: impl Fn(&QueryKey, &QueryState) -> bool,
    ) -> Vec<RefetchTarget<'_>> {
        if !self.is_online() {
            return Vec::new();
        }

        let mut queries = self.queries.write();
        let mut targets = Vec::new();
        for (key, state) in queries.iter_mut() {
            if state.entry.status == FetchStatus::Fetching || !predicate(key, state) {
                continue;
            }
            if let Some(fetcher) = &state.fetcher {
                state.entry.status = FetchStatus::Fetching;
                let claim = InFlight {
                    client: self,
                    key: key.clone(),
                };
                targets.push((claim, Arc::clone(fetcher), state.config));
            }
        }
        targets
    }

    async fn refetch_all(&self, targets: Vec<RefetchTarget<'_>>) -> usize {
        if targets.is_empty() {
            return 0;
        }

        let total = targets.len();
        // No `stream::map` closure here: its higher-ranked lifetimes keep the
        // spawned worker from being `Send`.
        let mut fetches: Vec<BoxFuture<'_, bool>> = Vec::with_capacity(total);
        for (claim, fetcher, config) in targets {
            fetches.push(
                async move {
                    let ok = self.run_fetch(&claim.key, &fetcher, &config).await.is_ok();
                    drop(claim);
                    ok
                }
                .boxed(),
            );
        }

        let results: Vec<bool> = stream::iter(fetches)
            .buffer_unordered(self.max_concurrent_refetches)
            .collect()
            .await;
        let succeeded = results.into_iter().filter(|ok| *ok).count();

        debug!(total, succeeded, "Refetch finished");
        succeeded
    }

    // ===== Removal =====

    pub fn remove_queries(&self, filter: &QueryFilter) -> usize {
        let mut queries = self.queries.write();
        let before = queries.len();
        queries.retain(|key, state| !filter.matches(key, state.entry.category));
        before - queries.len()
    }

    pub fn clear(&self) {
        self.queries.write().clear();
    }

    /// Drop entries nobody has read within their category's gc window.
    pub fn garbage_collect(&self) -> usize {
        let mut queries = self.queries.write();
        let before = queries.len();
        queries.retain(|_, state| {
            state.entry.status == FetchStatus::Fetching
                || !state.entry.is_expired(state.config.gc_time)
        });
        let removed = before - queries.len();
        if removed > 0 {
            debug!(removed, "Garbage collected queries");
        }
        removed
    }

    // ===== Background worker =====

    /// Spawn the task that refetches on reconnect and on focus regain, and
    /// garbage collects every `gc_interval_ms`.
    ///
    /// The task holds a weak reference and stops once the client is dropped.
    pub fn spawn_lifecycle_worker(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let mut online_rx = self.online.subscribe();
        let mut focus_rx = self.focus.subscribe();
        let mut gc_timer = tokio::time::interval_at(Instant::now() + self.gc_interval, self.gc_interval);
        gc_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            // Flags notify only on transitions, so waking to `true` implies a
            // rising edge even when the `false` in between was coalesced.
            loop {
                tokio::select! {
                    changed = online_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *online_rx.borrow_and_update();
                        if online {
                            let Some(client) = weak.upgrade() else { break };
                            let refreshed = client.on_reconnect().await;
                            info!(refreshed, "Refetched queries after reconnect");
                        }
                    }
                    changed = focus_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let focused = *focus_rx.borrow_and_update();
                        if focused {
                            let Some(client) = weak.upgrade() else { break };
                            let refreshed = client.on_focus().await;
                            debug!(refreshed, "Refetched queries after focus");
                        }
                    }
                    _ = gc_timer.tick() => {
                        let Some(client) = weak.upgrade() else { break };
                        client.garbage_collect();
                    }
                }
            }

            debug!("Lifecycle worker stopped");
        })
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("queries", &self.len())
            .field("online", &self.is_online())
            .field("focused", &self.is_focused())
            .field("retry", &self.retry)
            .finish()
    }
}

impl OnlineSink for QueryClient {
    fn set_online(&self, online: bool) {
        QueryClient::set_online(self, online);
    }
}

impl FocusSink for QueryClient {
    fn set_focused(&self, focused: bool) {
        QueryClient::set_focused(self, focused);
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, value: Value) -> Result<T, QueryError> {
    serde_json::from_value(value).map_err(|e| QueryError::Decode(key.clone(), e.to_string()))
}
