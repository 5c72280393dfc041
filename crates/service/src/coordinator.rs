//! Per-index snapshot cache with single-flight refresh.
//!
//! Each index owns an independent slot: the refresh phase (`Idle` or
//! `InFlight`), the last good snapshot, a bounded history, refresh
//! bookkeeping and the debug rings. Every piece sits behind its own lock and
//! no lock is shared between indices.
//!
//! The cached snapshot only changes while the state lock is held, and readers
//! take the state lock before reading it, so a reader never pairs a new
//! snapshot with the previous cycle's error or success time. Lock order is
//! phase, then state, then cached or history.
//!
//! A refresh runs on a spawned task, so it completes even if every caller
//! awaiting it is dropped. Callers arriving while a refresh is in flight
//! await the same shared result instead of issuing another upstream fetch.
//! Readers only take short, non-async locks and never wait on a refresh.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use gamma_core::{
    Clock, DebugEvent, DebugEventKind, FilterConfig, IndexProfile, MarketDataProvider,
    RefreshError, ServiceConfig, Snapshot, SnapshotError, SystemClock, SystemStatus,
    VolatilityOracle,
};
use gamma_strategy::StrategyEvaluator;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::debug_ring::{DebugEventRing, RuleStats};
use crate::error::ServiceError;
use crate::history::SnapshotHistory;
use crate::journal::SnapshotJournal;
use crate::pipeline::SnapshotPipeline;
use crate::report::{
    DebugReport, HealthReport, IndexHealth, LogPointers, RefreshState, ServiceStatus,
    SnapshotSummary,
};

/// Events shown in the debug report.
pub const DEBUG_EVENT_VIEW: usize = 80;
/// Warnings and errors shown in the debug report.
pub const DEBUG_ERROR_VIEW: usize = 50;

type RefreshResult = Result<Arc<Snapshot>, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

enum RefreshPhase {
    Idle,
    InFlight(SharedRefresh),
}

struct IndexSlot {
    profile: IndexProfile,
    phase: Mutex<RefreshPhase>,
    cached: RwLock<Option<Arc<Snapshot>>>,
    history: Mutex<SnapshotHistory>,
    state: Mutex<RefreshState>,
    debug: Mutex<DebugEventRing>,
    rule_stats: Mutex<RuleStats>,
}

impl IndexSlot {
    /// Snapshot and refresh state as of the same commit.
    fn read_consistent(&self) -> (Option<Arc<Snapshot>>, RefreshState) {
        let state = self.state.lock();
        let cached = self.cached.read().clone();
        (cached, state.clone())
    }

    fn new(profile: IndexProfile, history_capacity: usize) -> Self {
        Self {
            profile,
            phase: Mutex::new(RefreshPhase::Idle),
            cached: RwLock::new(None),
            history: Mutex::new(SnapshotHistory::new(history_capacity)),
            state: Mutex::new(RefreshState::default()),
            debug: Mutex::new(DebugEventRing::default()),
            rule_stats: Mutex::new(RuleStats::default()),
        }
    }
}

/// Returns the slot to `Idle` when the refresh task ends, including by panic.
struct InFlightGuard {
    slot: Arc<IndexSlot>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut phase = self.slot.phase.lock();
        *phase = RefreshPhase::Idle;
        self.slot.state.lock().in_flight = false;
    }
}

#[derive(Debug, Clone)]
struct Settings {
    refresh_seconds: u64,
    stale_after_seconds: f64,
    history_limit_max: usize,
    fast_mode: bool,
    log_file: Option<PathBuf>,
}

struct Inner {
    provider: Arc<dyn MarketDataProvider>,
    pipeline: SnapshotPipeline,
    clock: Arc<dyn Clock>,
    journal: Option<SnapshotJournal>,
    settings: Settings,
    /// Fixed at construction; only the slot contents change.
    slots: BTreeMap<String, Arc<IndexSlot>>,
}

// ============================================================================
// Builder
// ============================================================================

pub struct CoordinatorBuilder {
    service: ServiceConfig,
    filters: FilterConfig,
    provider: Arc<dyn MarketDataProvider>,
    oracle: Option<Arc<dyn VolatilityOracle>>,
    clock: Arc<dyn Clock>,
    log_file: Option<PathBuf>,
}

impl CoordinatorBuilder {
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn VolatilityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Log file path reported in the debug view.
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Normalizes the service settings first, so a zero or negative interval
    /// is raised to the minimum.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnknownIndex`] if a configured index has no profile.
    pub fn build(self) -> Result<SnapshotCoordinator, SnapshotError> {
        let service = self.service.normalized();
        let mut slots = BTreeMap::new();
        for code in &service.indices {
            let profile = IndexProfile::for_code(code).ok_or_else(|| SnapshotError::UnknownIndex {
                index: code.clone(),
            })?;
            slots.insert(
                profile.code.clone(),
                Arc::new(IndexSlot::new(profile, service.history_capacity)),
            );
        }

        let mut evaluator = StrategyEvaluator::new(self.filters)
            .with_fast_mode(service.fast_mode)
            .with_warn_penalty(service.warn_penalty);
        if let Some(oracle) = self.oracle {
            evaluator = evaluator.with_oracle(oracle);
        }

        let settings = Settings {
            refresh_seconds: service.refresh_seconds,
            stale_after_seconds: service.stale_after_seconds(),
            history_limit_max: service.history_limit_max,
            fast_mode: service.fast_mode,
            log_file: self.log_file,
        };

        Ok(SnapshotCoordinator {
            inner: Arc::new(Inner {
                provider: self.provider,
                pipeline: SnapshotPipeline::new(evaluator, service.top_levels),
                clock: self.clock,
                journal: service.journal_dir.map(SnapshotJournal::new),
                settings,
                slots,
            }),
        })
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Cheap to clone; all clones share the same slots.
#[derive(Clone)]
pub struct SnapshotCoordinator {
    inner: Arc<Inner>,
}

impl SnapshotCoordinator {
    #[must_use]
    pub fn builder(
        service: ServiceConfig,
        filters: FilterConfig,
        provider: Arc<dyn MarketDataProvider>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            service,
            filters,
            provider,
            oracle: None,
            clock: Arc::new(SystemClock),
            log_file: None,
        }
    }

    /// Managed index codes, sorted.
    #[must_use]
    pub fn indices(&self) -> Vec<String> {
        self.inner.slots.keys().cloned().collect()
    }

    #[must_use]
    pub fn profile(&self, index: &str) -> Option<IndexProfile> {
        self.inner.slot(index).ok().map(|slot| slot.profile.clone())
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.inner.settings.refresh_seconds)
    }

    /// Runs a refresh, or joins the one already in flight for this index.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Snapshot`] for an unknown index and
    /// [`ServiceError::Refresh`] when the (possibly shared) cycle failed.
    /// A failed cycle leaves the cached snapshot untouched.
    pub async fn trigger_refresh(&self, index: &str) -> Result<Arc<Snapshot>, ServiceError> {
        let slot = Arc::clone(self.inner.slot(index)?);
        let refresh = {
            let mut phase = slot.phase.lock();
            match &*phase {
                RefreshPhase::InFlight(shared) => {
                    debug!(index = %slot.profile.code, "Joining in-flight refresh");
                    shared.clone()
                }
                RefreshPhase::Idle => {
                    let shared = self.start_cycle(Arc::clone(&slot));
                    *phase = RefreshPhase::InFlight(shared.clone());
                    slot.state.lock().in_flight = true;
                    shared
                }
            }
        };
        Ok(refresh.await?)
    }

    fn start_cycle(&self, slot: Arc<IndexSlot>) -> SharedRefresh {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _guard = InFlightGuard {
                slot: Arc::clone(&slot),
            };
            inner.run_cycle(&slot).await
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(RefreshError::computation(format!("refresh task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }

    /// Current snapshot with freshness fields recomputed against the clock.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::NoDataYet`] until the first successful refresh, and
    /// [`SnapshotError::UnknownIndex`] for unmanaged indices.
    pub fn get_snapshot(&self, index: &str) -> Result<Snapshot, SnapshotError> {
        let slot = self.inner.slot(index)?;
        let (cached, state) = slot.read_consistent();

        let Some(cached) = cached else {
            return Err(SnapshotError::NoDataYet {
                index: slot.profile.code.clone(),
                last_error: state.last_error.map(|e| e.to_string()),
            });
        };

        let (age_seconds, stale) = self.inner.freshness(&state);
        let mut snapshot = Snapshot::clone(&cached);
        snapshot.system.age_seconds = age_seconds;
        snapshot.system.stale = stale;
        snapshot.system.last_success_ts = state.last_success_ts;
        snapshot.system.last_error = state.last_error.map(|e| e.to_string());
        Ok(snapshot)
    }

    /// The most recent `limit` snapshots, oldest first. `limit` is clamped to
    /// `1..=history_limit_max`.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::UnknownIndex`] for unmanaged indices.
    pub fn get_history(&self, index: &str, limit: usize) -> Result<Vec<Snapshot>, SnapshotError> {
        let slot = self.inner.slot(index)?;
        let limit = limit.clamp(1, self.inner.settings.history_limit_max);
        let entries = slot.history.lock().recent(limit);
        Ok(entries.iter().map(|s| Snapshot::clone(s)).collect())
    }

    /// # Errors
    ///
    /// [`SnapshotError::UnknownIndex`] for unmanaged indices.
    pub fn get_debug(&self, index: &str) -> Result<DebugReport, SnapshotError> {
        let slot = self.inner.slot(index)?;
        let (cached, state) = slot.read_consistent();
        let (history_len, history_capacity) = {
            let history = slot.history.lock();
            (history.len(), history.capacity())
        };
        let (recent_events, recent_errors) = {
            let ring = slot.debug.lock();
            (
                ring.recent_events(DEBUG_EVENT_VIEW),
                ring.recent_errors(DEBUG_ERROR_VIEW),
            )
        };
        let settings = &self.inner.settings;

        Ok(DebugReport {
            index: slot.profile.code.clone(),
            service: ServiceStatus {
                refresh_seconds: settings.refresh_seconds,
                fast_mode: settings.fast_mode,
                history_len,
                history_capacity,
                has_snapshot: cached.is_some(),
                state,
            },
            snapshot_summary: cached.as_deref().map(SnapshotSummary::from),
            recent_events,
            recent_errors,
            rule_stats: slot.rule_stats.lock().clone(),
            log_files: LogPointers {
                log_file: settings.log_file.clone(),
                journal_dir: self.inner.journal.as_ref().map(|j| j.dir().to_path_buf()),
            },
        })
    }

    #[must_use]
    pub fn health(&self) -> HealthReport {
        let indices = self
            .inner
            .slots
            .iter()
            .map(|(code, slot)| {
                let (cached, state) = slot.read_consistent();
                let has_snapshot = cached.is_some();
                let (age_seconds, stale) = self.inner.freshness(&state);
                let health = IndexHealth {
                    has_snapshot,
                    in_flight: state.in_flight,
                    stale,
                    age_seconds,
                    last_success_ts: state.last_success_ts,
                    last_error: state.last_error.map(|e| e.to_string()),
                };
                (code.clone(), health)
            })
            .collect();

        HealthReport {
            status: "ok".to_string(),
            source: self.inner.provider.name().to_string(),
            refresh_seconds: self.inner.settings.refresh_seconds,
            fast_mode: self.inner.settings.fast_mode,
            indices,
        }
    }

    /// # Errors
    ///
    /// [`SnapshotError::UnknownIndex`] for unmanaged indices.
    pub fn refresh_state(&self, index: &str) -> Result<RefreshState, SnapshotError> {
        Ok(self.inner.slot(index)?.state.lock().clone())
    }
}

impl Inner {
    fn slot(&self, index: &str) -> Result<&Arc<IndexSlot>, SnapshotError> {
        let code = index.trim().to_uppercase();
        self.slots
            .get(&code)
            .ok_or(SnapshotError::UnknownIndex { index: code })
    }

    /// `(age_seconds, stale)` relative to the last success. Never-succeeded
    /// slots are stale.
    fn freshness(&self, state: &RefreshState) -> (Option<f64>, bool) {
        let now = self.clock.now();
        let age = state
            .last_success_ts
            .map(|ts| (now - ts).num_milliseconds().max(0) as f64 / 1000.0);
        let stale = age.map_or(true, |age| age > self.settings.stale_after_seconds);
        (age, stale)
    }

    async fn run_cycle(&self, slot: &IndexSlot) -> RefreshResult {
        let started = Instant::now();
        slot.state.lock().last_attempt_ts = Some(self.clock.now());

        let outcome = match self.provider.fetch(&slot.profile).await {
            Ok(data) => Ok(self
                .pipeline
                .build(&slot.profile, data, self.clock.now())
                .await),
            Err(e) => Err(e),
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(snapshot) => Ok(self.commit_success(slot, snapshot, duration_ms).await),
            Err(e) => Err(self.record_failure(slot, e, duration_ms)),
        }
    }

    async fn commit_success(
        &self,
        slot: &IndexSlot,
        mut snapshot: Snapshot,
        duration_ms: f64,
    ) -> Arc<Snapshot> {
        let index = slot.profile.code.as_str();
        let completed_at = snapshot.timestamp;
        snapshot.system = SystemStatus {
            source: self.provider.name().to_string(),
            refresh_seconds: self.settings.refresh_seconds,
            stale: false,
            age_seconds: Some(0.0),
            last_success_ts: Some(completed_at),
            last_error: None,
            refresh_duration_ms: Some((duration_ms * 10.0).round() / 10.0),
        };
        let snapshot = Arc::new(snapshot);

        {
            let mut state = slot.state.lock();
            slot.history.lock().push(Arc::clone(&snapshot));
            *slot.cached.write() = Some(Arc::clone(&snapshot));
            state.last_success_ts = Some(completed_at);
            state.last_error = None;
            state.last_duration_ms = Some(duration_ms);
            state.success_count += 1;
        }
        slot.rule_stats.lock().record(&snapshot.strategy.checks);

        let tradeable = &snapshot.strategy.tradeable;
        let slow_threshold_ms = self.settings.refresh_seconds as f64 * 1000.0;
        let is_slow = duration_ms > slow_threshold_ms;
        {
            let now = self.clock.now();
            let mut ring = slot.debug.lock();
            ring.record(
                DebugEvent::new(
                    now,
                    DebugEventKind::SnapshotRefreshOk,
                    index,
                    format!(
                        "{} ({}) checks={}",
                        tradeable.action,
                        tradeable.primary_reason,
                        tradeable.checks.len()
                    ),
                )
                .with_duration_ms(duration_ms),
            );
            if is_slow {
                ring.record(
                    DebugEvent::new(
                        now,
                        DebugEventKind::SnapshotRefreshSlow,
                        index,
                        format!("Refresh took {duration_ms:.0}ms, over the {slow_threshold_ms:.0}ms interval"),
                    )
                    .with_duration_ms(duration_ms),
                );
            }
        }

        info!(
            index,
            duration_ms,
            spot = ?snapshot.market.spot,
            pin = ?snapshot.gex.pin,
            action = %tradeable.action,
            primary_reason = %tradeable.primary_reason,
            "Snapshot refresh ok"
        );
        if is_slow {
            warn!(index, duration_ms, threshold_ms = slow_threshold_ms, "Snapshot refresh slow");
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&snapshot).await {
                warn!(index, error = %e, "Failed to append snapshot journal");
            }
        }

        snapshot
    }

    fn record_failure(&self, slot: &IndexSlot, err: RefreshError, duration_ms: f64) -> RefreshError {
        let index = slot.profile.code.as_str();
        {
            let mut state = slot.state.lock();
            state.last_error = Some(err.clone());
            state.last_duration_ms = Some(duration_ms);
            state.failure_count += 1;
        }
        slot.debug.lock().record(
            DebugEvent::new(
                self.clock.now(),
                DebugEventKind::SnapshotRefreshFailed,
                index,
                err.to_string(),
            )
            .with_duration_ms(duration_ms),
        );
        error!(index, error = %err, kind = err.kind(), duration_ms, "Snapshot refresh failed");
        err
    }
}
