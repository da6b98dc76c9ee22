//! Per-chat polling sessions.
//!
//! Each active session owns one spawned task that polls the market-data
//! service on a fixed period, reconciles the result and sends only new deals.
//! Admission is bounded by a semaphore and never blocks the caller; a full
//! pool rejects the start request.

use crate::render;
use crate::transport::ChatTransport;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use spread_core::{RouteKey, ScanParams, SessionId, TransactionFact};
use spread_feeds::MarketDataSource;
use spread_warehouse::{ReconciliationEngine, SessionRecord, WarehouseError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of concurrently polling sessions.
    pub max_sessions: usize,
    pub poll_interval: Duration,
    /// Upper bound for one market-data call.
    pub fetch_timeout: Duration,
    /// Sessions older than this stop on their own. `None` disables expiry.
    pub max_age: Option<Duration>,
    /// How long `stop` waits for the task to exit before aborting it.
    pub stop_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 30,
            poll_interval: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(30),
            max_age: Some(Duration::from_secs(24 * 60 * 60)),
            stop_grace: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
    /// Every slot is taken, or the manager is shutting down.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotActive,
}

struct ActiveSession {
    token: CancellationToken,
    generation: u64,
    handle: JoinHandle<()>,
}

type Registry = Arc<DashMap<SessionId, ActiveSession>>;

pub struct SessionManager {
    engine: ReconciliationEngine,
    source: Arc<dyn MarketDataSource>,
    transport: Arc<dyn ChatTransport>,
    config: SessionConfig,
    sessions: Registry,
    slots: Arc<Semaphore>,
    root: CancellationToken,
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(
        engine: ReconciliationEngine,
        source: Arc<dyn MarketDataSource>,
        transport: Arc<dyn ChatTransport>,
        config: SessionConfig,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_sessions));
        Self {
            engine,
            source,
            transport,
            config,
            sessions: Arc::new(DashMap::new()),
            slots,
            root: CancellationToken::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Start polling for `id`. Never waits for a free slot.
    pub fn start(&self, id: SessionId, params: ScanParams) -> StartOutcome {
        if self.root.is_cancelled() {
            return StartOutcome::Busy;
        }

        match self.sessions.entry(id) {
            Entry::Occupied(_) => {
                debug!(session = %id, "Session already active");
                StartOutcome::AlreadyActive
            }
            Entry::Vacant(slot) => {
                let permit = match Arc::clone(&self.slots).try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(session = %id, max = self.config.max_sessions, "Session pool full, rejecting start");
                        return StartOutcome::Busy;
                    }
                };

                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let token = self.root.child_token();
                let task = PollTask {
                    id,
                    params,
                    generation,
                    created_at: Utc::now(),
                    token: token.clone(),
                    engine: self.engine.clone(),
                    source: Arc::clone(&self.source),
                    transport: Arc::clone(&self.transport),
                    sessions: Arc::clone(&self.sessions),
                    config: self.config.clone(),
                    _permit: permit,
                };
                let handle = tokio::spawn(task.run());
                slot.insert(ActiveSession {
                    token,
                    generation,
                    handle,
                });

                info!(
                    session = %id,
                    usdt = params.usdt,
                    spread_min = params.spread_min,
                    spread_max = ?params.spread_max,
                    active = self.sessions.len(),
                    "Session started"
                );
                StartOutcome::Started
            }
        }
    }

    /// Cancel the session, wait for its task to exit, then purge its data.
    pub async fn stop(&self, id: SessionId) -> StopOutcome {
        let Some((_, session)) = self.sessions.remove(&id) else {
            return StopOutcome::NotActive;
        };

        self.finish(id, session).await;
        info!(session = %id, active = self.sessions.len(), "Session stopped");
        StopOutcome::Stopped
    }

    async fn finish(&self, id: SessionId, session: ActiveSession) {
        session.token.cancel();
        let mut handle = session.handle;
        match tokio::time::timeout(self.config.stop_grace, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session = %id, error = %e, "Polling task ended abnormally"),
            Err(_) => {
                warn!(session = %id, "Polling task did not exit in time, aborting");
                handle.abort();
            }
        }

        if let Err(e) = self.engine.purge_session(id).await {
            error!(session = %id, error = %e, "Failed to purge session data");
        }
    }

    /// Drop sessions and transactions left over from a previous run and tell
    /// each of those chats that its scan has stopped. Returns how many stale
    /// sessions were found.
    pub async fn discard_previous_run(&self) -> Result<usize, WarehouseError> {
        let stale = self.engine.stored_sessions().await?;
        self.engine.purge_all_sessions().await?;
        self.engine.purge_all_raw().await?;
        self.engine.purge_all_curated().await?;

        for record in &stale {
            if let Err(e) = self
                .transport
                .send_text(record.id, render::SESSION_INTERRUPTED)
                .await
            {
                warn!(session = %record.id, error = %e, "Failed to notify about interrupted session");
            }
        }
        if !stale.is_empty() {
            info!(stale = stale.len(), "Discarded sessions from the previous run");
        }
        Ok(stale.len())
    }

    /// Stop every session and refuse new ones.
    pub async fn shutdown(&self) {
        self.root.cancel();
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                self.finish(id, session).await;
            }
        }
        info!("All sessions stopped");
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Every deal currently tracked for the session, highest spread first.
    pub async fn list_all(&self, id: SessionId) -> Vec<TransactionFact> {
        self.engine.transactions(id).await
    }

    pub async fn lookup(&self, id: SessionId, route: &RouteKey) -> Option<TransactionFact> {
        self.engine
            .lookup(id, &route.symbol, &route.market_from, &route.market_to)
            .await
    }
}

enum Exit {
    Cancelled,
    Expired,
}

/// State moved into one spawned polling task.
struct PollTask {
    id: SessionId,
    params: ScanParams,
    generation: u64,
    created_at: DateTime<Utc>,
    token: CancellationToken,
    engine: ReconciliationEngine,
    source: Arc<dyn MarketDataSource>,
    transport: Arc<dyn ChatTransport>,
    sessions: Registry,
    config: SessionConfig,
    /// Released when the task ends.
    _permit: OwnedSemaphorePermit,
}

impl PollTask {
    async fn run(self) {
        let record = SessionRecord {
            id: self.id,
            params: self.params,
            created_at: self.created_at,
        };
        if let Err(e) = self.engine.record_session(&record).await {
            warn!(session = %self.id, error = %e, "Failed to persist session");
        }

        let max_age = self.config.max_age;
        let expiry = async move {
            match max_age {
                Some(age) => tokio::time::sleep(age).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break Exit::Cancelled,
                _ = &mut expiry => break Exit::Expired,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = self.token.cancelled() => break Exit::Cancelled,
                result = tokio::time::timeout(self.config.fetch_timeout, self.source.fetch(&self.params)) => result,
            };

            let batch = match fetched {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    warn!(session = %self.id, error = %e, "Market-data request failed");
                    continue;
                }
                Err(_) => {
                    warn!(session = %self.id, timeout = ?self.config.fetch_timeout, "Market-data request timed out");
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }

            let fresh = self.engine.reconcile_transactions(self.id, batch).await;
            if fresh.is_empty() {
                continue;
            }
            if self.token.is_cancelled() {
                break Exit::Cancelled;
            }

            let choices = render::deal_choices(&fresh);
            match self
                .transport
                .send_choices(self.id, render::CHOOSE_DEAL, &choices)
                .await
            {
                Ok(()) => debug!(session = %self.id, deals = choices.len(), "Deals sent"),
                Err(e) => error!(session = %self.id, error = %e, "Failed to send deals"),
            }
        };

        match exit {
            Exit::Cancelled => debug!(session = %self.id, "Polling task cancelled"),
            Exit::Expired => self.expire().await,
        }
    }

    async fn expire(&self) {
        let generation = self.generation;
        let owned = self
            .sessions
            .get(&self.id)
            .is_some_and(|session| session.generation == generation);
        if !owned {
            // Stopped concurrently; the stopper owns the cleanup.
            return;
        }

        info!(session = %self.id, "Session expired");
        // Purge while still registered: a restart for the same chat is
        // rejected as active until the old rows are gone.
        if let Err(e) = self.engine.purge_session(self.id).await {
            error!(session = %self.id, error = %e, "Failed to purge expired session");
        }
        let removed = self
            .sessions
            .remove_if(&self.id, |_, session| session.generation == generation);
        if removed.is_none() {
            return;
        }

        if let Err(e) = self
            .transport
            .send_text(self.id, render::SESSION_EXPIRED)
            .await
        {
            warn!(session = %self.id, error = %e, "Failed to notify about expiry");
        }
    }
}
