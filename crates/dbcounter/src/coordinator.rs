//! The persistence coordinator: keeps a counter and a document store in step.
//!
//! The coordinator never owns counter data. It snapshots the counter and
//! upserts one record per key, deletes single keys from both sides, and
//! replays stored records back into the counter. A background task can run
//! the snapshot on a fixed interval until [`PersistenceCoordinator::stop`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use dbcounter_core::{Counter, CounterEntry};
use dbcounter_store::{Connector, Session, SqliteConnector};

use crate::config::{CoordinatorConfig, DEFAULT_INTERVAL};
use crate::error::Result;

/// Outcome of one [`PersistenceCoordinator::persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Keys written as new records.
    pub inserted: usize,
    /// Keys whose existing record had its value updated.
    pub updated: usize,
}

impl PersistReport {
    /// Total keys written.
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// State shared between the coordinator handle and its background task.
struct Inner<C: Connector, K: Counter + ?Sized + 'static> {
    /// The storage backend.
    connector: C,
    /// The counter being persisted.
    counter: Arc<K>,
    /// Configuration.
    config: CoordinatorConfig,
    /// Serializes snapshot+write sections.
    persist_lock: tokio::sync::Mutex<()>,
}

/// A running background task.
struct Background {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    interval: Duration,
}

/// Periodic and on-demand persistence for a [`Counter`].
///
/// Provides:
/// - Background persistence on a fixed interval (`start_background` / `stop`)
/// - Synchronous flush (`persist`)
/// - Point deletion from storage and memory (`clear`)
/// - Additive reload from storage (`update_from_db`)
///
/// Every operation opens a fresh storage session and releases it when done.
///
/// # Lifecycle
///
/// A coordinator starts idle. `start_background` spawns exactly one task on
/// the current Tokio runtime; `stop` cancels it and flushes once more.
/// Dropping a running coordinator cancels the task without a final flush.
pub struct PersistenceCoordinator<C: Connector, K: Counter + ?Sized + 'static> {
    inner: Arc<Inner<C, K>>,
    background: Mutex<Option<Background>>,
}

impl<C: Connector, K: Counter + ?Sized + 'static> PersistenceCoordinator<C, K> {
    /// Create an idle coordinator.
    pub fn new(connector: C, counter: Arc<K>, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                connector,
                counter,
                config,
                persist_lock: tokio::sync::Mutex::new(()),
            }),
            background: Mutex::new(None),
        })
    }

    /// The counter this coordinator persists.
    pub fn counter(&self) -> &Arc<K> {
        &self.inner.counter
    }

    /// The storage backend.
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// The configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.active_interval().is_some()
    }

    /// The interval of the running background task.
    pub fn active_interval(&self) -> Option<Duration> {
        let background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        background
            .as_ref()
            .filter(|bg| !bg.handle.is_finished())
            .map(|bg| bg.interval)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start persisting every `interval` in the background.
    ///
    /// A zero interval is replaced by [`DEFAULT_INTERVAL`]. The first run
    /// happens one full interval after this call. Persist failures are logged
    /// and the loop carries on.
    ///
    /// Returns `false` without doing anything if already running.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_background(&self, interval: Duration) -> bool {
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(bg) = background.as_ref() {
            if !bg.handle.is_finished() {
                tracing::debug!("background persistence already running");
                return false;
            }
        }

        let interval = if interval.is_zero() {
            tracing::warn!(
                fallback = ?DEFAULT_INTERVAL,
                "persistence interval should not be zero, using default"
            );
            DEFAULT_INTERVAL
        } else {
            interval
        };

        tracing::info!(?interval, "starting background persistence");
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(background_loop(Arc::clone(&self.inner), interval, stop_rx));

        *background = Some(Background {
            stop: stop_tx,
            handle,
            interval,
        });
        tracing::info!("background persistence started");
        true
    }

    /// Start background persistence at the configured interval.
    pub fn start(&self) -> bool {
        self.start_background(self.inner.config.interval)
    }

    /// Stop background persistence and flush once more.
    ///
    /// Waits for the background task to exit (an in-flight persist finishes
    /// first), then runs a synchronous [`persist`](Self::persist) and returns
    /// its outcome.
    ///
    /// Calling `stop` on an idle coordinator does nothing and returns `Ok`.
    pub async fn stop(&self) -> Result<()> {
        let background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(background) = background else {
            tracing::debug!("stop called while background persistence is idle");
            return Ok(());
        };

        tracing::info!("stopping background persistence");
        // The task may already be gone; nothing left to signal then.
        let _ = background.stop.send(());
        if let Err(e) = background.handle.await {
            tracing::warn!(error = %e, "background persistence task ended abnormally");
        }

        match self.inner.persist().await {
            Ok(report) => {
                tracing::info!(
                    inserted = report.inserted,
                    updated = report.updated,
                    "background persistence stopped"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "final flush failed while stopping");
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Storage Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Write a snapshot of every counter key to storage.
    ///
    /// Each key is upserted in enumeration order: an existing record gets its
    /// value updated, otherwise a new record is inserted with the value's kind.
    /// The first failing key aborts the run; keys written before it stay
    /// written.
    pub async fn persist(&self) -> Result<PersistReport> {
        self.inner.persist().await
    }

    /// Delete `key` from storage, then from the counter.
    ///
    /// A key with no stored record is not an error. If the storage delete
    /// fails the in-memory value is left in place.
    pub async fn clear(&self, key: &str) -> Result<()> {
        let inner = &self.inner;
        let _guard = inner.persist_lock.lock().await;
        let session = inner.connect().await?;

        let removed = session.remove_by_key(&inner.config.collection, key).await?;
        if !removed {
            tracing::debug!(key, "no stored record to clear");
        }

        inner.counter.remove(key);
        tracing::debug!(key, "counter cleared");
        Ok(())
    }

    /// Add every stored value to the counter.
    ///
    /// Reload is additive: running it twice doubles the stored amounts. A
    /// record with an unrecognized kind tag is applied as a plain integer.
    /// Records the store cannot read are skipped by the store and logged.
    ///
    /// Returns the number of records applied.
    pub async fn update_from_db(&self) -> Result<usize> {
        let inner = &self.inner;
        let session = inner.connect().await?;
        let entries = session.find_all(&inner.config.collection).await?;

        for entry in &entries {
            if entry.kind().is_none() {
                tracing::warn!(
                    key = %entry.key,
                    val_type = %entry.val_type,
                    "unrecognized value kind, using stored value as a plain integer"
                );
            }
            inner.counter.increment(&entry.key, entry.decode_or_raw());
        }

        tracing::info!(records = entries.len(), "counter state reloaded");
        Ok(entries.len())
    }
}

impl<K: Counter + ?Sized + 'static> PersistenceCoordinator<SqliteConnector, K> {
    /// Create an idle coordinator backed by SQLite files under `config.endpoint`.
    pub fn sqlite(counter: Arc<K>, config: CoordinatorConfig) -> Result<Self> {
        let connector = SqliteConnector::new(&config.endpoint);
        Self::new(connector, counter, config)
    }
}

impl<C: Connector, K: Counter + ?Sized + 'static> Drop for PersistenceCoordinator<C, K> {
    fn drop(&mut self) {
        let background = self
            .background
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(background) = background {
            tracing::warn!("coordinator dropped while running, final flush skipped");
            let _ = background.stop.send(());
        }
    }
}

impl<C: Connector, K: Counter + ?Sized + 'static> Inner<C, K> {
    async fn connect(&self) -> Result<C::Session> {
        Ok(self.connector.connect(&self.config.database).await?)
    }

    async fn persist(&self) -> Result<PersistReport> {
        let _guard = self.persist_lock.lock().await;
        let session = self.connect().await?;
        let collection = &self.config.collection;
        let mut report = PersistReport::default();

        for (key, value) in self.counter.snapshot() {
            tracing::debug!(key = %key, "persisting key");

            let upserted = match session.find_id_by_key(collection, &key).await {
                Ok(None) => session
                    .insert(collection, &CounterEntry::new(key.as_str(), value))
                    .await
                    .map(|_| report.inserted += 1),
                Ok(Some(id)) => session
                    .update_value(collection, &id, value.raw())
                    .await
                    .map(|()| report.updated += 1),
                Err(e) => Err(e),
            };

            if let Err(e) = upserted {
                tracing::warn!(key = %key, error = %e, "failed to persist key");
                return Err(e.into());
            }
            tracing::debug!(key = %key, "key persisted");
        }

        Ok(report)
    }
}

async fn background_loop<C: Connector, K: Counter + ?Sized + 'static>(
    inner: Arc<Inner<C, K>>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // A dropped sender means the coordinator is gone.
            _ = &mut stop => break,
            _ = ticker.tick() => match inner.persist().await {
                Ok(report) => tracing::info!(
                    inserted = report.inserted,
                    updated = report.updated,
                    "background persistence executed"
                ),
                Err(e) => tracing::warn!(error = %e, "error in background persistence"),
            },
        }
    }

    tracing::debug!("background persistence loop exited");
}
