//! TTL cache in front of the upstream playlist.
//!
//! States: empty (no snapshot), fresh (age < TTL), stale (age >= TTL or
//! invalidated). Reads of a fresh snapshot never touch the network. Stale and
//! empty reads trigger a refresh; concurrent refreshes collapse into one
//! upstream fetch whose result every waiter shares.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use crate::error::PipelineError;
use crate::metrics;
use crate::models::CacheSnapshot;
use crate::services::fetcher::PlaylistFetcher;
use crate::services::pipeline::Pipeline;

type RefreshResult = Result<Arc<CacheSnapshot>, PipelineError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Cache timing configuration
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub fetch_timeout: Duration,
}

#[derive(Default)]
struct Current {
    snapshot: Option<Arc<CacheSnapshot>>,
    invalidated: bool,
}

struct InFlight {
    id: u64,
    refresh: SharedRefresh,
}

struct CacheInner {
    fetcher: Arc<dyn PlaylistFetcher>,
    pipeline: Pipeline,
    settings: CacheSettings,
    current: RwLock<Current>,
    /// Lock order: `in_flight` before `current`
    in_flight: Mutex<Option<InFlight>>,
    next_refresh_id: AtomicU64,
}

/// Owner of the current channel snapshot.
///
/// Cheap to clone; clones share the same snapshot and refresh slot.
#[derive(Clone)]
pub struct ChannelCache {
    inner: Arc<CacheInner>,
}

impl ChannelCache {
    pub fn new(fetcher: Arc<dyn PlaylistFetcher>, pipeline: Pipeline, settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                pipeline,
                settings,
                current: RwLock::new(Current::default()),
                in_flight: Mutex::new(None),
                next_refresh_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot, fresh or not, without refreshing
    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.inner.read_current().snapshot.clone()
    }

    /// Whether a snapshot exists and is within its TTL
    pub fn is_fresh(&self) -> bool {
        self.inner.fresh_snapshot().is_some()
    }

    /// Mark the current snapshot stale so the next `get` refreshes
    pub fn invalidate(&self) {
        self.inner.write_current().invalidated = true;
    }

    /// Return the fresh snapshot, refreshing first when empty or stale.
    ///
    /// A failed refresh falls back to the previous snapshot; only when there
    /// is none does the caller see an error.
    pub async fn get(&self) -> Result<Arc<CacheSnapshot>, PipelineError> {
        if let Some(snapshot) = self.inner.fresh_snapshot() {
            return Ok(snapshot);
        }

        let refresh = {
            let mut slot = self.inner.lock_in_flight();
            // a refresh may have finished between the check above and the lock
            if let Some(snapshot) = self.inner.fresh_snapshot() {
                return Ok(snapshot);
            }
            CacheInner::join_or_start(&self.inner, &mut slot)
        };

        self.settle(refresh.await)
    }

    /// Refresh regardless of freshness, joining a refresh already in flight
    pub async fn force_refresh(&self) -> Result<Arc<CacheSnapshot>, PipelineError> {
        let refresh = {
            let mut slot = self.inner.lock_in_flight();
            CacheInner::join_or_start(&self.inner, &mut slot)
        };

        self.settle(refresh.await)
    }

    fn settle(&self, result: RefreshResult) -> Result<Arc<CacheSnapshot>, PipelineError> {
        match result {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => match self.snapshot() {
                Some(previous) => {
                    metrics::STALE_FALLBACKS.inc();
                    tracing::warn!(
                        error = %err,
                        age_secs = previous.age().as_secs(),
                        "Refresh failed, serving previous snapshot"
                    );
                    Ok(previous)
                }
                None => Err(PipelineError::empty_cache(err)),
            },
        }
    }
}

impl CacheInner {
    fn read_current(&self) -> std::sync::RwLockReadGuard<'_, Current> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_current(&self) -> std::sync::RwLockWriteGuard<'_, Current> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        let current = self.read_current();
        if current.invalidated {
            return None;
        }
        current
            .snapshot
            .as_ref()
            .filter(|s| s.age() < self.settings.ttl)
            .cloned()
    }

    /// Reuse the refresh in `slot`, or spawn one and register it there.
    ///
    /// The refresh runs on its own task so it still completes and installs
    /// its snapshot when every caller has stopped waiting.
    fn join_or_start(this: &Arc<Self>, slot: &mut Option<InFlight>) -> SharedRefresh {
        if let Some(in_flight) = slot.as_ref() {
            tracing::debug!(refresh_id = in_flight.id, "Joining refresh in flight");
            return in_flight.refresh.clone();
        }

        let id = this.next_refresh_id.fetch_add(1, Ordering::Relaxed);
        let task_inner = Arc::clone(this);
        let handle = tokio::spawn(async move {
            let result = task_inner.refresh_once().await;
            task_inner.finish(id, &result);
            result
        });

        let cleanup_inner = Arc::clone(this);
        let refresh = async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    tracing::error!(refresh_id = id, error = %join_err, "Refresh task aborted");
                    cleanup_inner.finish(id, &Err(PipelineError::Internal(join_err.to_string())));
                    Err(PipelineError::Internal(join_err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            refresh: refresh.clone(),
        });
        refresh
    }

    async fn refresh_once(&self) -> RefreshResult {
        metrics::UPSTREAM_FETCHES.inc();
        tracing::info!("Refreshing playlist from upstream");

        let timeout = self.settings.fetch_timeout;
        let text = match tokio::time::timeout(timeout, self.fetcher.fetch()).await {
            Ok(fetched) => fetched?,
            Err(_) => return Err(PipelineError::Timeout(timeout)),
        };

        let snapshot = self.pipeline.build_snapshot(&text)?;
        Ok(Arc::new(snapshot))
    }

    /// Install a successful result and release the refresh slot, atomically
    /// with respect to `get`'s freshness re-check.
    fn finish(&self, id: u64, result: &RefreshResult) {
        let mut slot = self.lock_in_flight();

        match result {
            Ok(snapshot) => {
                let mut current = self.write_current();
                current.snapshot = Some(Arc::clone(snapshot));
                current.invalidated = false;
                drop(current);

                metrics::REFRESH_SUCCESS.inc();
                metrics::SNAPSHOT_CHANNELS.set(snapshot.len() as i64);
                tracing::info!(refresh_id = id, channels = snapshot.len(), "Snapshot installed");
            }
            Err(err) => {
                metrics::REFRESH_FAILURES.inc();
                tracing::error!(refresh_id = id, error = %err, "Playlist refresh failed");
            }
        }

        if slot.as_ref().map_or(false, |f| f.id == id) {
            *slot = None;
        }
    }
}
