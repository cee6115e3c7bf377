// Repository cache.
// Serves a bounded-age snapshot of the account's repositories, refreshing from upstream
// on demand and on a fixed background interval.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::github::REQUEST_TIMEOUT;

use super::source::RepositorySource;
use super::store::SnapshotStore;
use super::thumbnails::ThumbnailCache;
use super::types::{CacheSnapshot, RepositorySummary};

/// Maximum snapshot age before an on-demand fetch refreshes: 2 hours.
pub const FRESHNESS_THRESHOLD: Duration = Duration::from_secs(2 * 60 * 60);

/// Background refresh cadence: 1 hour.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Number of most recently updated repositories considered per refresh.
pub const MAX_REPOSITORIES: usize = 10;

/// Paths probed, in order, for a repository thumbnail.
pub const THUMBNAIL_CANDIDATES: [&str; 3] = ["thumbnail.png", ".github/thumbnail.png", "logo.png"];

/// Tunables for the repository cache.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub freshness_threshold: Duration,
    pub refresh_interval: Duration,
    pub max_repositories: usize,
    pub request_timeout: Duration,
    pub thumbnail_candidates: Vec<String>,
    pub thumbnail_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            freshness_threshold: FRESHNESS_THRESHOLD,
            refresh_interval: REFRESH_INTERVAL,
            max_repositories: MAX_REPOSITORIES,
            request_timeout: REQUEST_TIMEOUT,
            thumbnail_candidates: THUMBNAIL_CANDIDATES.iter().map(|p| p.to_string()).collect(),
            thumbnail_capacity: 256,
        }
    }
}

/// Process-wide cache of the repositories shown on the projects page.
///
/// Constructed once at startup and shared through an `Arc` with the route layer
/// and the background refresh task.
pub struct RepositoryCache {
    source: Arc<dyn RepositorySource>,
    store: SnapshotStore,
    /// Account whose repositories are listed; resolved on first refresh when not configured.
    owner: OnceCell<String>,
    settings: CacheSettings,
    /// Current snapshot; held only for the staleness check and the swap.
    current: Mutex<Option<Arc<CacheSnapshot>>>,
    /// Serializes refreshes so concurrent triggers collapse into one.
    refresh_gate: Mutex<()>,
    thumbnails: ThumbnailCache,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl RepositoryCache {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        store: SnapshotStore,
        owner: Option<String>,
        settings: CacheSettings,
    ) -> Self {
        let thumbnails =
            ThumbnailCache::new(settings.thumbnail_capacity, settings.freshness_threshold);
        Self {
            source,
            store,
            owner: OnceCell::new_with(owner),
            settings,
            current: Mutex::new(None),
            refresh_gate: Mutex::new(()),
            thumbnails,
            scheduler: Mutex::new(None),
        }
    }

    /// The snapshot currently held in memory, if any.
    pub async fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.current.lock().await.clone()
    }

    /// Return the repositories considered fresh, refreshing first when needed.
    ///
    /// Never fails: upstream or disk errors degrade to the held (possibly stale)
    /// snapshot, or an empty list when nothing has ever been cached.
    pub async fn fetch(&self) -> Vec<RepositorySummary> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            debug!(count = snapshot.count(), "serving cached repositories");
            return snapshot.repositories().to_vec();
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot.repositories().to_vec();
        }

        info!("repository cache stale or absent, refreshing");
        match self.refresh_locked().await {
            Ok(snapshot) => {
                self.persist(Arc::clone(&snapshot)).await;
                snapshot.repositories().to_vec()
            }
            Err(e) => {
                error!(operation = "fetch", error = %e, "refresh failed");
                self.snapshot()
                    .await
                    .map(|snapshot| snapshot.repositories().to_vec())
                    .unwrap_or_default()
            }
        }
    }

    /// Unconditionally rebuild the snapshot from upstream.
    ///
    /// On error the held snapshot is left untouched.
    pub async fn refresh(&self) -> Result<Arc<CacheSnapshot>> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh and write the result to disk, logging instead of propagating failures.
    ///
    /// The write happens before the refresh gate is released, so the file on disk
    /// always matches the latest completed refresh.
    pub async fn refresh_and_persist(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        match self.refresh_locked().await {
            Ok(snapshot) => {
                self.persist(snapshot).await;
                true
            }
            Err(e) => {
                error!(operation = "refresh", error = %e, "refresh failed");
                false
            }
        }
    }

    /// Start the background refresh task, replacing any task already running.
    ///
    /// The first cycle runs immediately; later cycles follow every `refresh_interval`.
    pub async fn schedule_periodic_refresh(self: &Arc<Self>) {
        let cache = Arc::clone(self);
        let period = self.settings.refresh_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                debug!("periodic repository refresh");
                cache.refresh_and_persist().await;
            }
        });

        let mut scheduler = self.scheduler.lock().await;
        if let Some(previous) = scheduler.replace(handle) {
            previous.abort();
            debug!("superseded previous refresh task");
        }
        info!(interval_secs = period.as_secs(), "scheduled periodic repository refresh");
    }

    /// Stop the background refresh task, if one is running.
    pub async fn stop_periodic_refresh(&self) {
        if let Some(handle) = self.scheduler.lock().await.take() {
            handle.abort();
            info!("stopped periodic repository refresh");
        }
    }

    /// Whether a background refresh task is active.
    pub async fn is_scheduled(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Held snapshot if younger than the threshold, seeding from disk when memory is empty.
    async fn fresh_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            debug!(path = %self.store.path().display(), "no in-memory snapshot, reading disk");
            let store = self.store.clone();
            *current = match tokio::task::spawn_blocking(move || store.load()).await {
                Ok(loaded) => loaded.map(Arc::new),
                Err(e) => {
                    warn!(error = %e, "snapshot load task failed");
                    None
                }
            };
        }

        current
            .as_ref()
            .filter(|snapshot| snapshot.is_fresh(now(), self.settings.freshness_threshold))
            .cloned()
    }

    /// Account login, asking upstream once and falling back to the one saved on disk.
    async fn resolve_owner(&self) -> Result<&str> {
        let owner = self
            .owner
            .get_or_try_init(|| async {
                match self.source.authenticated_owner().await {
                    Ok(login) => {
                        info!(owner = %login, "resolved repository owner");
                        let store = self.store.clone();
                        let saved = login.clone();
                        match tokio::task::spawn_blocking(move || store.save_owner(&saved)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => warn!(error = %e, "failed to save owner"),
                            Err(e) => warn!(error = %e, "owner save task failed"),
                        }
                        Ok(login)
                    }
                    Err(e) => {
                        let store = self.store.clone();
                        match tokio::task::spawn_blocking(move || store.load_owner()).await {
                            Ok(Some(saved)) => {
                                warn!(owner = %saved, error = %e, "owner lookup failed, using saved owner");
                                Ok(saved)
                            }
                            _ => Err(e),
                        }
                    }
                }
            })
            .await?;
        Ok(owner.as_str())
    }

    /// Build a new snapshot from upstream and install it. Caller holds the refresh gate.
    async fn refresh_locked(&self) -> Result<Arc<CacheSnapshot>> {
        let owner = self.resolve_owner().await?;
        let mut upstream = self
            .source
            .list_repositories(owner, self.settings.max_repositories)
            .await?;

        upstream.sort_by_key(|repo| Reverse(repo.updated_at));
        upstream.truncate(self.settings.max_repositories);

        let candidates = &self.settings.thumbnail_candidates;
        let lookups = upstream.iter().filter(|repo| !repo.private).map(|repo| async move {
            let mut summary = RepositorySummary::from_upstream(repo);
            let (languages, thumbnail) = tokio::join!(
                self.source.languages(owner, &repo.name),
                self.thumbnails
                    .resolve(self.source.as_ref(), owner, &repo.name, candidates),
            );
            match languages {
                Ok(languages) => summary.languages = languages,
                Err(e) => {
                    warn!(owner, repo = %repo.name, error = %e, "failed to fetch languages")
                }
            }
            summary.thumbnail_url = thumbnail;
            summary
        });
        let repositories = join_all(lookups).await;

        let mut current = self.current.lock().await;
        let floor = current.as_ref().map_or(0, |s| s.last_refreshed_at());
        let snapshot = Arc::new(CacheSnapshot::new(repositories, now().max(floor)));
        *current = Some(Arc::clone(&snapshot));

        info!(owner, count = snapshot.count(), "repository snapshot refreshed");
        Ok(snapshot)
    }

    async fn persist(&self, snapshot: Arc<CacheSnapshot>) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(path = %self.store.path().display(), error = %e, "failed to persist snapshot")
            }
            Err(e) => warn!(error = %e, "snapshot persist task failed"),
        }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}
