// Thumbnail resolution.
// Probes candidate image paths in a repository, memoizing lookups in a bounded LRU.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use super::source::RepositorySource;

/// Memo key for a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl ThumbnailKey {
    pub fn new(owner: &str, repo: &str, path: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct ProbeResult {
    url: Option<String>,
    cached_at: Instant,
}

/// Fixed-capacity memo of probe outcomes, both hits and confirmed misses.
pub struct ThumbnailCache {
    lru: Mutex<LruCache<ThumbnailKey, ProbeResult>>,
    ttl: Duration,
}

impl ThumbnailCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            lru: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Memoized outcome for a probe: `Some(None)` is a remembered miss.
    pub fn get(&self, key: &ThumbnailKey) -> Option<Option<String>> {
        let mut lru = self.lru.lock().unwrap_or_else(PoisonError::into_inner);
        match lru.get(key) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => Some(entry.url.clone()),
            Some(_) => {
                lru.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: ThumbnailKey, url: Option<String>) {
        let mut lru = self.lru.lock().unwrap_or_else(PoisonError::into_inner);
        lru.put(
            key,
            ProbeResult {
                url,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the download URL of the first candidate that exists, or an empty string.
    ///
    /// Failed probes are not memoized, so a transient error is retried next refresh.
    pub async fn resolve(
        &self,
        source: &dyn RepositorySource,
        owner: &str,
        repo: &str,
        candidates: &[String],
    ) -> String {
        for path in candidates {
            let key = ThumbnailKey::new(owner, repo, path);
            match self.get(&key) {
                Some(Some(url)) => return url,
                Some(None) => continue,
                None => {}
            }

            match source.file_download_url(owner, repo, path).await {
                Ok(Some(url)) => {
                    self.put(key, Some(url.clone()));
                    return url;
                }
                Ok(None) => self.put(key, None),
                Err(e) => {
                    debug!(owner, repo, path = %path, error = %e, "thumbnail probe failed");
                }
            }
        }
        String::new()
    }
}
