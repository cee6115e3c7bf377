// Repository cache records.
// Typed snapshot of the repositories shown on the projects page, with its on-disk layout.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::github::Repository;

/// How far ahead of the local clock a snapshot timestamp may be before it is rejected.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// One repository selected for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "repo_url", alias = "html_url")]
    pub url: String,
    #[serde(rename = "stars", default)]
    pub star_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(alias = "tags", default)]
    pub languages: BTreeSet<String>,
    /// Empty until resolved, or when no candidate image exists.
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub demo_url: String,
    /// Upstream update time, seconds since epoch.
    #[serde(rename = "updated", default)]
    pub updated_at: i64,
}

impl RepositorySummary {
    /// Build a summary from an upstream record, before languages and thumbnail are known.
    pub fn from_upstream(repo: &Repository) -> Self {
        Self {
            name: repo.name.clone(),
            description: repo.description.clone().unwrap_or_default(),
            url: repo.html_url.clone(),
            star_count: repo.stargazers_count,
            topics: repo.topics.clone(),
            languages: BTreeSet::new(),
            thumbnail_url: String::new(),
            demo_url: repo.homepage.clone().unwrap_or_default(),
            updated_at: repo.updated_at.timestamp(),
        }
    }
}

/// Point-in-time capture of the repository list.
///
/// Immutable once built; the cache replaces it wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    count: usize,
    #[serde(rename = "updated")]
    last_refreshed_at: i64,
    #[serde(rename = "repos")]
    repositories: Vec<RepositorySummary>,
}

impl CacheSnapshot {
    pub fn new(repositories: Vec<RepositorySummary>, last_refreshed_at: i64) -> Self {
        Self {
            count: repositories.len(),
            last_refreshed_at,
            repositories,
        }
    }

    pub fn repositories(&self) -> &[RepositorySummary] {
        &self.repositories
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Seconds since epoch of the refresh that produced this snapshot.
    pub fn last_refreshed_at(&self) -> i64 {
        self.last_refreshed_at
    }

    /// Age in seconds relative to `now`, never negative.
    pub fn age(&self, now: i64) -> u64 {
        now.saturating_sub(self.last_refreshed_at).max(0) as u64
    }

    /// Whether the snapshot is younger than `threshold` at `now`.
    pub fn is_fresh(&self, now: i64, threshold: Duration) -> bool {
        self.age(now) < threshold.as_secs()
    }

    /// Check invariants of a snapshot read from outside the process.
    ///
    /// A timestamp more than [`MAX_CLOCK_SKEW_SECS`] past `now` is rejected, since it
    /// would keep the snapshot fresh indefinitely.
    pub fn validate(&self, max_repositories: usize, now: i64) -> Result<()> {
        if self.count != self.repositories.len() {
            return Err(FolioError::InvalidSnapshot(format!(
                "count {} does not match {} repositories",
                self.count,
                self.repositories.len()
            )));
        }
        if self.repositories.len() > max_repositories {
            return Err(FolioError::InvalidSnapshot(format!(
                "{} repositories exceeds limit of {}",
                self.repositories.len(),
                max_repositories
            )));
        }
        if self.last_refreshed_at < 0 {
            return Err(FolioError::InvalidSnapshot(
                "negative refresh timestamp".to_string(),
            ));
        }
        if self.last_refreshed_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(FolioError::InvalidSnapshot(format!(
                "refresh timestamp {} is {}s ahead of the clock",
                self.last_refreshed_at,
                self.last_refreshed_at - now
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> RepositorySummary {
        RepositorySummary {
            name: name.to_string(),
            description: String::new(),
            url: format!("https://github.com/someone/{}", name),
            star_count: 1,
            topics: vec![],
            languages: BTreeSet::new(),
            thumbnail_url: String::new(),
            demo_url: String::new(),
            updated_at: 0,
        }
    }

    #[test]
    fn test_count_tracks_repositories() {
        let snapshot = CacheSnapshot::new(vec![summary("a"), summary("b")], 100);
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.count(), snapshot.repositories().len());
        assert!(snapshot.validate(10, 100).is_ok());
    }

    #[test]
    fn test_freshness_threshold() {
        let snapshot = CacheSnapshot::new(vec![], 1_000);
        let threshold = Duration::from_secs(7200);

        assert!(snapshot.is_fresh(1_000 + 3600, threshold));
        assert!(!snapshot.is_fresh(1_000 + 7200, threshold));
        assert!(!snapshot.is_fresh(1_000 + 10_000, threshold));
        // Clock skew backwards counts as age zero.
        assert_eq!(snapshot.age(500), 0);
    }

    #[test]
    fn test_reads_legacy_field_names() {
        let json = r#"{
            "count": 1,
            "updated": 1700000000,
            "repos": [{
                "title": "weather-station",
                "thumbnail": "https://raw.githubusercontent.com/x/thumbnail.png",
                "description": "ESP32 sensors",
                "tags": ["C++", "Python"],
                "demo_url": "",
                "repo_url": "https://github.com/x/weather-station",
                "updated": 1690000000
            }]
        }"#;

        let snapshot: CacheSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.validate(10, 1_700_000_000).is_ok());

        let repo = &snapshot.repositories()[0];
        assert_eq!(repo.name, "weather-station");
        assert!(repo.languages.contains("Python"));
        assert_eq!(repo.star_count, 0);
    }

    #[test]
    fn test_validate_rejects_bad_count() {
        let json = r#"{"count": 3, "updated": 10, "repos": []}"#;
        let snapshot: CacheSnapshot = serde_json::from_str(json).unwrap();
        assert!(matches!(
            snapshot.validate(10, 10),
            Err(FolioError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let repos = (0..11).map(|i| summary(&format!("r{}", i))).collect();
        let snapshot = CacheSnapshot::new(repos, 10);
        assert!(snapshot.validate(10, 10).is_err());
        assert!(snapshot.validate(11, 10).is_ok());
    }

    #[test]
    fn test_validate_rejects_future_timestamp() {
        let now = 1_700_000_000;
        let ahead = CacheSnapshot::new(vec![summary("a")], now + 31_536_000);
        assert!(matches!(
            ahead.validate(10, now),
            Err(FolioError::InvalidSnapshot(_))
        ));

        // Small skew is tolerated.
        let skewed = CacheSnapshot::new(vec![summary("a")], now + MAX_CLOCK_SKEW_SECS);
        assert!(skewed.validate(10, now).is_ok());
    }
}
