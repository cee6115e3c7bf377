// GitHub API response types.
// Defines structs for deserializing the repository, user, and contents endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated GitHub user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
    pub login: String,
    pub avatar_url: Option<String>,
}

/// GitHub repository as returned by `/user/repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// A file entry from the contents API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFile {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: Option<String>,
}

/// Rate limit information from response headers.
///
/// Stored in atomics so a shared client can record it from concurrent requests.
#[derive(Debug, Default)]
pub struct RateLimit {
    limit: AtomicU64,
    remaining: AtomicU64,
    reset: AtomicU64,
}

impl RateLimit {
    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Unix timestamp at which the window resets.
    pub fn reset(&self) -> u64 {
        self.reset.load(Ordering::Relaxed)
    }

    pub fn set_limit(&self, value: u64) {
        self.limit.store(value, Ordering::Relaxed);
    }

    pub fn set_remaining(&self, value: u64) {
        self.remaining.store(value, Ordering::Relaxed);
    }

    pub fn set_reset(&self, value: u64) {
        self.reset.store(value, Ordering::Relaxed);
    }

    /// True once a response has reported an exhausted quota.
    pub fn is_exhausted(&self) -> bool {
        self.limit() > 0 && self.remaining() == 0
    }
}
