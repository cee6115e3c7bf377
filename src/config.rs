// Application configuration.
// Reads settings from the process environment and resolves default filesystem paths.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{FolioError, Result};
use crate::projects::CacheSettings;

const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
const SNAPSHOT_FILE: &str = "repositories.json";
const DATABASE_FILE: &str = "folio.db";

/// Runtime configuration for the server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the GitHub API.
    pub github_token: String,
    /// Account whose repositories are shown; resolved from the token when unset.
    pub github_owner: Option<String>,
    pub listen_addr: SocketAddr,
    pub database_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub cache: CacheSettings,
}

impl Config {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let github_token = lookup("GITHUB_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(FolioError::MissingToken)?;

        let github_owner = lookup("GITHUB_OWNER").filter(|o| !o.trim().is_empty());

        let listen = lookup("FOLIO_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen_addr = listen
            .parse()
            .map_err(|e| FolioError::Other(format!("invalid FOLIO_LISTEN '{}': {}", listen, e)))?;

        let database_path = match lookup("FOLIO_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => data_dir()
                .ok_or_else(|| FolioError::Other("no data directory available".to_string()))?
                .join(DATABASE_FILE),
        };

        let snapshot_dir = match lookup("FOLIO_CACHE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => cache_dir()
                .ok_or_else(|| FolioError::Other("no cache directory available".to_string()))?,
        };

        Ok(Self {
            github_token,
            github_owner,
            listen_addr,
            database_path,
            snapshot_path: snapshot_dir.join(SNAPSHOT_FILE),
            cache: CacheSettings::default(),
        })
    }
}

/// Get the base cache directory (~/.cache/folio on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the base data directory (~/.local/share/folio on Linux).
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token() {
        let result = Config::from_lookup(lookup(&[("FOLIO_DATABASE", "/tmp/x.db")]));
        assert!(matches!(result, Err(FolioError::MissingToken)));

        let result = Config::from_lookup(lookup(&[("GITHUB_TOKEN", "  ")]));
        assert!(matches!(result, Err(FolioError::MissingToken)));
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_lookup(lookup(&[
            ("GITHUB_TOKEN", "ghp_test"),
            ("GITHUB_OWNER", "someone"),
            ("FOLIO_LISTEN", "0.0.0.0:8080"),
            ("FOLIO_DATABASE", "/srv/folio/blog.db"),
            ("FOLIO_CACHE_DIR", "/srv/folio/cache"),
        ]))
        .unwrap();

        assert_eq!(config.github_owner.as_deref(), Some("someone"));
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.database_path, PathBuf::from("/srv/folio/blog.db"));
        assert!(config.snapshot_path.ends_with("cache/repositories.json"));
    }

    #[test]
    fn test_invalid_listen_address() {
        let result = Config::from_lookup(lookup(&[
            ("GITHUB_TOKEN", "ghp_test"),
            ("FOLIO_LISTEN", "not-an-address"),
            ("FOLIO_DATABASE", "/tmp/x.db"),
            ("FOLIO_CACHE_DIR", "/tmp"),
        ]));
        assert!(matches!(result, Err(FolioError::Other(_))));
    }
}
