// External repository source.
// Abstracts the upstream calls the repository cache depends on.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::github::{GitHubClient, Repository};

/// Upstream service listing an account's repositories and their files.
///
/// Every call may fail independently; the cache decides which failures abort a refresh.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Login of the account the credentials belong to.
    async fn authenticated_owner(&self) -> Result<String>;

    /// Repositories owned by `owner`, most recently updated first, at most `limit`.
    async fn list_repositories(&self, owner: &str, limit: usize) -> Result<Vec<Repository>>;

    /// Language names used in a repository.
    async fn languages(&self, owner: &str, repo: &str) -> Result<BTreeSet<String>>;

    /// Download URL of the file at `path`, or `None` when it does not exist.
    async fn file_download_url(&self, owner: &str, repo: &str, path: &str)
    -> Result<Option<String>>;
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn authenticated_owner(&self) -> Result<String> {
        Ok(self.get_current_user().await?.login)
    }

    async fn list_repositories(&self, _owner: &str, limit: usize) -> Result<Vec<Repository>> {
        // The token identifies the account, so `/user/repos` already scopes to the owner.
        self.get_user_repos(limit).await
    }

    async fn languages(&self, owner: &str, repo: &str) -> Result<BTreeSet<String>> {
        self.get_repo_languages(owner, repo).await
    }

    async fn file_download_url(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>> {
        self.get_file_download_url(owner, repo, path).await
    }
}
