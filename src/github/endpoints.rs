// GitHub API endpoint functions.
// Provides typed methods for the repository listing, languages, and contents APIs.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{FolioError, Result};

use super::client::GitHubClient;
use super::types::{ContentFile, Owner, Repository};

impl GitHubClient {
    /// Get the authenticated user.
    pub async fn get_current_user(&self) -> Result<Owner> {
        let response = self.get("/user").await?;
        let user: Owner = response.json().await?;
        Ok(user)
    }

    /// Get repositories owned by the authenticated user, most recently updated first.
    pub async fn get_user_repos(&self, per_page: usize) -> Result<Vec<Repository>> {
        let per_page = per_page.to_string();
        let params = [
            ("affiliation", "owner"),
            ("sort", "updated"),
            ("direction", "desc"),
            ("per_page", per_page.as_str()),
        ];
        let response = self.get_with_params("/user/repos", &params).await?;
        let repos: Vec<Repository> = response.json().await?;
        Ok(repos)
    }

    /// Get the languages used in a repository.
    pub async fn get_repo_languages(&self, owner: &str, repo: &str) -> Result<BTreeSet<String>> {
        let response = self
            .get(&format!("/repos/{}/{}/languages", owner, repo))
            .await?;
        let languages: BTreeMap<String, u64> = response.json().await?;
        Ok(languages.into_keys().collect())
    }

    /// Get the download URL of a file, or `None` if the path does not exist.
    pub async fn get_file_download_url(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>> {
        let response = match self
            .get(&format!("/repos/{}/{}/contents/{}", owner, repo, path))
            .await
        {
            Ok(response) => response,
            Err(FolioError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let file: ContentFile = response.json().await?;
        if file.kind != "file" {
            return Ok(None);
        }
        Ok(file.download_url)
    }
}
