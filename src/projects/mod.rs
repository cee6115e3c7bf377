// Projects module.
// Caches the account's most recently updated public repositories for the projects page.

pub mod cache;
pub mod source;
pub mod store;
pub mod thumbnails;
pub mod types;

pub use cache::{CacheSettings, RepositoryCache};
pub use source::RepositorySource;
pub use store::SnapshotStore;
pub use types::{CacheSnapshot, RepositorySummary};
