// Folio server entry point.
// Loads configuration, starts the repository refresh task, and serves the JSON routes.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use folio::blog::{Database, PostService};
use folio::config::Config;
use folio::error::Result;
use folio::github::{GITHUB_API_BASE, GitHubClient};
use folio::projects::{RepositoryCache, SnapshotStore};
use folio::routes::{AppState, router};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let client = GitHubClient::with_options(
        &config.github_token,
        GITHUB_API_BASE,
        config.cache.request_timeout,
    )?;

    match &config.github_owner {
        Some(owner) => info!(%owner, "serving repositories"),
        None => info!("repository owner will be resolved from the token"),
    }

    let db = Database::open(&config.database_path)?;

    let store = SnapshotStore::new(config.snapshot_path.clone(), config.cache.max_repositories);
    let cache = Arc::new(RepositoryCache::new(
        Arc::new(client),
        store,
        config.github_owner.clone(),
        config.cache.clone(),
    ));
    cache.schedule_periodic_refresh().await;

    let state = AppState {
        cache: cache.clone(),
        posts: PostService::new(db),
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.stop_periodic_refresh().await;
    info!("folio shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
