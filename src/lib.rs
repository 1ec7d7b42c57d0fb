pub mod api;
pub mod blocks;
pub mod collection;
pub mod config;
pub mod error;
pub mod files;
pub mod notes;
pub mod preview;
pub mod projects;
pub mod settings;
pub mod storage;
pub mod todos;
pub mod workspace;

use anyhow::Context;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::ServerConfig;
use crate::preview::LinkPreviewService;
use crate::storage::FileStore;
use crate::workspace::Workspace;

// Shared by every request handler
pub struct AppState {
    pub workspace: RwLock<Workspace>,
    pub previews: LinkPreviewService,
}

impl AppState {
    pub fn new(workspace: Workspace, previews: LinkPreviewService) -> Self {
        Self {
            workspace: RwLock::new(workspace),
            previews,
        }
    }

    // Guards must be dropped before any await point.
    pub fn read(&self) -> RwLockReadGuard<'_, Workspace> {
        self.workspace.read().expect("workspace read lock")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Workspace> {
        self.workspace.write().expect("workspace write lock")
    }
}

/// Load the workspace from `config.data_dir` and serve the HTTP API until Ctrl-C.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?;
    let workspace = Workspace::open(Arc::new(store), config.demo_data)
        .context("failed to load stored data")?;
    let previews = LinkPreviewService::new(config.preview_timeout())
        .context("failed to build HTTP client")?;

    let state = Arc::new(AppState::new(workspace, previews));
    let app = api::router(state, config.cors_permissive);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir.display(),
        "projectdesk listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
