//! Command implementations.

mod analyze;
mod demo;
mod info;
mod laps;
mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::SessionConfig;
use ingestion::SqliteSessionStore;
use tracing::warn;

use crate::error::CliError;

pub use analyze::run_analyze;
pub use demo::run_demo;
pub use info::run_info;
pub use laps::run_laps;
pub use validate::run_validate;

/// Load and validate a configuration file
fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Open a session database read-only
fn open_store(db: &Path, config: &SessionConfig) -> Result<Arc<SqliteSessionStore>> {
    if !db.exists() {
        return Err(CliError::database_not_found(db.display().to_string()).into());
    }
    let store = SqliteSessionStore::open(db, &config.store)
        .with_context(|| format!("Failed to open session database {}", db.display()))?;
    Ok(Arc::new(store))
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
