//! Startup helpers for the messenger maintenance binary.
//!
//! The binary opens the configured backends and reconciles the user search
//! list with the directory.

use std::process::ExitCode;

use crate::chat::{BackfillReport, ChatBackends, ChatConfig, ChatResult, ChatStore};

/// Initialize tracing with an `info` default, overridable through `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

/// Run the search list backfill (used by the `messenger-backfill` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` when the backfill completes, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting messenger backfill v{}", env!("CARGO_PKG_VERSION"));

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!("Document store: {}", config.storage.sqlite_path.display());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(backfill(config)) {
        Ok(report) => {
            tracing::info!(
                "Backfill done: {} users scanned, {} added",
                report.scanned,
                report.added.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Backfill failed: {e}");
            ExitCode::from(1)
        }
    }
}

/// Open the configured backends and backfill the search list.
///
/// # Errors
/// Returns an error if a backend cannot be opened or the backfill fails.
pub async fn backfill(config: ChatConfig) -> ChatResult<BackfillReport> {
    let backends = ChatBackends::sqlite(&config).await?;
    let store = ChatStore::new(config, backends)?;
    store.backfill_search_list().await
}
