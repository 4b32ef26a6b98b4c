//! Runtime environment helpers
//!
//! Startup checks for the configured store backend, built on `common::env`.

use configs::{StoreBackend, StoreConfig};

/// Prepare the filesystem for the configured backend.
pub async fn ensure_env(cfg: &StoreConfig) -> anyhow::Result<()> {
    match cfg.backend {
        StoreBackend::File => common::env::ensure_data_dir(&cfg.data_file).await,
        StoreBackend::Firebase => {
            if cfg.database_secret.is_none() {
                common::env::check_optional_file(&cfg.credentials_path, "service account key").await;
            }
            Ok(())
        }
        StoreBackend::Memory => Ok(()),
    }
}
