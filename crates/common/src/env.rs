//! Environment/runtime helpers
//!
//! Sanity checks run at startup before the store is opened.

use std::path::Path;

use tracing::warn;

/// Ensure the parent directory of a data file exists.
pub async fn ensure_data_dir(data_file: &str) -> anyhow::Result<()> {
    let Some(parent) = Path::new(data_file).parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    Ok(())
}

/// Returns whether an optional bootstrap file is present; warns when it is not.
pub async fn check_optional_file(path: &str, what: &str) -> bool {
    if tokio::fs::metadata(path).await.is_err() {
        warn!(%path, what, "file not found");
        return false;
    }
    true
}
