use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its data subdirectory and an initial `config.json`.
///
/// # Arguments
/// - `home` - The directory that will be the root of the data directory, e.g. `$HOME/carryover`
/// - `debounce_ms` - Milliseconds to wait after an edit before saving, `None` for the default.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path, debounce_ms: Option<u64>) -> Result<Out<()>> {
    let config = Config::create(home, debounce_ms)
        .await
        .context("Unable to create the data directory and config")?;
    Ok(format!(
        "Successfully created the carryover directory at {}",
        config.root().display()
    )
    .into())
}
