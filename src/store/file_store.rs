use crate::store::Store;
use crate::{utils, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Stores each key as a pretty-printed JSON file, `<dir>/<key>.json`. Writes go to a temporary
/// file that is then moved into place, so a failed save never leaves a half-written document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file a key is stored in.
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait::async_trait]
impl Store for FileStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path(key);
        let Some(content) = utils::read_if_exists(&path).await? else {
            trace!("Nothing stored for '{key}' at {}", path.display());
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    "The file {} is not valid JSON, treating '{key}' as empty: {e}",
                    path.display()
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let data = serde_json::to_string_pretty(value)
            .with_context(|| format!("Unable to serialize '{key}'"))?;
        utils::write(&tmp, data).await?;
        utils::rename(&tmp, &path).await?;
        trace!("Saved '{key}' to {}", path.display());
        Ok(())
    }
}
