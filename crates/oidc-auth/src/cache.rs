//! Credential cache
//!
//! Persists the last-obtained token pair as pretty-printed JSON at a
//! configurable path. One record, one file: every save overwrites the whole
//! file, no history. Writes go through a temp file + rename so a crash
//! mid-write never leaves a half-written record, and the file is created
//! with 0600 permissions since it holds live tokens.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::token::TokenData;

/// On-disk cache for a single token pair.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist a token pair, replacing any previous record.
    ///
    /// Creates the parent directory if needed: the default cache path lives
    /// under the platform cache dir, which may not exist on first run.
    pub async fn save(&self, data: &TokenData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Cache(format!("serializing credentials: {e}")))?;

        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Cache("cache path has no parent directory".into()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Cache(format!("creating cache directory: {e}")))?;

        let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| Error::Cache(format!("writing temp credential file: {e}")))?;

        // 0600: the file contains live tokens (unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp_path, perms)
                .await
                .map_err(|e| Error::Cache(format!("setting credential file permissions: {e}")))?;
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Cache(format!("renaming temp credential file: {e}")))?;

        debug!(path = %self.path.display(), "persisted credentials");
        Ok(())
    }

    /// Load the cached token pair.
    ///
    /// Fails if the file is missing or does not parse; the orchestrator
    /// treats either case as a cache miss.
    pub async fn load(&self) -> Result<TokenData> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Cache(format!("reading credential file: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Cache(format!("parsing credential file: {e}")))
    }

    /// Remove the cached record. A missing file is not an error.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared credential cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!("removing credential file: {e}"))),
        }
    }
}
