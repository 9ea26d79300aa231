//! Post image storage on local disk.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::AppResult;

/// Stores uploaded images under one directory as `<unix-millis>-<name>`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` and return the stored filename.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        self.save_at(chrono::Utc::now().timestamp_millis(), original_name, bytes)
            .await
    }

    /// Never overwrites: a name already taken in the same millisecond gets a
    /// numeric suffix (`<millis>-<n>-<name>`).
    async fn save_at(&self, millis: i64, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        fs::create_dir_all(&self.dir).await?;
        let base = sanitize_filename(original_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = if attempt == 0 {
                format!("{}-{}", millis, base)
            } else {
                format!("{}-{}-{}", millis, attempt, base)
            };
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&filename))
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            debug!(filename = %filename, size = bytes.len(), "image stored");
            return Ok(filename);
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free upload name for {}", base),
        )
        .into())
    }

    /// Run the database write `commit` that swaps `stored` in for `replaced`.
    /// On failure the freshly stored file is deleted and `replaced` is kept;
    /// on success `replaced` is deleted. Either side may be absent.
    pub async fn commit_swap<T, F>(
        &self,
        stored: Option<&str>,
        replaced: Option<&str>,
        commit: F,
    ) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match commit.await {
            Ok(value) => {
                if let Some(old) = replaced {
                    self.discard(old).await;
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(new) = stored {
                    self.discard(new).await;
                }
                Err(e)
            }
        }
    }

    /// Best-effort removal once the database no longer references the file.
    async fn discard(&self, filename: &str) {
        if let Err(e) = self.remove(filename).await {
            warn!(filename = %filename, error = %e, "failed to remove image");
        }
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, filename: &str) -> AppResult<()> {
        let name = sanitize_filename(filename);
        match fs::remove_file(self.dir.join(&name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(filename = %name, "image already removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

const MAX_NAME_ATTEMPTS: usize = 64;

/// Keep only the final path component and a conservative character set.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
