//! Artifact storage
//!
//! Owns the output directory and the naming of every file the pipeline
//! writes. Writes go to a temporary sibling first and are renamed into
//! place, one writer per path at a time.

use regex::Regex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::category::Category;

fn escaped_chars() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9-]").ok()).as_ref()
}

fn escape_char(c: char) -> String {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf)
        .bytes()
        .map(|b| format!("_{:02X}", b))
        .collect()
}

/// Make a user id safe to embed in a file name
///
/// The result only contains `[A-Za-z0-9_-]`. Every other character,
/// including `_` itself, is written as `_XX` per UTF-8 byte, so distinct ids
/// never share a file name.
pub fn sanitize_user_id(user_id: &str) -> String {
    match escaped_chars() {
        Some(re) => re
            .replace_all(user_id, |caps: &regex::Captures| {
                caps[0].chars().map(escape_char).collect::<String>()
            })
            .into_owned(),
        None => user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c.to_string()
                } else {
                    escape_char(c)
                }
            })
            .collect(),
    }
}

/// Output directory with deterministic artifact paths
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{tag}_{kind}_{user}.svg`
    pub fn chart_path(&self, category: Category, user_id: &str) -> PathBuf {
        self.root.join(format!(
            "{}_{}_{}.svg",
            category.tag(),
            category.chart_policy().file_tag(),
            sanitize_user_id(user_id)
        ))
    }

    /// `export_{user}.pdf`
    pub fn report_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join(format!("export_{}.pdf", sanitize_user_id(user_id)))
    }

    async fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Forget the lock for `path` once no other writer holds or awaits it
    async fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    /// Replace the file at `path` with `bytes`
    ///
    /// The content is written to a temporary file in the same directory and
    /// renamed over the target, so readers never observe a partial file.
    /// Concurrent writes to the same path are serialized; the last one wins.
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let lock = self.lock_for(path).await;
        let result = {
            let _guard = lock.lock().await;
            self.write_atomic(path, bytes).await
        };
        self.release(path, lock).await;
        result
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(dir).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"))?;
        let tmp = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        tracing::debug!(path = ?path, bytes = bytes.len(), "Wrote artifact");
        Ok(())
    }
}
