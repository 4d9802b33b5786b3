//! Template loading: read the memo template asset once per process.
//!
//! The template is provisioned next to the binary at deploy time and never
//! changes while the process runs, so the first successful read is kept in
//! a [`OnceCell`] and every later request shares the same immutable buffer.
//! A failed read is not cached: if the asset appears later, the next request
//! picks it up.

use crate::error::MemoError;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Lazily loaded, process-wide template bytes.
#[derive(Debug)]
pub struct TemplateLoader {
    path: PathBuf,
    bytes: OnceCell<Arc<[u8]>>,
}

impl TemplateLoader {
    /// A loader that reads `path` on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bytes: OnceCell::new(),
        }
    }

    /// A loader pre-seeded with in-memory bytes; never touches the disk.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        Self {
            path: PathBuf::from("<memory>"),
            bytes: OnceCell::with_value(bytes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The template bytes, reading the asset if this is the first call.
    pub async fn load(&self) -> Result<Arc<[u8]>, MemoError> {
        if let Some(bytes) = self.bytes.get() {
            return Ok(Arc::clone(bytes));
        }

        let read = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MemoError::TemplateUnavailable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        if read.is_empty() {
            return Err(MemoError::TemplateUnavailable {
                path: self.path.clone(),
                reason: "file is empty".into(),
            });
        }

        // Concurrent first loads may both read; whichever lands first wins
        // and both callers get that buffer.
        let bytes = self.bytes.get_or_init(|| {
            info!("Loaded template {} ({} bytes)", self.path.display(), read.len());
            Arc::from(read)
        });
        debug!("Template cached for process lifetime");
        Ok(Arc::clone(bytes))
    }
}
