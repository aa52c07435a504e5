//! Local preference persistence for the palette mood-board.

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::dao::models::SwatchEntity;

/// Result alias for preference operations.
pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Failures raised while reading or writing the local preference file.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The preference file could not be read or written.
    #[error("preference file `{path}` i/o failed")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The palette could not be (de)serialized.
    #[error("preference payload is not valid JSON")]
    Serialize(#[from] serde_json::Error),
    /// The serialized palette would not fit in the configured quota.
    #[error("palette needs {needed} bytes but the quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Storage for the swatch list that survives restarts.
pub trait PreferenceStore: Send + Sync {
    /// Load every persisted swatch; a store that was never written yields an empty list.
    fn load(&self) -> BoxFuture<'static, PreferenceResult<Vec<SwatchEntity>>>;
    /// Persist the full swatch list, replacing whatever was stored before.
    fn save(&self, swatches: Vec<SwatchEntity>) -> BoxFuture<'static, PreferenceResult<()>>;
}

fn encode(swatches: &[SwatchEntity], quota: usize) -> PreferenceResult<Vec<u8>> {
    let payload = serde_json::to_vec_pretty(swatches)?;
    if payload.len() > quota {
        return Err(PreferenceError::QuotaExceeded {
            needed: payload.len(),
            quota,
        });
    }
    Ok(payload)
}

/// JSON file on local disk, written atomically through a sibling temp file.
#[derive(Clone)]
pub struct FilePreferenceStore {
    path: Arc<PathBuf>,
    quota: usize,
}

impl FilePreferenceStore {
    /// Store backed by `path`, refusing saves larger than `quota` bytes.
    pub fn new(path: impl Into<PathBuf>, quota: usize) -> Self {
        Self {
            path: Arc::new(path.into()),
            quota,
        }
    }

    fn io_error(&self, source: std::io::Error) -> PreferenceError {
        PreferenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> BoxFuture<'static, PreferenceResult<Vec<SwatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            match tokio::fs::read(store.path.as_ref()).await {
                Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
                Err(err) => Err(store.io_error(err)),
            }
        })
    }

    fn save(&self, swatches: Vec<SwatchEntity>) -> BoxFuture<'static, PreferenceResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let payload = encode(&swatches, store.quota)?;
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| store.io_error(err))?;
            }
            let tmp = store.path.with_extension("json.tmp");
            tokio::fs::write(&tmp, payload)
                .await
                .map_err(|err| store.io_error(err))?;
            tokio::fs::rename(&tmp, store.path.as_ref())
                .await
                .map_err(|err| store.io_error(err))
        })
    }
}

/// Process-local store used when no preference file is configured.
#[derive(Clone)]
pub struct MemoryPreferenceStore {
    swatches: Arc<Mutex<Vec<SwatchEntity>>>,
    quota: usize,
}

impl MemoryPreferenceStore {
    /// Empty in-memory store with the given byte quota.
    pub fn new(quota: usize) -> Self {
        Self {
            swatches: Arc::new(Mutex::new(Vec::new())),
            quota,
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> BoxFuture<'static, PreferenceResult<Vec<SwatchEntity>>> {
        let swatches = self.swatches.clone();
        Box::pin(async move { Ok(swatches.lock().await.clone()) })
    }

    fn save(&self, swatches: Vec<SwatchEntity>) -> BoxFuture<'static, PreferenceResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            encode(&swatches, store.quota)?;
            *store.swatches.lock().await = swatches;
            Ok(())
        })
    }
}
