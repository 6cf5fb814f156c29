pub mod disk;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::images::{self, RenderError};
use crate::resolver::source::normalize_extension;
use crate::resolver::{CacheKey, ImageSource};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Source image '{filename}' is unreadable: {reason}")]
    SourceImageUnreadable { filename: String, reason: String },

    #[error("Failed to write cache file {}: {reason}", path.display())]
    CacheWriteFailed { path: PathBuf, reason: String },

    #[error("Resize failed: {0}")]
    ResizeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from an existing entry.
    Hit,
    /// Computed and stored by this caller.
    Miss,
    /// Waited on another caller's computation for the same key.
    Coalesced,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "HIT"),
            CacheStatus::Miss => write!(f, "MISS"),
            CacheStatus::Coalesced => write!(f, "COALESCED"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Artifact {
    Stored { path: PathBuf, status: CacheStatus },
    /// The resize succeeded but the entry could not be written.
    Transient { bytes: Arc<Vec<u8>>, reason: String },
}

impl Artifact {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Artifact::Stored { path, .. } => Some(path),
            Artifact::Transient { .. } => None,
        }
    }

    fn coalesced(self) -> Self {
        match self {
            Artifact::Stored { path, .. } => Artifact::Stored {
                path,
                status: CacheStatus::Coalesced,
            },
            transient => transient,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub extension: String,
    pub jpeg_quality: u8,
    pub fallback_on_write_failure: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            extension: "jpeg".to_string(),
            jpeg_quality: 75,
            fallback_on_write_failure: true,
        }
    }
}

type Flight = Shared<BoxFuture<'static, Result<Artifact, CacheError>>>;

/// Disk cache of resized images keyed by [`CacheKey`].
///
/// Concurrent misses on one key share a single computation.
pub struct ResizeCache {
    root: PathBuf,
    source: Arc<dyn ImageSource>,
    settings: CacheSettings,
    in_flight: Arc<Mutex<HashMap<CacheKey, Flight>>>,
}

impl ResizeCache {
    pub fn new(root: impl Into<PathBuf>, source: Arc<dyn ImageSource>, mut settings: CacheSettings) -> Self {
        settings.extension = normalize_extension(&settings.extension);
        Self {
            root: root.into(),
            source,
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Existing entry for `key`. Never touches the source image.
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        disk::lookup(&key.dir(&self.root), &self.settings.extension).await
    }

    pub async fn get_or_create(&self, key: &CacheKey) -> Result<Artifact, CacheError> {
        if let Some(path) = self.lookup(key).await {
            debug!("Cache hit for {}: {}", key, path.display());
            return Ok(Artifact::Stored {
                path,
                status: CacheStatus::Hit,
            });
        }

        let (flight, is_owner) = self.join_inflight(key);
        if is_owner {
            info!("Cache miss for {}", key);
            flight.await
        } else {
            info!("Waiting on in-flight resize for {}", key);
            flight.await.map(Artifact::coalesced)
        }
    }

    fn join_inflight(&self, key: &CacheKey) -> (Flight, bool) {
        let mut map = self.in_flight.lock();
        if let Some(existing) = map.get(key) {
            return (existing.clone(), false);
        }

        let job = Populate {
            key: key.clone(),
            root: self.root.clone(),
            source: Arc::clone(&self.source),
            settings: self.settings.clone(),
        };
        let in_flight = Arc::clone(&self.in_flight);
        let flight_key = key.clone();

        let flight = async move {
            let result = job.run().await;
            // The entry is on disk (or failed) before later callers miss again.
            in_flight.lock().remove(&flight_key);
            result
        }
        .boxed()
        .shared();

        map.insert(key.clone(), flight.clone());
        (flight, true)
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

struct Populate {
    key: CacheKey,
    root: PathBuf,
    source: Arc<dyn ImageSource>,
    settings: CacheSettings,
}

impl Populate {
    async fn run(self) -> Result<Artifact, CacheError> {
        // Another caller may have finished this key since our lookup.
        if let Some(path) = disk::lookup(&self.key.dir(&self.root), &self.settings.extension).await {
            return Ok(Artifact::Stored {
                path,
                status: CacheStatus::Hit,
            });
        }

        let started = Instant::now();
        let encoded = self.render().await?;
        info!(
            "Resized {} to {}x{} in {:.2}ms",
            self.key.filename,
            self.key.width,
            self.key.height,
            started.elapsed().as_secs_f64() * 1000.0
        );

        let path = self.key.path(&self.root);
        match disk::write_atomic(&path, &encoded).await {
            Ok(()) => Ok(Artifact::Stored {
                path,
                status: CacheStatus::Miss,
            }),
            Err(e) => {
                let err = CacheError::CacheWriteFailed {
                    path,
                    reason: e.to_string(),
                };
                if self.settings.fallback_on_write_failure {
                    warn!("{}; serving uncached image", err);
                    Ok(Artifact::Transient {
                        bytes: Arc::new(encoded),
                        reason: err.to_string(),
                    })
                } else {
                    error!("{}", err);
                    Err(err)
                }
            }
        }
    }

    async fn render(&self) -> Result<Vec<u8>, CacheError> {
        let source = Arc::clone(&self.source);
        let filename = self.key.filename.clone();
        let (width, height) = (self.key.width, self.key.height);
        let quality = self.settings.jpeg_quality;

        let rendered = tokio::task::spawn_blocking(move || {
            let bytes = source
                .read_image(&filename)
                .map_err(|e| CacheError::SourceImageUnreadable {
                    filename: filename.clone(),
                    reason: e.to_string(),
                })?;

            images::render(&bytes, width, height, quality).map_err(|e| match e {
                RenderError::Decode(reason) => CacheError::SourceImageUnreadable { filename, reason },
                RenderError::Encode(reason) => CacheError::ResizeFailed(reason),
            })
        })
        .await;

        match rendered {
            Ok(result) => {
                if let Err(e) = &result {
                    error!("Failed to render {}: {}", self.key, e);
                }
                result
            }
            Err(e) => {
                error!("Resize task for {} aborted: {}", self.key, e);
                Err(CacheError::ResizeFailed(e.to_string()))
            }
        }
    }
}
