//! Asynchronous source loading
//!
//! Loads run on a tokio runtime, off the frame clock and the host thread.
//! Every load is stamped with the [`GenerationToken`] current when it was
//! requested; a completion whose token is no longer current is stale and
//! must not touch the scene.

use crate::error::PlayerError;
use crate::fetch::ByteFetcher;
use crate::runtime::{AnimationRuntime, FileOf};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

/// Identifies one source request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationToken(u64);

impl GenerationToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GenerationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source generation
///
/// Advanced on every source change; never decreases.
#[derive(Debug, Default)]
pub struct GenerationCounter(AtomicU64);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> GenerationToken {
        GenerationToken(self.0.load(Ordering::Acquire))
    }

    /// Invalidate every outstanding token and return the new one
    pub fn advance(&self) -> GenerationToken {
        GenerationToken(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.current() == token
    }
}

/// Progress of the most recent source request
///
/// Only the current generation is ever published; a load that settles
/// after a newer request leaves the status untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// No source set (or the source was cleared)
    Idle,
    Loading(GenerationToken),
    /// The file is queued for the scene
    Loaded(GenerationToken),
    /// Fetch or parse failed; reported to error listeners
    Failed(GenerationToken),
}

impl LoadStatus {
    pub fn token(&self) -> Option<GenerationToken> {
        match self {
            LoadStatus::Idle => None,
            LoadStatus::Loading(token)
            | LoadStatus::Loaded(token)
            | LoadStatus::Failed(token) => Some(*token),
        }
    }

    /// Whether the request has reached a final state
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadStatus::Loading(_))
    }
}

/// Fetch and parse `uri`
pub async fn load_source<R: AnimationRuntime>(
    runtime: &R,
    fetcher: &dyn ByteFetcher,
    uri: &str,
) -> Result<FileOf<R>, PlayerError> {
    tracing::debug!("Fetching source: {}", uri);
    let bytes = fetcher
        .fetch(uri)
        .await
        .map_err(|e| PlayerError::fetch(uri, e))?;
    tracing::debug!("Fetched {} bytes from {}", bytes.len(), uri);

    runtime.parse(&bytes).map_err(|e| PlayerError::parse(uri, e))
}

/// Runs source loads on a tokio runtime
pub struct SourceLoader<R: AnimationRuntime> {
    runtime: Arc<R>,
    fetcher: Arc<dyn ByteFetcher>,
    handle: Handle,
    owned: Option<Runtime>,
}

impl<R: AnimationRuntime> SourceLoader<R> {
    /// Spawn loads on an existing tokio runtime
    pub fn with_handle(runtime: Arc<R>, fetcher: Arc<dyn ByteFetcher>, handle: Handle) -> Self {
        Self {
            runtime,
            fetcher,
            handle,
            owned: None,
        }
    }

    /// Spawn loads on a private single-worker runtime
    pub fn new(runtime: Arc<R>, fetcher: Arc<dyn ByteFetcher>) -> Result<Self, PlayerError> {
        let owned = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rive-source-loader")
            .enable_all()
            .build()
            .map_err(|e| PlayerError::Spawn(format!("source loader runtime: {}", e)))?;
        let handle = owned.handle().clone();
        Ok(Self {
            runtime,
            fetcher,
            handle,
            owned: Some(owned),
        })
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// Start loading `uri`; `on_complete` runs on the loader when it settles
    pub fn request_load<F>(&self, uri: String, token: GenerationToken, on_complete: F)
    where
        F: FnOnce(GenerationToken, Result<FileOf<R>, PlayerError>) + Send + 'static,
    {
        let runtime = Arc::clone(&self.runtime);
        let fetcher = Arc::clone(&self.fetcher);
        self.handle.spawn(async move {
            let result = load_source(&*runtime, &*fetcher, &uri).await;
            if let Err(e) = &result {
                tracing::debug!("Load {} failed: {}", token, e);
            }
            on_complete(token, result);
        });
    }
}

impl<R: AnimationRuntime> Drop for SourceLoader<R> {
    fn drop(&mut self) {
        // Allowed from inside the runtime, which is where the last player
        // reference may be released.
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

impl<R: AnimationRuntime> fmt::Debug for SourceLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLoader")
            .field("owns_runtime", &self.owned.is_some())
            .finish()
    }
}
