//! Lazily initialized, process-scoped handle to a RAG engine

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{EngineState, RagEngine, RagEngineFactory};
use crate::error::Error;
use crate::providers::{EmbeddingProvider, LlmProvider};

enum HandleState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn RagEngine>),
    Failed {
        reason: String,
    },
}

/// Owns at most one engine binding.
///
/// `ensure_initialized` is serialised by an async gate so concurrent first
/// use constructs the engine once. The state lock is only held for short,
/// non-suspending reads and writes; submissions clone the engine `Arc` and
/// run without any lock.
pub struct RagEngineHandle {
    factory: Arc<dyn RagEngineFactory>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    gate: tokio::sync::Mutex<()>,
    state: RwLock<HandleState>,
}

impl RagEngineHandle {
    pub fn new(
        factory: Arc<dyn RagEngineFactory>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            factory,
            embedder,
            llm,
            gate: tokio::sync::Mutex::new(()),
            state: RwLock::new(HandleState::Uninitialized),
        }
    }

    /// Bind the engine to `working_dir`, constructing it if it is not ready.
    ///
    /// Never returns an error: a construction failure moves the handle to
    /// `Failed` and is logged. Calling again after a failure retries from
    /// scratch; calling again after success is a no-op.
    pub async fn ensure_initialized(&self, working_dir: &Path) -> EngineState {
        let _gate = self.gate.lock().await;

        if let Some(bound) = self.ready_dir() {
            if bound != working_dir {
                tracing::warn!(
                    "RAG engine already bound to {}, ignoring request for {}",
                    bound.display(),
                    working_dir.display()
                );
            }
            return self.state();
        }

        tracing::info!(
            "Initializing RAG engine in working directory: {} (embedder {}, {} dims; llm {} / {})",
            working_dir.display(),
            self.embedder.name(),
            self.embedder.dimensions(),
            self.llm.name(),
            self.llm.model()
        );
        *self.state.write() = HandleState::Initializing;

        let next = match self.construct(working_dir).await {
            Ok(engine) => {
                tracing::info!("RAG engine ready ({})", engine.working_dir().display());
                HandleState::Ready(engine)
            }
            Err(e) => {
                tracing::error!("Error initializing RAG engine: {}", e);
                HandleState::Failed {
                    reason: e.to_string(),
                }
            }
        };
        *self.state.write() = next;

        self.state()
    }

    async fn construct(&self, working_dir: &Path) -> crate::Result<Arc<dyn RagEngine>> {
        tokio::fs::create_dir_all(working_dir).await.map_err(|e| {
            Error::engine_init(format!(
                "cannot create working directory {}: {}",
                working_dir.display(),
                e
            ))
        })?;

        self.factory
            .construct(working_dir, Arc::clone(&self.embedder), Arc::clone(&self.llm))
            .await
    }

    /// The engine, when ready. The returned `Arc` is detached from the
    /// handle's lock.
    pub fn engine(&self) -> Option<Arc<dyn RagEngine>> {
        match &*self.state.read() {
            HandleState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    fn ready_dir(&self) -> Option<PathBuf> {
        match &*self.state.read() {
            HandleState::Ready(engine) => Some(engine.working_dir().to_path_buf()),
            _ => None,
        }
    }

    /// Snapshot of the lifecycle state
    pub fn state(&self) -> EngineState {
        match &*self.state.read() {
            HandleState::Uninitialized => EngineState::Uninitialized,
            HandleState::Initializing => EngineState::Initializing,
            HandleState::Ready(engine) => EngineState::Ready {
                working_dir: engine.working_dir().to_path_buf(),
            },
            HandleState::Failed { reason } => EngineState::Failed {
                reason: reason.clone(),
            },
        }
    }
}
