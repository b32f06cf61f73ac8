//! Rule store
//!
//! Loads a directory of JSON rule files into a [`RuleBase`] and serves
//! conformance evaluations against it. Evaluations requested while the store
//! is still loading are queued and answered, in submission order, as soon as
//! the rules are ready.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bibcheck_core::{Entry, RuleStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RuleStore::new());
//! let loading = store.spawn_load("conformityRules");
//!
//! // Queued until the rules are loaded
//! let entry = Entry::new("knuth1984", "article").with_tag("title", "Literate Programming");
//! let conformance = store.evaluate(&entry).await?;
//!
//! loading.await??;
//! println!("{:?}", conformance);
//! # Ok(())
//! # }
//! ```

use futures::future::try_join_all;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{RuleBase, RuleFile};
use crate::diagnostics::Conformance;
use crate::entry::Entry;
use crate::error::RuleError;
use crate::merge::drain_queue;

struct QueuedEvaluation {
    entry: Entry,
    reply: oneshot::Sender<Conformance>,
}

enum StoreState {
    Loading { queue: VecDeque<QueuedEvaluation> },
    Ready(Arc<RuleBase>),
    Failed(String),
}

enum Admission {
    Ready(Arc<RuleBase>),
    Queued(oneshot::Receiver<Conformance>),
}

/// Shared, lazily-ready conformance rules
pub struct RuleStore {
    state: Mutex<StoreState>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match &*self.lock() {
            StoreState::Loading { queue } => format!("loading ({} queued)", queue.len()),
            StoreState::Ready(base) => format!("ready ({} entry types)", base.len()),
            StoreState::Failed(reason) => format!("failed ({})", reason),
        };
        f.debug_struct("RuleStore").field("status", &status).finish()
    }
}

impl RuleStore {
    /// Create a store that is not ready yet
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::Loading {
                queue: VecDeque::new(),
            }),
        }
    }

    /// Create a store that is ready with the given rules
    pub fn with_rule_base(base: RuleBase) -> Self {
        Self {
            state: Mutex::new(StoreState::Ready(Arc::new(base))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether rules have been loaded
    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock(), StoreState::Ready(_))
    }

    /// The loaded rules, if ready
    pub fn rule_base(&self) -> Option<Arc<RuleBase>> {
        match &*self.lock() {
            StoreState::Ready(base) => Some(Arc::clone(base)),
            _ => None,
        }
    }

    /// Number of evaluations waiting for the store to become ready
    pub fn queued(&self) -> usize {
        match &*self.lock() {
            StoreState::Loading { queue } => queue.len(),
            _ => 0,
        }
    }

    /// Load every file in `dir` and make the store ready
    ///
    /// Any unreadable or malformed file fails the whole load; a store that
    /// fails while loading rejects all queued and future evaluations.
    pub async fn load(&self, dir: impl AsRef<Path>) -> Result<Arc<RuleBase>, RuleError> {
        let dir = dir.as_ref();
        match load_dir(dir).await {
            Ok(base) => Ok(self.install(base)),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Failed to load conformance rules");
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Load rules in a background task
    pub fn spawn_load(
        self: &Arc<Self>,
        dir: impl Into<PathBuf>,
    ) -> JoinHandle<Result<Arc<RuleBase>, RuleError>> {
        let store = Arc::clone(self);
        let dir = dir.into();
        tokio::spawn(async move { store.load(&dir).await })
    }

    /// Make the store ready with `base`, answering queued evaluations in order
    pub fn install(&self, base: RuleBase) -> Arc<RuleBase> {
        let base = Arc::new(base);
        let mut queued = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, StoreState::Ready(Arc::clone(&base))) {
                StoreState::Loading { queue } => queue,
                _ => VecDeque::new(),
            }
        };

        tracing::info!(
            entry_types = base.len(),
            queued = queued.len(),
            "Conformance rules ready"
        );

        let drained = drain_queue(&mut queued, |item| {
            // A caller that stopped waiting is not an error.
            let _ = item.reply.send(base.evaluate(&item.entry));
        });
        if drained > 0 {
            tracing::debug!(drained, "Answered queued conformance checks");
        }

        base
    }

    fn fail(&self, error: &RuleError) {
        let mut state = self.lock();
        if !matches!(&*state, StoreState::Loading { .. }) {
            return;
        }

        let previous = std::mem::replace(&mut *state, StoreState::Failed(error.to_string()));
        if let StoreState::Loading { queue } = previous {
            // Dropping the queue closes every reply channel.
            tracing::warn!(queued = queue.len(), "Rejecting queued conformance checks");
        }
    }

    fn admit(&self, entry: &Entry) -> Result<Admission, RuleError> {
        let mut state = self.lock();
        match &mut *state {
            StoreState::Ready(base) => Ok(Admission::Ready(Arc::clone(base))),
            StoreState::Failed(reason) => Err(RuleError::Unavailable(reason.clone())),
            StoreState::Loading { queue } => {
                let (reply, receiver) = oneshot::channel();
                queue.push_back(QueuedEvaluation {
                    entry: entry.clone(),
                    reply,
                });
                Ok(Admission::Queued(receiver))
            }
        }
    }

    /// Evaluate an entry's conformance, waiting for the rules if needed
    pub async fn evaluate(&self, entry: &Entry) -> Result<Conformance, RuleError> {
        match self.admit(entry)? {
            Admission::Ready(base) => Ok(base.evaluate(entry)),
            Admission::Queued(receiver) => receiver.await.map_err(|_| {
                RuleError::Unavailable("rule store failed before becoming ready".to_string())
            }),
        }
    }
}

/// Read and merge every rule file in a directory
///
/// Files are merged in file-name order so precedence between files is
/// deterministic. Subdirectories are skipped.
pub async fn load_dir(dir: impl AsRef<Path>) -> Result<RuleBase, RuleError> {
    let dir = dir.as_ref();
    let load_error = |source| RuleError::Load {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(load_error)?;
    let mut paths = Vec::new();
    while let Some(item) = reader.next_entry().await.map_err(load_error)? {
        if item.file_type().await.map_err(load_error)?.is_dir() {
            continue;
        }
        paths.push(item.path());
    }
    paths.sort();

    let files = try_join_all(paths.iter().map(|path| read_rule_file(path))).await?;

    let mut builder = RuleBase::builder();
    for (path, file) in paths.iter().zip(files) {
        builder.add_rules(&path.display().to_string(), file)?;
    }

    tracing::debug!(dir = %dir.display(), files = builder.source_count(), "Loaded rule files");
    Ok(builder.build())
}

async fn read_rule_file(path: &Path) -> Result<RuleFile, RuleError> {
    let data = tokio::fs::read(path).await.map_err(|source| RuleError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&data).map_err(|source| RuleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
