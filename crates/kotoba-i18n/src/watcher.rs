//! Observation of structural changes in the UI tree

use crate::dom::{Document, Element, MutationBatch};
use crate::error::{I18nError, I18nResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Receiver of mutation batches
pub type BatchCallback = Arc<dyn Fn(MutationBatch) + Send + Sync>;

/// Delivers structural changes under a root to a callback
pub trait ChangeWatcher: Send + Sync {
    /// Begin delivering batches that touch `root`; restarts if running
    fn start(&self, root: &Element, callback: BatchCallback) -> I18nResult<()>;

    /// Stop delivering; once this returns no callback runs
    fn stop(&self);

    /// Whether batches are currently being delivered
    fn is_running(&self) -> bool;
}

/// Watcher for hosts without a live UI tree
#[derive(Debug, Default)]
pub struct NoopWatcher {
    running: Mutex<bool>,
}

impl NoopWatcher {
    /// Create a watcher that never delivers
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeWatcher for NoopWatcher {
    fn start(&self, _root: &Element, _callback: BatchCallback) -> I18nResult<()> {
        *self.running.lock() = true;
        Ok(())
    }

    fn stop(&self) {
        *self.running.lock() = false;
    }

    fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

struct Running {
    cancel: CancellationToken,
    // Held while a callback runs; `false` once stopped
    gate: Arc<Mutex<bool>>,
}

/// Watcher consuming a [`Document`]'s mutation stream on a tokio task
pub struct DocumentWatcher {
    document: Arc<Document>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for DocumentWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentWatcher")
            .field("running", &self.is_running())
            .finish()
    }
}

impl DocumentWatcher {
    /// Create a watcher for `document`
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            running: Mutex::new(None),
        }
    }

    fn relevant(root: &Element, mut batch: MutationBatch) -> Option<MutationBatch> {
        // Removed nodes are already detached and cannot be located
        batch.added.retain(|element| root.contains(element));
        (!batch.is_empty()).then_some(batch)
    }

    fn deliver(gate: &Mutex<bool>, callback: &BatchCallback, batch: MutationBatch) -> bool {
        let open = gate.lock();
        if !*open {
            return false;
        }
        callback(batch);
        true
    }

    async fn run(
        root: Element,
        mut batches: mpsc::UnboundedReceiver<MutationBatch>,
        callback: BatchCallback,
        cancel: CancellationToken,
        gate: Arc<Mutex<bool>>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                batch = batches.recv() => {
                    let Some(batch) = batch else { break };
                    let Some(batch) = Self::relevant(&root, batch) else { continue };
                    if !Self::deliver(&gate, &callback, batch) {
                        break;
                    }
                }
            }
        }
        debug!("Document watcher stopped");
    }
}

impl ChangeWatcher for DocumentWatcher {
    fn start(&self, root: &Element, callback: BatchCallback) -> I18nResult<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| I18nError::WatcherUnavailable(e.to_string()))?;

        self.stop();

        let cancel = CancellationToken::new();
        let gate = Arc::new(Mutex::new(true));
        let batches = self.document.subscribe();

        handle.spawn(Self::run(
            root.clone(),
            batches,
            callback,
            cancel.clone(),
            Arc::clone(&gate),
        ));

        *self.running.lock() = Some(Running { cancel, gate });
        debug!("Document watcher started");
        Ok(())
    }

    fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.cancel.cancel();
            // Waits for an in-progress callback to return
            *running.gate.lock() = false;
        }
    }

    fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for DocumentWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
