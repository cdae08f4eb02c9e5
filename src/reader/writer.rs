//! Background queue for progress writes.

use crate::reader::store::ProgressStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One progress write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// User ID.
    pub user_id: String,
    /// Book ID.
    pub book_id: String,
    /// Page to record.
    pub page: u32,
    /// Percentage to record.
    pub progress: f64,
}

/// Fire-and-forget progress persistence.
///
/// Updates are applied in submission order by a single task. Store errors
/// are logged and dropped.
pub struct ProgressWriter {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
    handle: JoinHandle<()>,
}

impl ProgressWriter {
    /// Spawn the writer task. Must be called within a tokio runtime.
    pub fn spawn(store: Arc<dyn ProgressStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::run(store, rx));
        Self { tx, handle }
    }

    async fn run(store: Arc<dyn ProgressStore>, mut rx: mpsc::UnboundedReceiver<ProgressUpdate>) {
        while let Some(update) = rx.recv().await {
            let store = store.clone();
            let page = update.page;
            let book_id = update.book_id.clone();

            let result = tokio::task::spawn_blocking(move || {
                store.upsert(&update.user_id, &update.book_id, update.page, update.progress)
            })
            .await;

            match result {
                Ok(Ok(())) => tracing::debug!(book_id = %book_id, page, "Progress saved"),
                Ok(Err(e)) => {
                    tracing::warn!(book_id = %book_id, page, error = %e, "Failed to save progress")
                }
                Err(e) => {
                    tracing::warn!(book_id = %book_id, page, error = %e, "Progress write task failed")
                }
            }
        }
    }

    /// Queue an update without waiting for it. Returns `false` if the writer
    /// task has stopped.
    pub fn submit(&self, update: ProgressUpdate) -> bool {
        self.tx.send(update).is_ok()
    }

    /// Stop accepting updates and wait for queued ones to be written.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Progress writer ended abnormally");
        }
    }
}
