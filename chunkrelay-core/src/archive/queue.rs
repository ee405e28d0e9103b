// Bounded archive queue drained by a worker pool.
//
// Producers never wait on the queue: when it is full the item is dropped with
// a warning. Workers pull one item at a time and hand it to the archiver.

use super::{ArchiveItem, Archiver};
use crate::metrics::archive::ARCHIVE_RESULTS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Sending side of the archive queue. Cheap to clone.
#[derive(Clone)]
pub struct ArchiveQueue {
    sender: mpsc::Sender<ArchiveItem>,
    backend: &'static str,
    capacity: usize,
}

/// Worker tasks draining an [`ArchiveQueue`]
pub struct ArchiveWorkers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ArchiveQueue {
    /// Create a queue with `capacity` slots and spawn `workers` tasks feeding `archiver`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        archiver: Arc<dyn Archiver>,
        workers: usize,
        capacity: usize,
    ) -> (Self, ArchiveWorkers) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let cancel = CancellationToken::new();
        let backend = archiver.name();

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let span = tracing::info_span!("archive_worker", worker_id, backend);
                tokio::spawn(
                    worker_loop(Arc::clone(&archiver), Arc::clone(&receiver), cancel.clone())
                        .instrument(span),
                )
            })
            .collect::<Vec<_>>();

        info!(
            backend = backend,
            workers = handles.len(),
            capacity = capacity,
            "Archive queue started"
        );

        (
            Self {
                sender,
                backend,
                capacity,
            },
            ArchiveWorkers { cancel, handles },
        )
    }

    /// Queue an item without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, item: ArchiveItem) -> bool {
        match self.sender.try_send(item) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(item)) => {
                warn!(
                    stream_id = %item.stream_id,
                    index = item.index,
                    capacity = self.capacity,
                    "Archive queue full, dropping chunk"
                );
                ARCHIVE_RESULTS.with_label_values(&[self.backend, "dropped"]).inc();
                false
            }
            Err(mpsc::error::TrySendError::Closed(item)) => {
                error!(
                    stream_id = %item.stream_id,
                    index = item.index,
                    "Archive queue closed, dropping chunk"
                );
                ARCHIVE_RESULTS.with_label_values(&[self.backend, "dropped"]).inc();
                false
            }
        }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Items currently waiting for a worker
    #[must_use]
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

impl ArchiveWorkers {
    /// Stop taking new items and wait up to `grace` for in-flight uploads.
    ///
    /// Workers still running after `grace` are aborted; queued items are dropped.
    /// Returns `true` if every worker finished on its own.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.cancel.cancel();

        let aborts: Vec<_> = self.handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(grace, futures::future::join_all(self.handles)).await;

        if joined.is_ok() {
            info!("Archive workers stopped");
            true
        } else {
            warn!(grace = ?grace, "Archive workers did not stop in time, aborting");
            for abort in aborts {
                abort.abort();
            }
            false
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

async fn worker_loop(
    archiver: Arc<dyn Archiver>,
    receiver: Arc<Mutex<mpsc::Receiver<ArchiveItem>>>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = receiver.recv() => item,
            }
        };

        let Some(item) = next else {
            debug!("Archive worker exiting");
            return;
        };

        match archiver.archive(&item).await {
            Ok(receipt) => {
                ARCHIVE_RESULTS.with_label_values(&[archiver.name(), "ok"]).inc();
                info!(
                    stream_id = %item.stream_id,
                    index = item.index,
                    location = %receipt.location,
                    "Chunk archived"
                );
            }
            Err(e) => {
                ARCHIVE_RESULTS.with_label_values(&[archiver.name(), "failed"]).inc();
                warn!(
                    stream_id = %item.stream_id,
                    index = item.index,
                    error = %e,
                    "Chunk archive failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveError, ArchiveReceipt};
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Records archived items, optionally failing or stalling
    struct RecordingArchiver {
        seen: mpsc::UnboundedSender<u64>,
        fail: bool,
        stall: Option<Arc<tokio::sync::Notify>>,
    }

    #[async_trait]
    impl Archiver for RecordingArchiver {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn archive(&self, item: &ArchiveItem) -> Result<ArchiveReceipt, ArchiveError> {
            if let Some(stall) = &self.stall {
                stall.notified().await;
            }
            let _ = self.seen.send(item.index);
            if self.fail {
                Err(ArchiveError::InvalidResponse("boom".to_string()))
            } else {
                Ok(ArchiveReceipt {
                    location: format!("mem://{}", item.suggested_name),
                })
            }
        }
    }

    fn item(index: u64) -> ArchiveItem {
        ArchiveItem {
            stream_id: "s1".to_string(),
            index,
            content_type: "video/webm".to_string(),
            suggested_name: format!("chunk_{index}.webm"),
            payload: Bytes::from_static(b"payload"),
        }
    }

    #[tokio::test]
    async fn test_items_reach_archiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let archiver = Arc::new(RecordingArchiver { seen: tx, fail: false, stall: None });
        let (queue, workers) = ArchiveQueue::start(archiver, 2, 16);
        assert_eq!(workers.worker_count(), 2);

        for i in 0..5 {
            assert!(queue.enqueue(item(i)));
        }

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        assert!(workers.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_workers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let archiver = Arc::new(RecordingArchiver { seen: tx, fail: true, stall: None });
        let (queue, workers) = ArchiveQueue::start(archiver, 1, 4);

        assert!(queue.enqueue(item(0)));
        assert!(queue.enqueue(item(1)));
        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));

        assert!(workers.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let stall = Arc::new(tokio::sync::Notify::new());
        let archiver = Arc::new(RecordingArchiver {
            seen: tx,
            fail: false,
            stall: Some(Arc::clone(&stall)),
        });
        let (queue, workers) = ArchiveQueue::start(archiver, 1, 1);

        // Let the single worker take the first item and stall on it
        assert!(queue.enqueue(item(0)));
        while queue.pending() > 0 {
            tokio::task::yield_now().await;
        }

        assert!(queue.enqueue(item(1)));
        assert!(!queue.enqueue(item(2)));
        assert!(!queue.enqueue(item(3)));
        assert_eq!(queue.pending(), 1);

        // Worker is stuck inside the archiver, so shutdown has to abort it
        assert!(!workers.shutdown(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_dropped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let archiver = Arc::new(RecordingArchiver { seen: tx, fail: false, stall: None });
        let (queue, workers) = ArchiveQueue::start(archiver, 1, 4);

        assert!(workers.shutdown(Duration::from_secs(1)).await);
        // Give the runtime a moment to drop the receiver held by the workers
        tokio::task::yield_now().await;
        assert!(!queue.enqueue(item(0)));
    }
}
