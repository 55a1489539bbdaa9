use crate::error::ServiceError;
use curtail_core::{ShortCode, UrlStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

/// Tuning knobs for the deletion pipeline.
#[derive(Debug, Clone, TypedBuilder)]
pub struct DeleterSettings {
    /// Capacity of the task queue. Producers block once it is full;
    /// backpressure is the policy, not dropping.
    #[builder(default = 5)]
    pub queue_capacity: usize,
    /// An owner whose pending list reaches this size is flushed
    /// immediately, without waiting for the timer.
    #[builder(default = 100)]
    pub max_batch: usize,
    /// Every interval, all owners' pending lists are flushed.
    #[builder(default = Duration::from_secs(1))]
    pub flush_interval: Duration,
}

impl Default for DeleterSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

struct DeleteTask {
    owner: String,
    codes: Vec<ShortCode>,
}

/// Handle to the asynchronous deletion pipeline.
///
/// One background task drains a bounded queue of deletion requests,
/// coalesces codes per owner, and flushes them into the backend as
/// `mark_deleted` batches. Marking is best-effort and eventually
/// consistent: callers get their acknowledgement at enqueue time, and
/// a failed flush is logged and forgotten (the codes stay resolvable
/// until a later deletion request covers them again).
///
/// Dropping the handle closes the queue, which makes the task perform
/// a final flush and exit; [`shutdown`](Deleter::shutdown) does the
/// same but waits for the task to finish.
pub struct Deleter {
    tx: mpsc::Sender<DeleteTask>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Deleter {
    /// Starts the pipeline's consumer task against the given backend.
    pub fn spawn<S: UrlStore>(store: Arc<S>, settings: DeleterSettings) -> Self {
        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run(store, rx, cancel.clone(), settings));

        Self {
            tx,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues codes for asynchronous soft deletion on behalf of `owner`.
    ///
    /// Blocks while the queue is full. Returns
    /// [`ServiceError::PipelineStopped`] once the pipeline has shut
    /// down; a request is never silently dropped.
    pub async fn enqueue(&self, owner: &str, codes: Vec<ShortCode>) -> Result<(), ServiceError> {
        self.tx
            .send(DeleteTask {
                owner: owner.to_owned(),
                codes,
            })
            .await
            .map_err(|_| ServiceError::PipelineStopped)
    }

    /// Signals the consumer to stop and waits until it has flushed all
    /// pending lists and terminated.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.lock().await.take() {
            let _ = worker.await;
        }
    }
}

async fn run<S: UrlStore>(
    store: Arc<S>,
    mut rx: mpsc::Receiver<DeleteTask>,
    cancel: CancellationToken,
    settings: DeleterSettings,
) {
    let mut pending: HashMap<String, Vec<ShortCode>> = HashMap::new();
    // interval_at: the first tick fires one interval from now, not
    // immediately.
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + settings.flush_interval,
        settings.flush_interval,
    );

    loop {
        tokio::select! {
            task = rx.recv() => match task {
                Some(task) => {
                    let queue = pending.entry(task.owner.clone()).or_default();
                    queue.extend(task.codes);
                    if queue.len() >= settings.max_batch {
                        let batch = std::mem::take(queue);
                        flush_owner(store.as_ref(), &task.owner, batch).await;
                    }
                }
                // Queue closed: every producer handle is gone.
                None => {
                    flush_all(store.as_ref(), &mut pending).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                flush_all(store.as_ref(), &mut pending).await;
            }
            _ = cancel.cancelled() => {
                // Drain whatever producers managed to enqueue before
                // the signal, then flush once.
                while let Ok(task) = rx.try_recv() {
                    pending.entry(task.owner).or_default().extend(task.codes);
                }
                flush_all(store.as_ref(), &mut pending).await;
                return;
            }
        }
    }
}

async fn flush_all<S: UrlStore>(store: &S, pending: &mut HashMap<String, Vec<ShortCode>>) {
    for (owner, codes) in pending.drain() {
        if !codes.is_empty() {
            flush_owner(store, &owner, codes).await;
        }
    }
}

async fn flush_owner<S: UrlStore>(store: &S, owner: &str, codes: Vec<ShortCode>) {
    let count = codes.len();
    match store.mark_deleted(owner, &codes).await {
        Ok(()) => debug!(owner, count, "flushed deletion batch"),
        // Best-effort: the codes stay resolvable until a later request.
        Err(err) => warn!(owner, count, error = %err, "failed to flush deletion batch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curtail_core::error::{Result, StoreError};
    use curtail_core::link::{BatchEntry, SaveOutcome, UserLink};
    use std::sync::Mutex as StdMutex;
    use tokio::time::advance;

    /// Backend double that records `mark_deleted` calls.
    #[derive(Default)]
    struct RecordingStore {
        deleted: StdMutex<Vec<(String, Vec<ShortCode>)>>,
        fail_marks: bool,
    }

    impl RecordingStore {
        fn failing() -> Self {
            Self {
                fail_marks: true,
                ..Default::default()
            }
        }

        fn flushes(&self) -> Vec<(String, Vec<ShortCode>)> {
            self.deleted.lock().unwrap().clone()
        }

        fn flushed_codes(&self, owner: &str) -> Vec<String> {
            self.flushes()
                .iter()
                .filter(|(o, _)| o == owner)
                .flat_map(|(_, codes)| codes.iter().map(|c| c.as_str().to_owned()))
                .collect()
        }
    }

    #[async_trait]
    impl UrlStore for RecordingStore {
        async fn save_url(&self, _owner: &str, _original: &str) -> Result<SaveOutcome> {
            Err(StoreError::Unsupported("save_url"))
        }

        async fn get_url(&self, _code: &ShortCode) -> Result<Option<String>> {
            Ok(None)
        }

        async fn batch_save(&self, _owner: &str, _entries: &[BatchEntry]) -> Result<()> {
            Ok(())
        }

        async fn user_urls(&self, _owner: &str) -> Result<Vec<UserLink>> {
            Ok(Vec::new())
        }

        async fn mark_deleted(&self, owner: &str, codes: &[ShortCode]) -> Result<()> {
            if self.fail_marks {
                return Err(StoreError::Unavailable("backend down".into()));
            }
            self.deleted
                .lock()
                .unwrap()
                .push((owner.to_owned(), codes.to_vec()));
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn count_urls(&self) -> Result<u64> {
            Ok(0)
        }

        async fn count_users(&self) -> Result<u64> {
            Ok(0)
        }
    }

    fn codes(values: &[&str]) -> Vec<ShortCode> {
        values.iter().copied().map(ShortCode::new_unchecked).collect()
    }

    fn settings() -> DeleterSettings {
        DeleterSettings::default()
    }

    #[test]
    fn default_settings() {
        let settings = settings();
        assert_eq!(settings.queue_capacity, 5);
        assert_eq!(settings.max_batch, 100);
        assert_eq!(settings.flush_interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flushes_small_batches() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(store.clone(), settings());
        // Let the worker take its first poll so its flush interval is
        // anchored at the paused clock's origin before we advance time.
        tokio::task::yield_now().await;

        deleter.enqueue("u1", codes(&["aaaa1111"])).await.unwrap();

        // Before the interval elapses, nothing is flushed.
        advance(Duration::from_millis(500)).await;
        assert!(store.flushes().is_empty());

        advance(Duration::from_millis(600)).await;
        // Let the worker observe the elapsed interval and flush.
        tokio::task::yield_now().await;
        assert_eq!(store.flushed_codes("u1"), vec!["aaaa1111"]);

        deleter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn batch_threshold_flushes_without_the_timer() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(
            store.clone(),
            DeleterSettings::builder().max_batch(3).build(),
        );

        deleter
            .enqueue("u1", codes(&["aaaa1111", "bbbb2222", "cccc3333"]))
            .await
            .unwrap();

        // Let the consumer run; no timer advance past the interval.
        advance(Duration::from_millis(10)).await;
        assert_eq!(
            store.flushed_codes("u1"),
            vec!["aaaa1111", "bbbb2222", "cccc3333"]
        );

        deleter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_flushes_only_that_owner() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(
            store.clone(),
            DeleterSettings::builder().max_batch(2).build(),
        );

        deleter.enqueue("slow", codes(&["aaaa1111"])).await.unwrap();
        deleter
            .enqueue("fast", codes(&["bbbb2222", "cccc3333"]))
            .await
            .unwrap();

        advance(Duration::from_millis(10)).await;
        assert_eq!(store.flushed_codes("fast"), vec!["bbbb2222", "cccc3333"]);
        assert!(store.flushed_codes("slow").is_empty());

        deleter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn per_owner_order_is_preserved() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(store.clone(), settings());
        // Anchor the worker's flush interval at the paused clock's origin.
        tokio::task::yield_now().await;

        deleter
            .enqueue("u1", codes(&["aaaa1111", "bbbb2222"]))
            .await
            .unwrap();
        deleter.enqueue("u1", codes(&["cccc3333"])).await.unwrap();

        advance(Duration::from_millis(1100)).await;
        // Let the worker observe the elapsed interval and flush.
        tokio::task::yield_now().await;
        assert_eq!(
            store.flushed_codes("u1"),
            vec!["aaaa1111", "bbbb2222", "cccc3333"]
        );

        deleter.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_lists() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(store.clone(), settings());

        deleter.enqueue("u1", codes(&["aaaa1111"])).await.unwrap();
        deleter.shutdown().await;

        assert_eq!(store.flushed_codes("u1"), vec!["aaaa1111"]);
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_after_shutdown_errors_instead_of_blocking() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(store.clone(), settings());

        deleter.shutdown().await;

        let err = deleter
            .enqueue("u1", codes(&["aaaa1111"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PipelineStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_closes_the_queue_and_flushes() {
        let store = Arc::new(RecordingStore::default());
        let deleter = Deleter::spawn(store.clone(), settings());

        deleter.enqueue("u1", codes(&["aaaa1111"])).await.unwrap();
        drop(deleter);

        // The detached consumer observes the closed queue and flushes.
        advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.flushed_codes("u1"), vec!["aaaa1111"]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_failures_are_swallowed() {
        let store = Arc::new(RecordingStore::failing());
        let deleter = Deleter::spawn(store.clone(), settings());

        deleter.enqueue("u1", codes(&["aaaa1111"])).await.unwrap();
        advance(Duration::from_millis(1100)).await;

        // The pipeline keeps running and accepting work.
        deleter.enqueue("u1", codes(&["bbbb2222"])).await.unwrap();
        deleter.shutdown().await;
    }
}
