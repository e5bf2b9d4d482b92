// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Download tracker: snapshot refresh plus the self-terminating poll chain.
//!
//! The tracker never invents download records. Starting a download only sends
//! the command; the record (with its server-assigned id and initial status)
//! appears through the refresh that follows. After every applied refresh the
//! tracker re-evaluates one condition: if any record is still in progress,
//! exactly one more refresh is scheduled after the poll interval. An
//! all-terminal snapshot ends the chain, so there is no persistent timer to
//! leak; any later successful start or explicit refresh re-arms it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ClientResult;
use crate::locks::{resilient_read, resilient_write};
use crate::session::SessionView;
use crate::transport::Backend;
use crate::types::DownloadRecord;

/// Delay between poll ticks while any download is in progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks the session's downloads against authoritative server snapshots.
pub struct DownloadTracker<B: Backend + ?Sized> {
    backend: Arc<B>,
    view: Arc<RwLock<SessionView>>,
    /// Claimed (pre-call) sequence numbers for the stale-discard guard.
    /// Shared with every clone so interleaved refreshes stay ordered.
    refresh_seq: Arc<AtomicU64>,
    /// True while a poll chain is alive. The CAS on this flag is what keeps
    /// the schedule at "exactly one more refresh" no matter how many
    /// commands land while a chain is running.
    poll_armed: Arc<AtomicBool>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<B: Backend + ?Sized> Clone for DownloadTracker<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            view: Arc::clone(&self.view),
            refresh_seq: Arc::clone(&self.refresh_seq),
            poll_armed: Arc::clone(&self.poll_armed),
            poll_interval: self.poll_interval,
            cancel: self.cancel.clone(),
        }
    }
}

impl<B: Backend + ?Sized + 'static> DownloadTracker<B> {
    pub fn new(
        backend: Arc<B>,
        view: Arc<RwLock<SessionView>>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            view,
            refresh_seq: Arc::new(AtomicU64::new(0)),
            poll_armed: Arc::new(AtomicBool::new(false)),
            poll_interval,
            cancel,
        }
    }

    /// Fetch the full downloads snapshot, apply it to the session view, and
    /// re-arm the poll chain if anything is still running.
    ///
    /// Returns the view's current downloads (the snapshot just applied, or
    /// the newer one that beat it).
    pub async fn refresh(&self) -> ClientResult<Vec<DownloadRecord>> {
        let records = self.fetch_and_apply().await?;
        self.arm_poll_if_needed(records.iter().any(|r| r.status.is_in_progress()));
        Ok(records)
    }

    /// Issue a start command, then refresh so the new record appears.
    ///
    /// The refresh is only issued once the server has acknowledged the start,
    /// and the returned snapshot is only produced once the refresh has been
    /// applied; callers render server truth, never a guess.
    pub async fn start(&self, unique_id: &str, local_path: &str) -> ClientResult<Vec<DownloadRecord>> {
        self.backend.start_download(unique_id, local_path).await?;
        tracing::info!(unique_id, local_path, "download started");
        self.refresh().await
    }

    /// Issue a stop/remove command for a server-assigned id, then refresh.
    pub async fn stop(&self, id: &str) -> ClientResult<Vec<DownloadRecord>> {
        self.backend.remove_download(id).await?;
        tracing::info!(id, "download removed");
        self.refresh().await
    }

    async fn fetch_and_apply(&self) -> ClientResult<Vec<DownloadRecord>> {
        // Claim the sequence number before the call: a refresh that resolves
        // late must be recognizable as stale no matter when it started.
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.backend.list_downloads().await?;

        let mut view = resilient_write(&self.view);
        view.apply_downloads_snapshot(seq, snapshot);
        Ok(view.downloads())
    }

    /// Arm the poll chain unless one is already running or the session is
    /// shutting down.
    fn arm_poll_if_needed(&self, any_in_progress: bool) {
        if !any_in_progress || self.cancel.is_cancelled() {
            return;
        }
        if self
            .poll_armed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let tracker = self.clone();
        tokio::spawn(async move {
            tracker.poll_chain().await;
        });
    }

    async fn poll_chain(&self) {
        tracing::debug!("download poll chain armed");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self.fetch_and_apply().await {
                Ok(records) => {
                    if !records.iter().any(|r| r.status.is_in_progress()) {
                        break;
                    }
                }
                Err(err) => {
                    // A single failed tick must not kill tracking; the same
                    // refresh is retried on the next scheduled tick.
                    tracing::warn!(%err, "poll tick failed; retrying after delay");
                }
            }
        }
        self.poll_armed.store(false, Ordering::SeqCst);
        tracing::debug!("download poll chain stopped");

        // A refresh may have observed in-progress work while this chain was
        // exiting and lost the arming race; re-check so tracking cannot
        // stall with work outstanding.
        let pending = resilient_read(&self.view).any_download_in_progress();
        self.arm_poll_if_needed(pending);
    }

    /// True while a poll chain is scheduled. Exposed for tests and the
    /// watch-mode CLI rendering loop.
    pub fn poll_armed(&self) -> bool {
        self.poll_armed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::types::DownloadStatus;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn record(id: &str, status: DownloadStatus) -> DownloadRecord {
        DownloadRecord {
            id: id.to_string(),
            name: format!("{}.bin", id),
            local_path: format!("/tmp/{}.bin", id),
            status,
            progress: None,
        }
    }

    /// Backend whose list-downloads responses are scripted; the last script
    /// entry repeats once the script runs out.
    struct ScriptedBackend {
        snapshots: Mutex<VecDeque<ClientResult<Vec<DownloadRecord>>>>,
        last: Mutex<ClientResult<Vec<DownloadRecord>>>,
        list_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(script: Vec<ClientResult<Vec<DownloadRecord>>>) -> Self {
            Self {
                snapshots: Mutex::new(script.into()),
                last: Mutex::new(Ok(Vec::new())),
                list_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn search(&self, _query: &str) -> ClientResult<Vec<crate::types::SearchResultEntry>> {
            Ok(Vec::new())
        }

        async fn start_download(&self, _unique_id: &str, _local_path: &str) -> ClientResult<()> {
            Ok(())
        }

        async fn list_downloads(&self) -> ClientResult<Vec<DownloadRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.snapshots.lock().unwrap().pop_front();
            match next {
                Some(result) => {
                    *self.last.lock().unwrap() = result.clone();
                    result
                }
                None => self.last.lock().unwrap().clone(),
            }
        }

        async fn remove_download(&self, _id: &str) -> ClientResult<()> {
            Ok(())
        }

        async fn share_file(&self, _local_path: &str) -> ClientResult<()> {
            Ok(())
        }

        async fn list_shares(&self) -> ClientResult<Vec<crate::types::ShareRecord>> {
            Ok(Vec::new())
        }

        async fn remove_share(&self, _unique_id: &str) -> ClientResult<()> {
            Ok(())
        }
    }

    fn tracker_over(backend: Arc<ScriptedBackend>) -> DownloadTracker<ScriptedBackend> {
        DownloadTracker::new(
            backend,
            Arc::new(RwLock::new(SessionView::new())),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_chain_stops_one_tick_after_terminal() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(vec![record("a", DownloadStatus::InProgress)]),
            Ok(vec![record("a", DownloadStatus::InProgress)]),
            Ok(vec![record("a", DownloadStatus::Done)]),
        ]));
        let tracker = tracker_over(Arc::clone(&backend));

        let records = tracker.refresh().await.unwrap();
        assert_eq!(records[0].status, DownloadStatus::InProgress);
        assert!(tracker.poll_armed());

        // Paused time auto-advances: the chain ticks until the all-terminal
        // snapshot, then stops scheduling.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!tracker.poll_armed());
        // explicit refresh + two ticks, nothing after the terminal snapshot
        assert_eq!(backend.calls(), 3);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_chain_armed_when_nothing_in_progress() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(vec![record(
            "a",
            DownloadStatus::Done,
        )])]));
        let tracker = tracker_over(Arc::clone(&backend));

        tracker.refresh().await.unwrap();
        assert!(!tracker.poll_armed());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_retries_instead_of_stopping() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(vec![record("a", DownloadStatus::InProgress)]),
            Err(ClientError::Network("gateway unreachable".into())),
            Ok(vec![record("a", DownloadStatus::Failed)]),
        ]));
        let tracker = tracker_over(Arc::clone(&backend));

        tracker.refresh().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!tracker.poll_armed());
        assert_eq!(backend.calls(), 3);
        let view = tracker.view.clone();
        assert_eq!(
            resilient_read(&view).download("a").unwrap().status,
            DownloadStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_rearms_a_stopped_chain() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(vec![record("a", DownloadStatus::Done)]),
            Ok(vec![
                record("a", DownloadStatus::Done),
                record("b", DownloadStatus::InProgress),
            ]),
            Ok(vec![
                record("a", DownloadStatus::Done),
                record("b", DownloadStatus::Done),
            ]),
        ]));
        let tracker = tracker_over(Arc::clone(&backend));

        tracker.refresh().await.unwrap();
        assert!(!tracker.poll_armed());

        // A new start elsewhere shows up in the next explicit refresh and
        // must re-arm the schedule even though the prior chain already quit.
        tracker.refresh().await.unwrap();
        assert!(tracker.poll_armed());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!tracker.poll_armed());
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_tears_down_chain() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(vec![record(
            "a",
            DownloadStatus::InProgress,
        )])]));
        let cancel = CancellationToken::new();
        let tracker = DownloadTracker::new(
            Arc::clone(&backend),
            Arc::new(RwLock::new(SessionView::new())),
            Duration::from_secs(1),
            cancel.clone(),
        );

        tracker.refresh().await.unwrap();
        assert!(tracker.poll_armed());

        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!tracker.poll_armed());
        // only the explicit refresh hit the backend
        assert_eq!(backend.calls(), 1);
    }
}
