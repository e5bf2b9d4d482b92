// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Command dispatcher: the user-facing API of the sync engine.
//!
//! One dispatcher owns one session view and the trackers over it; multiple
//! independent sessions are just multiple dispatchers. The ordering contract
//! that keeps the view honest is structural here: every mutating command is
//! awaited to completion before its refresh is issued, and the refresh is
//! awaited before the result is returned, so a caller can never observe a
//! snapshot that predates its own command.
//!
//! Mutation targets are always server-assigned ids taken from the last
//! applied snapshot. Display positions are useless as targets: the list can
//! be refreshed between render and click.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::downloads::DownloadTracker;
use crate::error::{ClientError, ClientResult};
use crate::locks::resilient_read;
use crate::search::SearchSession;
use crate::session::SessionView;
use crate::shares::ShareTracker;
use crate::transport::Backend;
use crate::types::{DownloadRecord, SearchResultEntry, ShareRecord};

pub struct CommandDispatcher<B: Backend + ?Sized> {
    view: Arc<RwLock<SessionView>>,
    downloads: DownloadTracker<B>,
    shares: ShareTracker<B>,
    search: SearchSession<B>,
    cancel: CancellationToken,
}

impl<B: Backend + ?Sized + 'static> CommandDispatcher<B> {
    /// Wire up a session over the given backend.
    pub fn new(backend: Arc<B>, poll_interval: Duration) -> Self {
        let view = Arc::new(RwLock::new(SessionView::new()));
        let cancel = CancellationToken::new();

        Self {
            downloads: DownloadTracker::new(
                Arc::clone(&backend),
                Arc::clone(&view),
                poll_interval,
                cancel.clone(),
            ),
            shares: ShareTracker::new(Arc::clone(&backend), Arc::clone(&view)),
            search: SearchSession::new(backend, Arc::clone(&view)),
            view,
            cancel,
        }
    }

    /// Populate the session view from server snapshots. Called once at
    /// session start; also arms the download poll chain if anything is
    /// already running server-side.
    ///
    /// A business error from the share listing (e.g. nothing shared yet) is
    /// recoverable and leaves the mirror empty; transport failures propagate.
    pub async fn init(&self) -> ClientResult<()> {
        match self.shares.refresh().await {
            Ok(_) => {}
            Err(ClientError::Business(msg)) => {
                tracing::warn!(%msg, "share listing unavailable at session start");
            }
            Err(err) => return Err(err),
        }
        self.downloads.refresh().await?;
        Ok(())
    }

    /// Run one catalog query, replacing the previous result set.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<SearchResultEntry>> {
        self.search.search(query).await
    }

    /// Start downloading a search hit to `local_path`. Returns the refreshed
    /// snapshot in which the new record appears.
    pub async fn start_download(
        &self,
        unique_id: &str,
        local_path: &str,
    ) -> ClientResult<Vec<DownloadRecord>> {
        self.downloads.start(unique_id, local_path).await
    }

    /// Stop and remove a download by its server-assigned id.
    pub async fn stop_download(&self, id: &str) -> ClientResult<Vec<DownloadRecord>> {
        self.downloads.stop(id).await
    }

    /// Re-fetch the downloads snapshot on demand.
    pub async fn refresh_downloads(&self) -> ClientResult<Vec<DownloadRecord>> {
        self.downloads.refresh().await
    }

    /// Publish a local file as a share.
    pub async fn publish_share(&self, local_path: &str) -> ClientResult<Vec<ShareRecord>> {
        self.shares.publish(local_path).await
    }

    /// Retract a share by its unique id.
    pub async fn unpublish_share(&self, unique_id: &str) -> ClientResult<Vec<ShareRecord>> {
        self.shares.unpublish(unique_id).await
    }

    /// Re-fetch the share snapshot on demand.
    pub async fn refresh_shares(&self) -> ClientResult<Vec<ShareRecord>> {
        self.shares.refresh().await
    }

    /// Current downloads as of the last applied snapshot.
    pub fn downloads(&self) -> Vec<DownloadRecord> {
        resilient_read(&self.view).downloads()
    }

    /// Current shares as of the last applied snapshot.
    pub fn shares(&self) -> Vec<ShareRecord> {
        resilient_read(&self.view).shares()
    }

    /// Results of the most recent query.
    pub fn last_search_results(&self) -> Vec<SearchResultEntry> {
        resilient_read(&self.view).last_search_results()
    }

    /// True while the download poll chain is scheduled.
    pub fn downloads_polling(&self) -> bool {
        self.downloads.poll_armed()
    }

    /// Tear the session down deterministically: the poll chain observes the
    /// token and exits instead of waiting for eventual quiescence.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
