// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Share tracker: a pull-only mirror of the files this client publishes.
//!
//! Shares change only through explicit user commands, so there is no poll
//! chain here: the mirror is refreshed at session start and after each
//! mutating command. A rejected publish or unpublish leaves the tracked set
//! untouched and hands the server's message back to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::ClientResult;
use crate::locks::resilient_write;
use crate::session::SessionView;
use crate::transport::Backend;
use crate::types::ShareRecord;

/// Tracks the session's published shares against server snapshots.
pub struct ShareTracker<B: Backend + ?Sized> {
    backend: Arc<B>,
    view: Arc<RwLock<SessionView>>,
    refresh_seq: Arc<AtomicU64>,
}

impl<B: Backend + ?Sized> Clone for ShareTracker<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            view: Arc::clone(&self.view),
            refresh_seq: Arc::clone(&self.refresh_seq),
        }
    }
}

impl<B: Backend + ?Sized> ShareTracker<B> {
    pub fn new(backend: Arc<B>, view: Arc<RwLock<SessionView>>) -> Self {
        Self {
            backend,
            view,
            refresh_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch the full share snapshot and replace the local mirror.
    pub async fn refresh(&self) -> ClientResult<Vec<ShareRecord>> {
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.backend.list_shares().await?;

        let mut view = resilient_write(&self.view);
        view.apply_shares_snapshot(seq, snapshot);
        Ok(view.shares())
    }

    /// Publish a local file. The server may reject the path; the rejection
    /// message propagates as a `Business` error and nothing local changes.
    pub async fn publish(&self, local_path: &str) -> ClientResult<Vec<ShareRecord>> {
        self.backend.share_file(local_path).await?;
        tracing::info!(local_path, "share published");
        self.refresh().await
    }

    /// Retract a share by its unique id.
    pub async fn unpublish(&self, unique_id: &str) -> ClientResult<Vec<ShareRecord>> {
        self.backend.remove_share(unique_id).await?;
        tracing::info!(unique_id, "share retracted");
        self.refresh().await
    }
}
