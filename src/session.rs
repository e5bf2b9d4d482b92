// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! The session view: the client's authoritative-as-of-last-refresh picture of
//! downloads, shares, and search results.
//!
//! Snapshots replace prior state wholesale; nothing is merged. Every refresh
//! claims a sequence number before its network call, and [`SessionView`]
//! refuses to apply a snapshot whose sequence number is not newer than the
//! last applied one. That single rule is the concurrency guard: when a user
//! command and a poll tick race, the last refresh to *complete* wins, and a
//! slow in-flight response can never roll the view back.

use indexmap::IndexMap;

use crate::types::{DownloadRecord, DownloadStatus, SearchResultEntry, ShareRecord};

/// Per-session client state. One instance per logical session, owned by the
/// dispatcher and shared with the trackers behind a lock.
#[derive(Debug, Default)]
pub struct SessionView {
    downloads: IndexMap<String, DownloadRecord>,
    shares: IndexMap<String, ShareRecord>,
    last_search_results: Vec<SearchResultEntry>,
    /// Sequence number of the last applied downloads snapshot
    downloads_seq: u64,
    /// Sequence number of the last applied shares snapshot
    shares_seq: u64,
}

impl SessionView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the download mapping with a fresh server snapshot.
    ///
    /// Returns false (and leaves the view untouched) when `seq` is not newer
    /// than the last applied snapshot: the response raced a newer refresh and
    /// arrived late.
    ///
    /// A record that was previously observed terminal must not come back as
    /// in-progress; when a snapshot claims it did, the record is kept with a
    /// defensive `Failed` status and the violation is logged.
    pub fn apply_downloads_snapshot(
        &mut self,
        seq: u64,
        records: Vec<DownloadRecord>,
    ) -> bool {
        if seq <= self.downloads_seq {
            tracing::debug!(
                seq,
                applied = self.downloads_seq,
                "discarding stale downloads snapshot"
            );
            return false;
        }

        let mut next: IndexMap<String, DownloadRecord> = IndexMap::with_capacity(records.len());
        for mut record in records {
            if let Some(prev) = self.downloads.get(&record.id) {
                if prev.status.is_terminal() && record.status.is_in_progress() {
                    tracing::warn!(
                        id = %record.id,
                        was = prev.status.as_str(),
                        "download reverted from a terminal state; marking failed"
                    );
                    record.status = DownloadStatus::Failed;
                }
            }
            next.insert(record.id.clone(), record);
        }

        self.downloads = next;
        self.downloads_seq = seq;
        true
    }

    /// Replace the share mapping with a fresh server snapshot. Same staleness
    /// rule as downloads.
    pub fn apply_shares_snapshot(&mut self, seq: u64, records: Vec<ShareRecord>) -> bool {
        if seq <= self.shares_seq {
            tracing::debug!(
                seq,
                applied = self.shares_seq,
                "discarding stale shares snapshot"
            );
            return false;
        }

        self.shares = records
            .into_iter()
            .map(|r| (r.unique_id.clone(), r))
            .collect();
        self.shares_seq = seq;
        true
    }

    /// Replace the search results. Results are per-query, so there is no
    /// sequence guard: whichever query the user ran last wins.
    pub fn set_search_results(&mut self, results: Vec<SearchResultEntry>) {
        self.last_search_results = results;
    }

    /// Current downloads in server snapshot order.
    pub fn downloads(&self) -> Vec<DownloadRecord> {
        self.downloads.values().cloned().collect()
    }

    pub fn download(&self, id: &str) -> Option<DownloadRecord> {
        self.downloads.get(id).cloned()
    }

    /// Current shares in server snapshot order.
    pub fn shares(&self) -> Vec<ShareRecord> {
        self.shares.values().cloned().collect()
    }

    pub fn last_search_results(&self) -> Vec<SearchResultEntry> {
        self.last_search_results.clone()
    }

    /// True while any tracked download is still running. This is the poll
    /// tracker's continuation condition.
    pub fn any_download_in_progress(&self) -> bool {
        self.downloads.values().any(|r| r.status.is_in_progress())
    }
}
