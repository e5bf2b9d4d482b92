// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Canonical record types tracked by the sync engine.
//!
//! These are the client's view of server-side entities. The server is the
//! source of truth for every field: records are only ever constructed from
//! server snapshots, never guessed client-side.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Status of a tracked download.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Transfer still running server-side
    InProgress,
    /// Successfully completed
    Done,
    /// Failed server-side
    Failed,
}

impl DownloadStatus {
    /// Returns true once the download can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Done | DownloadStatus::Failed)
    }

    /// Returns true while the download is still running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DownloadStatus::InProgress)
    }

    /// Decode the wire `done`/`failed` flag pair.
    ///
    /// Both flags set is a protocol violation: the two states are mutually
    /// exclusive by contract. Callers log the violation and fall back to
    /// `Failed` rather than dropping the record.
    pub fn from_flags(done: bool, failed: bool) -> Result<Self, ClientError> {
        match (done, failed) {
            (false, false) => Ok(DownloadStatus::InProgress),
            (true, false) => Ok(DownloadStatus::Done),
            (false, true) => Ok(DownloadStatus::Failed),
            (true, true) => Err(ClientError::Protocol(
                "download reported both done and failed".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// The client's view of one server-side download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadRecord {
    /// Server-assigned identifier, stable for the download's lifetime. The
    /// only valid target for a stop/remove command.
    pub id: String,
    /// Display name of the file being downloaded
    pub name: String,
    /// Destination path on the requesting machine
    pub local_path: String,
    /// Current status as reported by the last applied snapshot
    pub status: DownloadStatus,
    /// Server-reported progress string (e.g. "42%"), informational only
    pub progress: Option<String>,
}

/// A file currently published by this client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareRecord {
    /// Identifier assigned when the share was published
    pub unique_id: String,
    /// Path of the shared file
    pub local_path: String,
}

/// One hit from a catalog search. Ephemeral: replaced wholesale by the next
/// query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResultEntry {
    /// Identifier of the discoverable remote file, the key used to request a
    /// download
    pub unique_id: String,
    /// Human-readable description shown to the user
    pub description: String,
}
