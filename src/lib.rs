// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! peersync - client-side sync engine for a p2p file-sharing service
//!
//! Reconciles a locally displayed view of long-running server-side operations
//! (downloads, shares) against authoritative server snapshots over a polling
//! protocol, without duplicate actions, command/poll races, or stale state.
//!
//! # Core Modules
//!
//! - [`dispatcher`] - User-facing command API and session ownership
//! - [`downloads`] - Download tracking and the self-terminating poll chain
//! - [`shares`] - Pull-only mirror of published shares
//! - [`search`] - Per-query catalog search
//! - [`session`] - Sequence-guarded session view
//! - [`transport`] - Backend trait seam and the HTTP gateway client
//! - [`types`] - Record types and wire-flag decoding
//! - [`config`] - Gateway URL, poll interval, and timeout settings
//! - [`error`] - The three error kinds the engine reports

pub mod config;
pub mod dispatcher;
pub mod downloads;
pub mod error;
pub mod locks;
pub mod search;
pub mod session;
pub mod shares;
pub mod transport;
pub mod types;

// Re-export the types a typical embedder needs
pub use config::ClientConfig;
pub use dispatcher::CommandDispatcher;
pub use downloads::{DownloadTracker, DEFAULT_POLL_INTERVAL};
pub use error::{ClientError, ClientResult};
pub use search::SearchSession;
pub use session::SessionView;
pub use shares::ShareTracker;
pub use transport::{Backend, HttpTransport};
pub use types::{DownloadRecord, DownloadStatus, SearchResultEntry, ShareRecord};
