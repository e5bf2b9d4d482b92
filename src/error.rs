// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Error types for the sync engine.
//!
//! The transport and trackers report exactly three kinds of failure, and the
//! distinction matters to callers: a `Business` rejection carries a message
//! meant for the user and must not be treated as fatal, while a `Network`
//! failure aborts the in-flight action without touching tracked state.

use std::fmt;

/// Errors surfaced by transport calls and tracker operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Transport-level failure: server unreachable, timeout, bad HTTP status.
    /// Never retried automatically by a command; a poll tick retries on its
    /// next scheduled tick instead.
    Network(String),
    /// The server explicitly rejected the request (`success: false`). The
    /// message is the server's own wording and is shown to the user verbatim.
    Business(String),
    /// A response violated the protocol invariants (e.g. a download flagged
    /// both done and failed). Logged by the decoder; never fatal.
    Protocol(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Business(msg) => write!(f, "server rejected request: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// True for errors that represent a server-side rejection rather than a
    /// delivery failure.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }
}

/// Convenience alias used throughout the crate.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ClientError::Network(format!("cannot connect: {}", err))
        } else if err.is_timeout() {
            ClientError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ClientError::Protocol(format!("malformed response body: {}", err))
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
