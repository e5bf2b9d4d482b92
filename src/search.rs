// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Catalog search. Stateless per call: each query replaces the previous
//! result set wholesale, and results live only until the next query.

use std::sync::{Arc, RwLock};

use crate::error::ClientResult;
use crate::locks::resilient_write;
use crate::session::SessionView;
use crate::transport::Backend;
use crate::types::SearchResultEntry;

pub struct SearchSession<B: Backend + ?Sized> {
    backend: Arc<B>,
    view: Arc<RwLock<SessionView>>,
}

impl<B: Backend + ?Sized> Clone for SearchSession<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            view: Arc::clone(&self.view),
        }
    }
}

impl<B: Backend + ?Sized> SearchSession<B> {
    pub fn new(backend: Arc<B>, view: Arc<RwLock<SessionView>>) -> Self {
        Self { backend, view }
    }

    /// Run one query against the catalog. No matches yields an empty vector,
    /// not an error. An empty query is answered locally with an empty set;
    /// the wire route has no representation for it.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<SearchResultEntry>> {
        if query.is_empty() {
            resilient_write(&self.view).set_search_results(Vec::new());
            return Ok(Vec::new());
        }

        let results = self.backend.search(query).await?;
        tracing::debug!(query, hits = results.len(), "search completed");
        resilient_write(&self.view).set_search_results(results.clone());
        Ok(results)
    }
}
