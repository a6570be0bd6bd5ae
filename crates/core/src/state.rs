//! Persisted dedup state for already-notified deployments.
//!
//! [`StateStore`] owns the single `processed-deployments` record exclusively;
//! no other component reads or writes it. Every mutation is a whole-record
//! read-then-write against the underlying [`BlobStore`], so concurrent
//! writers race with last-writer-wins semantics (the store offers no
//! conditional write).

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::errors::StoreError;
use crate::models::{DeploymentKind, ProcessedDeployments};
use crate::store::BlobStore;

/// Fixed key under which the single state record is persisted.
const STATE_KEY: &str = "processed-deployments";

/// Maximum number of deployment ids retained per namespace.
const MAX_DEPLOYMENTS: usize = 1000;

/// Ids newly discovered by [`StateStore::diff_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeployments {
    pub new_workers: Vec<String>,
    pub new_pages: Vec<String>,
}

/// Typed access layer over the persisted dedup record.
pub struct StateStore {
    store: Arc<dyn BlobStore>,
}

impl StateStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Return the stored record, or a fresh empty record (current timestamp)
    /// when none exists. A missing key is never an error.
    pub fn get_processed(&self) -> Result<ProcessedDeployments, StoreError> {
        match self.store.get(STATE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::CorruptRecord(e.to_string())),
            None => Ok(ProcessedDeployments {
                workers: Vec::new(),
                pages: Vec::new(),
                last_check: Utc::now().to_rfc3339(),
            }),
        }
    }

    /// Merge the given ids into their namespaces (set union, first-occurrence
    /// order preserved), truncate each namespace to the most recent
    /// [`MAX_DEPLOYMENTS`] entries, and persist with an updated `lastCheck`.
    ///
    /// This is a single read-then-write cycle; see the module docs for the
    /// accepted lost-update race.
    pub fn mark_processed(
        &self,
        worker_ids: &[String],
        page_ids: &[String],
    ) -> Result<(), StoreError> {
        let current = self.get_processed()?;

        let workers = merge_and_truncate(current.workers, worker_ids);
        let pages = merge_and_truncate(current.pages, page_ids);

        let updated = ProcessedDeployments {
            workers,
            pages,
            last_check: Utc::now().to_rfc3339(),
        };

        let encoded = serde_json::to_string(&updated)?;
        self.store.put(STATE_KEY, &encoded)?;

        debug!(
            workers = updated.workers.len(),
            pages = updated.pages.len(),
            "persisted processed deployments"
        );
        Ok(())
    }

    /// True iff `id` is present in the `kind` namespace of the stored record.
    pub fn is_processed(&self, id: &str, kind: DeploymentKind) -> Result<bool, StoreError> {
        let state = self.get_processed()?;
        let namespace = match kind {
            DeploymentKind::Worker => &state.workers,
            DeploymentKind::Page => &state.pages,
        };
        Ok(namespace.iter().any(|stored| stored == id))
    }

    /// Set-difference of the candidate ids against stored state, preserving
    /// input order.
    pub fn diff_new(
        &self,
        candidate_workers: &[String],
        candidate_pages: &[String],
    ) -> Result<NewDeployments, StoreError> {
        let state = self.get_processed()?;

        let new_workers = candidate_workers
            .iter()
            .filter(|id| !state.workers.contains(id))
            .cloned()
            .collect();
        let new_pages = candidate_pages
            .iter()
            .filter(|id| !state.pages.contains(id))
            .cloned()
            .collect();

        Ok(NewDeployments {
            new_workers,
            new_pages,
        })
    }

    /// Delete the persisted record entirely; the next read returns the empty
    /// state.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(STATE_KEY)
    }
}

/// Append `new_ids` to `existing` with set-union semantics (first occurrence
/// wins), then keep only the most recent [`MAX_DEPLOYMENTS`] entries by
/// dropping from the front.
fn merge_and_truncate(existing: Vec<String>, new_ids: &[String]) -> Vec<String> {
    let mut merged = existing;
    for id in new_ids {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }

    if merged.len() > MAX_DEPLOYMENTS {
        merged.drain(..merged.len() - MAX_DEPLOYMENTS);
    }
    merged
}
