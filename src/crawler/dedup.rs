//! Deduplication gate against the persistent article store

use crate::config::{DedupKeyKind, QueryFailurePolicy};
use crate::storage::{ArticleStore, DedupKey, StoreError};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Result of asking the gate about one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Not in the store, go ahead
    Proceed,

    /// Already ingested by an earlier wave
    Skip,

    /// The existence query failed and policy forbids guessing
    Abort(String),
}

/// Checks article keys against the store before work is spent on them
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn ArticleStore>,
    key_kind: DedupKeyKind,
    policy: QueryFailurePolicy,
}

impl DedupGate {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        key_kind: DedupKeyKind,
        policy: QueryFailurePolicy,
    ) -> Self {
        Self {
            store,
            key_kind,
            policy,
        }
    }

    pub fn key_kind(&self) -> DedupKeyKind {
        self.key_kind
    }

    /// True when links are the dedup key, so the gate runs at discovery time
    pub fn checks_links(&self) -> bool {
        self.key_kind == DedupKeyKind::Link
    }

    /// Raw existence query
    ///
    /// The store call is synchronous. On a multi-threaded runtime the worker
    /// hands its other tasks off while it blocks.
    pub fn already_ingested(&self, key: &DedupKey) -> Result<bool, StoreError> {
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| self.store.exists(key))
            }
            _ => self.store.exists(key),
        }
    }

    /// Existence query with the query-failure policy applied
    pub fn check(&self, key: &DedupKey) -> GateDecision {
        match self.already_ingested(key) {
            Ok(true) => GateDecision::Skip,
            Ok(false) => GateDecision::Proceed,
            Err(e) => match self.policy {
                QueryFailurePolicy::TreatAsNew => {
                    tracing::warn!(key = %key.describe(), "Existence query failed, treating as new: {}", e);
                    GateDecision::Proceed
                }
                QueryFailurePolicy::Abort => GateDecision::Abort(e.to_string()),
            },
        }
    }
}
