//! Resource Store
//!
//! Holds the enriched resource collection and the last backend error, and
//! sequences backend calls with the normalizer.
//!
//! # Loading flags
//!
//! [`ResourceStore::submit_policy`] marks the target resource as loading
//! before the write and never clears that flag itself, whatever the outcome.
//! Only a [`ResourceStore::refresh`] clears it, because a refresh rebuilds the
//! whole collection. Callers are expected to refresh after submitting a policy
//! to observe the committed values and to drop the loading state.

use crate::api::BackendClient;
use crate::resource::{normalize_resources, EnrichedResource, PolicyUpdate, RawResource};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Backend path the collection is fetched from
pub const RESOURCES_PATH: &str = "resources";

/// Backend path policy changes are written to
pub const POLICIES_PATH: &str = "policies";

#[derive(Default)]
struct StoreState {
    resources: Vec<EnrichedResource>,
    error: Option<Arc<anyhow::Error>>,
}

/// Consistent read of the whole store
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub resources: Vec<EnrichedResource>,
    pub error: Option<Arc<anyhow::Error>>,
}

/// View-model state for the resource dashboard.
///
/// Cloning yields another handle to the same state, so several operations
/// can be in flight at once. There is no mutual exclusion between them:
/// whichever completes last decides `error` and `resources`.
pub struct ResourceStore<C> {
    client: Arc<C>,
    state: Arc<RwLock<StoreState>>,
}

impl<C> Clone for ResourceStore<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: BackendClient> ResourceStore<C> {
    /// Empty store: no resources, no error
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    // No code path panics while holding the lock, so a poisoned lock still
    // holds consistent state.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    pub fn resources(&self) -> Vec<EnrichedResource> {
        self.read().resources.clone()
    }

    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.read().error.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            resources: state.resources.clone(),
            error: state.error.clone(),
        }
    }

    /// True if any record with this identifier is loading
    pub fn is_loading(&self, identifier: &str) -> bool {
        self.read()
            .resources
            .iter()
            .any(|r| r.identifier() == identifier && r.loading)
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Normalize `raw` and replace the collection wholesale.
    ///
    /// New records never carry a loading flag.
    pub fn replace_resources(&self, raw: Vec<RawResource>) {
        let resources = normalize_resources(raw);
        tracing::info!("Replacing resource collection ({} records)", resources.len());
        self.write().resources = resources;
    }

    pub fn set_error(&self, error: Option<anyhow::Error>) {
        if let Some(ref err) = error {
            tracing::warn!("Backend call failed: {:#}", err);
        }
        self.write().error = error.map(Arc::new);
    }

    /// Mark every record with this identifier as loading.
    ///
    /// Identifiers are not assumed unique; returns how many records matched.
    pub fn mark_loading(&self, identifier: &str) -> usize {
        let mut state = self.write();
        let mut marked = 0;
        for resource in state.resources.iter_mut() {
            if resource.identifier() == identifier {
                resource.loading = true;
                marked += 1;
            }
        }
        tracing::debug!("Marked {} record(s) loading for {}", marked, identifier);
        marked
    }

    // =========================================================================
    // Orchestration
    // =========================================================================

    /// Fetch the collection from the backend.
    ///
    /// Failures end up in [`ResourceStore::error`]; the collection is left
    /// untouched in that case.
    pub async fn refresh(&self) {
        self.set_error(None);

        match self.client.get_resources(RESOURCES_PATH).await {
            Ok(raw) => self.replace_resources(raw),
            Err(e) => self.set_error(Some(e)),
        }
    }

    /// Write a policy change for `update.identifier`.
    ///
    /// The response body is ignored and the loading flag stays set until the
    /// next refresh.
    pub async fn submit_policy(&self, update: PolicyUpdate) {
        self.set_error(None);
        self.mark_loading(&update.identifier);

        tracing::info!("Submitting policy for {}", update.identifier);
        match self.client.put(POLICIES_PATH, &update.to_value()).await {
            Ok(_) => self.set_error(None),
            Err(e) => self.set_error(Some(e)),
        }
    }
}
