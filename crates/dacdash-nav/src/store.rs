//! Entity store: owner of the loaded dossier collection.
//!
//! Loads are single-flight by ticket. Only the most recently issued load may
//! publish its result; anything older, or anything finishing after `close`,
//! is dropped silently. Curator patches bump `revision` but not `generation`,
//! so they never trigger re-resolution of the selected entity.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use dacdash_common::{DashError, Dossier, Result};
use dacdash_data::{hydrate, DataPort};

use crate::{read, write};

/// Immutable view of the collection at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Bumped by every applied load.
    pub generation: u64,
    /// Bumped by every applied load or local mutation.
    pub revision: u64,
    pub dossiers: Vec<Dossier>,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Dossier> {
        self.dossiers.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.dossiers.iter().map(|d| d.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued after this one.
    Superseded,
    /// The store was closed while the load was in flight.
    Cancelled,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Arc<Snapshot>,
    issued: u64,
    loading: bool,
    closed: bool,
    error: Option<String>,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    state: RwLock<StoreState>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts with the given collection, as if loaded once.
    pub fn with_dossiers(dossiers: Vec<Dossier>) -> Self {
        let store = Self::new();
        let ticket = store.begin_load();
        store.finish_load(ticket, Ok(dossiers));
        store
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        read(&self.state).snapshot.clone()
    }

    pub fn get(&self, id: &str) -> Option<Dossier> {
        read(&self.state).snapshot.get(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        read(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    // ── Loads ─────────────────────────────────────────────────────────────

    /// After `close` the returned ticket is already stale and nothing changes.
    pub fn begin_load(&self) -> LoadTicket {
        let mut state = write(&self.state);
        if state.closed {
            debug!("Load requested after close; ignored");
            return LoadTicket(state.issued);
        }
        state.issued += 1;
        state.loading = true;
        debug!(ticket = state.issued, "Collection load started");
        LoadTicket(state.issued)
    }

    pub fn finish_load(&self, ticket: LoadTicket, result: Result<Vec<Dossier>>) -> LoadOutcome {
        let mut state = write(&self.state);
        if state.closed {
            debug!(ticket = ticket.0, "Load finished after close; dropped");
            return LoadOutcome::Cancelled;
        }
        if ticket.0 != state.issued {
            debug!(ticket = ticket.0, latest = state.issued, "Stale load result dropped");
            return LoadOutcome::Superseded;
        }

        state.loading = false;
        let generation = state.snapshot.generation + 1;
        let revision = state.snapshot.revision + 1;
        match result {
            Ok(dossiers) => {
                let dossiers = dedupe(dossiers);
                info!(ticket = ticket.0, generation, count = dossiers.len(), "Collection loaded");
                state.snapshot = Arc::new(Snapshot { generation, revision, dossiers });
                state.error = None;
            }
            Err(e) => {
                warn!(ticket = ticket.0, error = %e, "Collection load failed");
                state.snapshot = Arc::new(Snapshot { generation, revision, dossiers: Vec::new() });
                state.error = Some(e.message());
            }
        }
        LoadOutcome::Applied
    }

    /// Fetch and hydrate the whole collection through the port.
    pub async fn load(&self, port: &dyn DataPort) -> LoadOutcome {
        if self.is_closed() {
            return LoadOutcome::Cancelled;
        }
        let ticket = self.begin_load();
        let result = hydrate::load_dossiers(port).await;
        self.finish_load(ticket, result)
    }

    /// Teardown: in-flight loads can no longer publish.
    pub fn close(&self) {
        let mut state = write(&self.state);
        state.closed = true;
        state.loading = false;
    }

    pub fn is_closed(&self) -> bool {
        read(&self.state).closed
    }

    // ── Local mutations ───────────────────────────────────────────────────

    /// Apply `f` to the dossier with `org_id`.
    pub fn patch<F>(&self, org_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Dossier) -> Result<()>,
    {
        let mut state = write(&self.state);
        let mut next = (*state.snapshot).clone();
        let dossier = next
            .dossiers
            .iter_mut()
            .find(|d| d.id == org_id)
            .ok_or_else(|| DashError::NotFound(format!("organisation {org_id}")))?;
        f(dossier)?;
        next.revision += 1;
        state.snapshot = Arc::new(next);
        Ok(())
    }

    /// Append a new dossier. Identifiers stay unique.
    pub fn insert(&self, dossier: Dossier) -> Result<()> {
        let mut state = write(&self.state);
        if state.snapshot.contains(&dossier.id) {
            return Err(DashError::Validation("Organization already exists".to_string()));
        }
        let snapshot = Arc::make_mut(&mut state.snapshot);
        snapshot.dossiers.push(dossier);
        snapshot.revision += 1;
        Ok(())
    }
}

fn dedupe(dossiers: Vec<Dossier>) -> Vec<Dossier> {
    let mut out: Vec<Dossier> = Vec::with_capacity(dossiers.len());
    for dossier in dossiers {
        if out.iter().any(|d| d.id == dossier.id) {
            warn!(org_id = %dossier.id, "Duplicate identifier in collection; keeping the first");
            continue;
        }
        out.push(dossier);
    }
    out
}
