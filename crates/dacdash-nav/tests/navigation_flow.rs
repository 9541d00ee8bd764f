//! End-to-end navigation: fragment, route, collection and selection together.
//!
//! ```bash
//! cargo test --package dacdash-nav --test navigation_flow
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use dacdash_common::entities::{Claim, Document, Org, Project, Relation, Signal};
use dacdash_common::{Draft, DraftKind, Result};
use dacdash_data::seed::demo_orgs;
use dacdash_data::{
    AskAnswer, AskContext, DataPort, DraftReceipt, MemoryDataPort, RelationQuery, SearchFilters,
};
use dacdash_nav::codec::{decode, encode};
use dacdash_nav::{
    AddressBar, DashboardSession, EntityStore, LoadOutcome, MemoryAddressBar, Mode, NavExtras, NavOutcome,
    Route, View,
};

fn orgs(ids: &[&str]) -> Vec<Org> {
    demo_orgs().into_iter().filter(|o| ids.contains(&o.id.as_str())).collect()
}

// ---------------------------------------------------------------------------
// Gated port: the first organisation listing blocks until released
// ---------------------------------------------------------------------------

struct GatedPort {
    inner: MemoryDataPort,
    entered: Mutex<Option<oneshot::Sender<()>>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedPort {
    fn new(inner: MemoryDataPort) -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let port = Self {
            inner,
            entered: Mutex::new(Some(entered_tx)),
            gate: Mutex::new(Some(release_rx)),
        };
        (port, entered_rx, release_tx)
    }
}

#[async_trait]
impl DataPort for GatedPort {
    async fn search_entities(&self, query: Option<&str>, filters: Option<&SearchFilters>) -> Result<Vec<Org>> {
        // Read before parking so the gated call sees the data as it was at start
        let result = self.inner.search_entities(query, filters).await;
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                let _ = entered.send(());
            }
            let _ = gate.await;
        }
        result
    }

    async fn get_entity_by_slug(&self, slug: &str) -> Result<Option<Org>> {
        self.inner.get_entity_by_slug(slug).await
    }

    async fn get_projects(&self, org_id: &str) -> Result<Vec<Project>> {
        self.inner.get_projects(org_id).await
    }

    async fn get_claims(&self, org_id: &str) -> Result<Vec<Claim>> {
        self.inner.get_claims(org_id).await
    }

    async fn get_relations(&self, entity_id: &str, query: Option<&RelationQuery>) -> Result<Vec<Relation>> {
        self.inner.get_relations(entity_id, query).await
    }

    async fn get_documents(&self, org_id: &str) -> Result<Vec<Document>> {
        self.inner.get_documents(org_id).await
    }

    async fn get_signals(&self) -> Result<Vec<Signal>> {
        self.inner.get_signals().await
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>> {
        self.inner.list_drafts().await
    }

    async fn propose_write(&self, kind: DraftKind, payload: serde_json::Value) -> Result<DraftReceipt> {
        self.inner.propose_write(kind, payload).await
    }

    async fn approve_write(&self, draft_id: &str) -> Result<()> {
        self.inner.approve_write(draft_id).await
    }

    async fn ask_ai(&self, question: &str, context: Option<&AskContext>) -> Result<AskAnswer> {
        self.inner.ask_ai(question, context).await
    }
}

// ---------------------------------------------------------------------------
// Codec properties
// ---------------------------------------------------------------------------

#[test]
fn test_decode_encode_is_identity_on_recognised_fields() {
    let routes = [
        Route::new(View::Home),
        Route::new(View::Company).with_entity("climeworks"),
        Route::new(View::Finder).with_query("q", "solid sorbent").with_mode(Mode::Curator),
        Route::new(View::Brief).with_entity("heirloom").with_mode(Mode::Curator),
    ];
    for route in routes {
        assert_eq!(decode(&encode(&route)), route);
    }
}

#[test]
fn test_bogus_and_empty_fragments() {
    assert_eq!(decode("#bogus-view").view, View::Home);
    assert_eq!(decode(""), decode("#"));
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_no_redundant_address_bar_writes() {
    let port = Arc::new(MemoryDataPort::seeded());
    let (bar, mut rx) = MemoryAddressBar::new("#company?org=climeworks");
    let session = DashboardSession::new(port.clone(), bar.clone(), "");
    session.load(port.as_ref()).await;

    let mut routes = session.controller().subscribe();
    routes.borrow_and_update();

    let outcome = session.navigate(View::Company, Some("climeworks"), NavExtras::new());
    assert_eq!(outcome, NavOutcome::Refreshed);
    assert_eq!(bar.revision(), 0);
    assert_eq!(session.drain(&mut rx), 0);
    // The forced refresh still reaches listeners
    assert!(routes.has_changed().unwrap());
}

#[tokio::test]
async fn test_unknown_entity_falls_back_to_first() {
    let port = Arc::new(MemoryDataPort::new(dacdash_data::Tables {
        orgs: orgs(&["climeworks", "heirloom"]),
        ..Default::default()
    }));
    let (bar, _rx) = MemoryAddressBar::new("#company?org=unknown-id");
    let session = DashboardSession::new(port.clone(), bar.clone(), "");
    session.load(port.as_ref()).await;

    let view = session.view();
    assert_eq!(view.selected.unwrap().id, "climeworks");
    // The fragment is left as the user wrote it
    assert_eq!(bar.fragment().as_deref(), Some("#company?org=unknown-id"));
    assert_eq!(view.route.entity_id.as_deref(), Some("unknown-id"));
}

#[tokio::test]
async fn test_empty_collection_renders_absent_state() {
    let port = Arc::new(MemoryDataPort::empty());
    let (bar, _rx) = MemoryAddressBar::new("#company?org=climeworks");
    let session = DashboardSession::new(port.clone(), bar, "");
    session.load(port.as_ref()).await;

    let view = session.view();
    assert!(view.selected.is_none());
    assert_eq!(view.entity_count, 0);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_latest_load_wins_when_older_finishes_last() {
    let (gated, entered, release) = GatedPort::new(MemoryDataPort::seeded());
    let port = Arc::new(gated);
    let store = Arc::new(EntityStore::new());

    let first = tokio::spawn({
        let port = port.clone();
        let store = store.clone();
        async move { store.load(port.as_ref()).await }
    });
    entered.await.unwrap();

    // The second load sees different data and completes first
    port.inner.replace_orgs(orgs(&["heirloom"])).await;
    assert_eq!(store.load(port.as_ref()).await, LoadOutcome::Applied);

    release.send(()).unwrap();
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);
    assert_eq!(store.snapshot().ids(), vec!["heirloom"]);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_teardown_drops_in_flight_load() {
    let (gated, entered, release) = GatedPort::new(MemoryDataPort::seeded());
    let port = Arc::new(gated);
    let store = Arc::new(EntityStore::new());

    let load = tokio::spawn({
        let port = port.clone();
        let store = store.clone();
        async move { store.load(port.as_ref()).await }
    });
    entered.await.unwrap();
    store.close();
    release.send(()).unwrap();

    assert_eq!(load.await.unwrap(), LoadOutcome::Cancelled);
    assert!(store.snapshot().dossiers.is_empty());
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_reload_falls_back_when_requested_and_previous_vanish() {
    let port = Arc::new(MemoryDataPort::seeded());
    let (bar, mut rx) = MemoryAddressBar::new("#finder");
    let session = DashboardSession::new(port.clone(), bar.clone(), "");
    session.load(port.as_ref()).await;
    session.select_company("heirloom");

    bar.user_edit("#finder?org=carbfix");
    session.drain(&mut rx);
    assert_eq!(session.selected_id().as_deref(), Some("carbfix"));

    port.replace_orgs(orgs(&["climeworks", "heirloom"])).await;
    session.load(port.as_ref()).await;
    // carbfix vanished and was also the previous pick, so the first entity wins
    assert_eq!(session.selected_id().as_deref(), Some("climeworks"));

    let change = session.sync();
    assert!(change.is_none(), "no re-resolution without new inputs");
}

#[tokio::test]
async fn test_mode_and_query_persist_across_navigation() {
    let port = Arc::new(MemoryDataPort::seeded());
    let (bar, mut rx) = MemoryAddressBar::new("#home");
    let session = DashboardSession::new(port.clone(), bar.clone(), "");
    session.load(port.as_ref()).await;

    session.set_mode(Mode::Curator);
    session.drain(&mut rx);
    session.search("sorbent");
    session.drain(&mut rx);
    session.select_company("climeworks");
    session.select_tab(View::Company);
    session.drain(&mut rx);

    assert_eq!(
        bar.fragment().as_deref(),
        Some("#company?org=climeworks&q=sorbent&mode=curator")
    );
}

#[tokio::test]
async fn test_listener_task_keeps_selection_in_step() {
    let port = Arc::new(MemoryDataPort::seeded());
    let (bar, rx) = MemoryAddressBar::new("#company?org=climeworks");
    let session = Arc::new(DashboardSession::new(port.clone(), bar.clone(), ""));
    session.load(port.as_ref()).await;
    assert_eq!(session.selected_id().as_deref(), Some("climeworks"));

    let mut routes = session.controller().subscribe();
    routes.borrow_and_update();
    let task = tokio::spawn(session.clone().listen(rx));

    bar.user_edit("#company?org=heirloom");
    routes.changed().await.unwrap();
    tokio::task::yield_now().await;
    assert_eq!(session.selected_id().as_deref(), Some("heirloom"));

    task.abort();
}
