//! Dashboard session: the controllers wired together behind user intents.
//!
//! Route changes and collection loads feed the selection cache; selection and
//! mode changes close curator panels. Pages only read `view()` and call intents.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use dacdash_common::{Dossier, Draft, Id, Org, Result};
use dacdash_data::{AskAnswer, AskContext, DataPort};

use crate::ask::{AskSession, AskState};
use crate::codec;
use crate::controller::{AddressBar, ChangeOutcome, HashChange, NavExtras, NavOutcome, RouteController};
use crate::curator::{CuratorPanel, CuratorPanelState};
use crate::lock;
use crate::resolve::{SelectionCache, SelectionChange};
use crate::review::{DraftReview, ReviewState};
use crate::route::{Mode, Route, View, KEY_QUERY};
use crate::store::{EntityStore, LoadOutcome, Snapshot};
use crate::workflow::{DraftWorkflow, OrgForm, OrgPanelState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedEntity {
    pub id: Id,
    pub name: String,
}

/// Everything a renderer needs, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub route: Route,
    pub fragment: String,
    pub link: String,
    pub selected: Option<SelectedEntity>,
    pub entity_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub panel: Option<CuratorPanelState>,
    pub org_panel: OrgPanelState,
    pub review: ReviewState,
    pub ask: AskState,
}

#[derive(Debug)]
struct Tracked {
    selection: SelectionCache,
    mode: Mode,
}

#[derive(Debug)]
pub struct DashboardSession {
    controller: Arc<RouteController>,
    store: Arc<EntityStore>,
    workflow: Arc<DraftWorkflow>,
    review: DraftReview,
    ask: AskSession,
    tracked: Mutex<Tracked>,
    base_url: String,
}

impl DashboardSession {
    pub fn new(port: Arc<dyn DataPort>, bar: Arc<dyn AddressBar>, base_url: impl Into<String>) -> Self {
        let controller = Arc::new(RouteController::new(bar));
        let store = Arc::new(EntityStore::new());
        let workflow = Arc::new(DraftWorkflow::new(port.clone(), store.clone()));
        let mode = controller.route().mode;
        Self {
            review: DraftReview::new(workflow.clone()),
            ask: AskSession::new(port),
            controller,
            store,
            workflow,
            tracked: Mutex::new(Tracked { selection: SelectionCache::new(), mode }),
            base_url: base_url.into(),
        }
    }

    pub fn controller(&self) -> &Arc<RouteController> {
        &self.controller
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn route(&self) -> Route {
        self.controller.route()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    pub fn selected_id(&self) -> Option<Id> {
        lock(&self.tracked).selection.selected_id().map(Id::from)
    }

    pub fn selected(&self) -> Option<Dossier> {
        let snapshot = self.store.snapshot();
        lock(&self.tracked).selection.current(&snapshot).cloned()
    }

    // ── State propagation ─────────────────────────────────────────────────

    /// Re-resolve the selection if its inputs changed and apply side effects.
    pub fn sync(&self) -> Option<SelectionChange> {
        let route = self.controller.route();
        let snapshot = self.store.snapshot();

        let (change, mode_changed) = {
            let mut tracked = lock(&self.tracked);
            let change = tracked.selection.sync(&snapshot, route.entity_id.as_deref());
            let mode_changed = tracked.mode != route.mode;
            tracked.mode = route.mode;
            (change, mode_changed)
        };

        if mode_changed {
            debug!(mode = route.mode.as_str(), "Mode changed");
            self.workflow.on_mode_changed(route.mode);
        }
        if let Some(change) = change.as_ref().filter(|c| c.changed()) {
            self.workflow.on_entity_changed(change.selected.as_deref());
        }
        change
    }

    /// Forget the cached inputs so the next sync re-resolves unconditionally.
    fn resync(&self) -> Option<SelectionChange> {
        lock(&self.tracked).selection.invalidate();
        self.sync()
    }

    pub fn handle_fragment_change(&self) -> ChangeOutcome {
        let outcome = self.controller.handle_fragment_change();
        if outcome != ChangeOutcome::Ignored {
            self.sync();
        }
        outcome
    }

    /// Process every queued notification. Returns how many were handled.
    pub fn drain(&self, changes: &mut mpsc::UnboundedReceiver<HashChange>) -> usize {
        let mut handled = 0;
        while let Ok(change) = changes.try_recv() {
            debug!(revision = change.revision, "Draining fragment change");
            self.handle_fragment_change();
            handled += 1;
        }
        handled
    }

    /// Apply notifications as they arrive until the address bar goes away.
    pub async fn listen(self: Arc<Self>, mut changes: mpsc::UnboundedReceiver<HashChange>) {
        while let Some(change) = changes.recv().await {
            debug!(revision = change.revision, "Fragment change notification");
            self.handle_fragment_change();
        }
    }

    pub async fn load(&self, port: &dyn DataPort) -> LoadOutcome {
        let outcome = self.store.load(port).await;
        if outcome == LoadOutcome::Applied {
            self.sync();
        }
        outcome
    }

    pub fn close(&self) {
        self.store.close();
    }

    // ── Navigation intents ────────────────────────────────────────────────

    pub fn navigate(&self, view: View, entity_id: Option<&str>, extras: NavExtras) -> NavOutcome {
        let outcome = self.controller.navigate(view, entity_id, extras);
        if outcome == NavOutcome::Refreshed {
            self.resync();
        }
        outcome
    }

    /// Primary navigation. Only entity views keep the selected organisation.
    pub fn select_tab(&self, view: View) -> NavOutcome {
        let org = match view {
            View::Company | View::Map => self.selected_id(),
            _ => None,
        };
        info!(target: "dacdash::telemetry", event = "select_tab", view = %view);
        self.navigate(view, org.as_deref(), NavExtras::new())
    }

    /// Pick an organisation. Entity views re-point; elsewhere only the selection moves.
    pub fn select_company(&self, id: &str) -> Option<NavOutcome> {
        let route = self.controller.route();
        if route.view.carries_entity() {
            return Some(self.navigate(route.view, Some(id), NavExtras::new()));
        }
        let change = lock(&self.tracked).selection.select(id);
        if change.changed() {
            self.workflow.on_entity_changed(change.selected.as_deref());
        }
        None
    }

    pub fn open_brief(&self, id: &str) -> NavOutcome {
        info!(target: "dacdash::telemetry", event = "open_brief", org_id = %id);
        self.navigate(View::Brief, Some(id), NavExtras::new())
    }

    pub fn back_from_brief(&self) -> NavOutcome {
        let org = self.controller.route().entity_id.or_else(|| self.selected_id());
        self.navigate(View::Company, org.as_deref(), NavExtras::new())
    }

    /// Toggle read/curator, keeping the rest of the route.
    pub fn set_mode(&self, mode: Mode) -> NavOutcome {
        let route = self.controller.route();
        let extras = route
            .query
            .iter()
            .fold(NavExtras::new().mode(mode), |extras, (k, v)| extras.set(k.clone(), v.clone()));
        if !mode.is_curator() {
            self.workflow.on_mode_changed(mode);
        }
        self.navigate(route.view, route.entity_id.as_deref(), extras)
    }

    /// Free-text search from the header. Empty text clears the query.
    pub fn search(&self, text: &str) -> NavOutcome {
        let text = text.trim();
        info!(target: "dacdash::telemetry", event = "search", query = %text);
        self.navigate(View::Finder, None, NavExtras::new().set(KEY_QUERY, text))
    }

    /// Organisations matching the finder's search text and query filters.
    pub async fn finder_results(&self) -> Result<Vec<Org>> {
        let route = self.controller.route();
        let filters = route.search_filters();
        let orgs = self.workflow.port().search_entities(route.search_text(), Some(&filters)).await?;
        debug!(count = orgs.len(), "Finder results");
        Ok(orgs)
    }

    /// Shareable link carrying the current mode and search text.
    pub fn link_with_state(&self, view: View, org: Option<&str>) -> String {
        let target = self.controller.target(view, org, &NavExtras::new());
        codec::link(&self.base_url, &target)
    }

    // ── Curator intents ───────────────────────────────────────────────────

    pub fn open_panel(&self, panel: CuratorPanel) -> bool {
        self.workflow.open_panel(panel, self.controller.route().mode)
    }

    pub fn dismiss_panel(&self) {
        self.workflow.dismiss();
    }

    pub async fn submit(&self, raw: Value) -> Result<Id> {
        self.workflow.submit(raw).await
    }

    pub fn open_org_panel(&self) -> bool {
        self.workflow.open_org_panel(self.controller.route().mode)
    }

    /// Add an organisation, select it and open its profile in curator mode.
    pub async fn add_organization(&self, form: OrgForm) -> Result<Id> {
        let id = self.workflow.add_organization(form).await?;
        lock(&self.tracked).selection.select(id.clone());
        self.navigate(View::Company, Some(&id), NavExtras::new().mode(Mode::Curator));
        Ok(id)
    }

    // ── Drafts ────────────────────────────────────────────────────────────

    pub async fn open_drafts(&self) -> Result<Vec<Draft>> {
        self.review.open().await
    }

    pub fn close_drafts(&self) {
        self.review.close();
    }

    /// Approve, refresh the list, then re-resolve the selection.
    pub async fn approve(&self, draft_id: &str) -> Result<()> {
        self.review.approve(draft_id, self.controller.route().mode).await?;
        self.resync();
        Ok(())
    }

    pub fn reject(&self, draft_id: &str) -> Result<()> {
        self.review.reject(draft_id, self.controller.route().mode)
    }

    // ── Ask AI ────────────────────────────────────────────────────────────

    pub async fn ask(&self, question: &str) -> Result<AskAnswer> {
        let context = AskContext { entity_id: self.selected_id(), ..Default::default() };
        self.ask.ask(question, Some(context)).await
    }

    pub async fn propose_relation(&self, citation_index: usize) -> Result<Id> {
        let entity = self.selected_id();
        self.ask.propose_relation(citation_index, entity.as_deref()).await
    }

    // ── Read model ────────────────────────────────────────────────────────

    pub fn view(&self) -> SessionView {
        let route = self.controller.route();
        let snapshot = self.store.snapshot();
        let selected = lock(&self.tracked)
            .selection
            .current(&snapshot)
            .map(|d| SelectedEntity { id: d.id.clone(), name: d.name.clone() });
        SessionView {
            fragment: codec::encode(&route),
            link: codec::link(&self.base_url, &route),
            route,
            selected,
            entity_count: snapshot.dossiers.len(),
            loading: self.store.is_loading(),
            error: self.store.error(),
            panel: self.workflow.panel(),
            org_panel: self.workflow.org_panel(),
            review: self.review.state(),
            ask: self.ask.state(),
        }
    }
}
