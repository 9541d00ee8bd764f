//! Draft workflow: curator submissions become drafts, then optimistic patches.
//!
//! Ordering is persist-then-patch. A failed write leaves the collection exactly
//! as it was and puts the port's message on the open panel.

use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use dacdash_common::dossier::slugify;
use dacdash_common::{DashError, Dossier, Draft, DraftKind, Id, Result};
use dacdash_data::DataPort;

use crate::curator::{plan, CuratorForm, CuratorPanel, CuratorPanelState};
use crate::lock;
use crate::route::Mode;
use crate::store::EntityStore;

/// Submission from the "add organisation" form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgForm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub founded: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgPanelState {
    pub open: bool,
    pub saving: bool,
    pub error: Option<String>,
}

/// Id for a name with no usable slug characters: `org-<base36 millis>`.
fn fallback_org_id(millis: i64) -> Id {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = millis.unsigned_abs();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    format!("org-{}", String::from_utf8_lossy(&out))
}

fn text_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

pub struct DraftWorkflow {
    port: Arc<dyn DataPort>,
    store: Arc<EntityStore>,
    panel: Mutex<Option<CuratorPanelState>>,
    org_panel: Mutex<OrgPanelState>,
}

impl std::fmt::Debug for DraftWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftWorkflow")
            .field("panel", &*lock(&self.panel))
            .field("org_panel", &*lock(&self.org_panel))
            .finish()
    }
}

impl DraftWorkflow {
    pub fn new(port: Arc<dyn DataPort>, store: Arc<EntityStore>) -> Self {
        Self {
            port,
            store,
            panel: Mutex::new(None),
            org_panel: Mutex::new(OrgPanelState::default()),
        }
    }

    // ── Panel lifecycle ───────────────────────────────────────────────────

    pub fn panel(&self) -> Option<CuratorPanelState> {
        lock(&self.panel).clone()
    }

    /// Open an edit panel. Ignored outside curator mode.
    pub fn open_panel(&self, panel: CuratorPanel, mode: Mode) -> bool {
        if !mode.is_curator() {
            debug!(panel = panel.kind(), "Curator panel requested in read mode; ignored");
            return false;
        }
        debug!(panel = panel.kind(), org_id = %panel.org_id(), "Curator panel opened");
        *lock(&self.panel) = Some(CuratorPanelState::new(panel));
        true
    }

    pub fn dismiss(&self) {
        lock(&self.panel).take();
    }

    pub fn on_mode_changed(&self, mode: Mode) {
        if !mode.is_curator() {
            self.dismiss();
            *lock(&self.org_panel) = OrgPanelState::default();
        }
    }

    /// Panels never survive a switch to a different entity.
    pub fn on_entity_changed(&self, selected: Option<&str>) {
        let mut panel = lock(&self.panel);
        if panel.as_ref().is_some_and(|p| Some(p.panel.org_id()) != selected) {
            debug!(selected = ?selected, "Selected entity changed; closing curator panel");
            *panel = None;
        }
    }

    fn fail_panel(&self, panel: &CuratorPanel, err: &DashError) {
        let mut guard = lock(&self.panel);
        if let Some(state) = guard.as_mut().filter(|s| &s.panel == panel) {
            state.saving = false;
            state.error = Some(err.message());
        }
    }

    /// Submit the open panel's form.
    ///
    /// Returns the id of the recorded draft.
    pub async fn submit(&self, raw: Value) -> Result<Id> {
        let panel = {
            let mut guard = lock(&self.panel);
            let state = guard
                .as_mut()
                .ok_or_else(|| DashError::Validation("No curator panel is open".into()))?;
            if state.saving {
                return Err(DashError::Busy(state.panel.title().to_string()));
            }
            state.saving = true;
            state.error = None;
            state.panel.clone()
        };

        let edit = CuratorForm::parse(&panel, raw).and_then(|form| plan(&panel, form));
        let edit = match edit {
            Ok(edit) => edit,
            Err(e) => {
                self.fail_panel(&panel, &e);
                return Err(e);
            }
        };

        let target_ok = match self.store.get(&edit.org_id) {
            Some(dossier) => edit.patch.check(&dossier),
            None => Err(DashError::NotFound(format!("organisation {}", edit.org_id))),
        };
        if let Err(e) = target_ok {
            self.fail_panel(&panel, &e);
            return Err(e);
        }

        let receipt = match self.port.propose_write(edit.draft_kind, edit.payload).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(panel = panel.kind(), org_id = %edit.org_id, error = %e, "Draft submission failed");
                self.fail_panel(&panel, &e);
                return Err(e);
            }
        };

        let patch = edit.patch.with_draft_id(&receipt.draft_id);
        if let Err(e) = self.store.patch(&edit.org_id, |dossier| patch.apply(dossier)) {
            // Recorded but the entity moved on (e.g. a reload dropped it)
            warn!(draft_id = %receipt.draft_id, error = %e, "Optimistic patch skipped");
        }

        {
            let mut guard = lock(&self.panel);
            if guard.as_ref().is_some_and(|s| s.panel == panel) {
                *guard = None;
            }
        }

        info!(
            target: "dacdash::telemetry",
            event = "curator_submit",
            panel = panel.kind(),
            org_id = %edit.org_id,
            draft_id = %receipt.draft_id
        );
        Ok(receipt.draft_id)
    }

    // ── Add organisation ─────────────────────────────────────────────────

    pub fn org_panel(&self) -> OrgPanelState {
        lock(&self.org_panel).clone()
    }

    pub fn open_org_panel(&self, mode: Mode) -> bool {
        if !mode.is_curator() {
            return false;
        }
        *lock(&self.org_panel) = OrgPanelState { open: true, ..Default::default() };
        true
    }

    pub fn dismiss_org_panel(&self) {
        *lock(&self.org_panel) = OrgPanelState::default();
    }

    fn fail_org(&self, err: DashError) -> DashError {
        let mut state = lock(&self.org_panel);
        state.saving = false;
        state.error = Some(err.message());
        err
    }

    /// Record an `add_org` draft and append an empty dossier for it.
    pub async fn add_organization(&self, form: OrgForm) -> Result<Id> {
        {
            let mut state = lock(&self.org_panel);
            if state.saving {
                return Err(DashError::Busy("Add organisation".into()));
            }
            state.saving = true;
            state.error = None;
        }

        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(self.fail_org(DashError::Validation("Name is required".into())));
        }

        let explicit = form.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
        // An explicit slug is taken as typed, only lowercased
        let id = match explicit {
            Some(slug) => slug.to_lowercase(),
            None => slugify(&name).unwrap_or_else(|| fallback_org_id(Utc::now().timestamp_millis())),
        };
        if self.store.snapshot().contains(&id) {
            return Err(self.fail_org(DashError::Validation("Organization already exists".into())));
        }

        let mut record = serde_json::to_value(&form)?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".into(), json!(id));
        }
        let payload = json!({ "action": "add_org", "payload": record });

        let receipt = match self.port.propose_write(DraftKind::DossierText, payload).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(org_id = %id, error = %e, "Add organisation failed");
                return Err(self.fail_org(e));
            }
        };

        let mut dossier = Dossier::blank(id.clone(), name, form.founded.unwrap_or_else(|| Utc::now().year()));
        dossier.website = text_or(&form.website, "#");
        dossier.country = text_or(&form.country, "");
        dossier.approach = text_or(&form.approach, "");
        dossier.stage = text_or(&form.stage, "Not set");
        dossier.description = text_or(&form.description, "");
        if let Err(e) = self.store.insert(dossier) {
            return Err(self.fail_org(e));
        }

        *lock(&self.org_panel) = OrgPanelState::default();
        info!(
            target: "dacdash::telemetry",
            event = "add_org",
            org_id = %id,
            draft_id = %receipt.draft_id
        );
        Ok(id)
    }

    // ── Review ───────────────────────────────────────────────────────────

    /// Fresh fetch of drafts still awaiting approval. Never cached.
    pub async fn list_outstanding(&self) -> Result<Vec<Draft>> {
        let drafts = self.port.list_drafts().await?;
        Ok(drafts.into_iter().filter(Draft::is_outstanding).collect())
    }

    /// `proposed -> approved`. The collection is not reconciled here.
    pub async fn approve(&self, draft_id: &str) -> Result<()> {
        info!(target: "dacdash::telemetry", event = "approve_write", draft_id = %draft_id);
        self.port.approve_write(draft_id).await.map_err(|e| {
            warn!(draft_id = %draft_id, error = %e, "Approval failed");
            e
        })
    }

    pub fn port(&self) -> &Arc<dyn DataPort> {
        &self.port
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dacdash_data::MemoryDataPort;

    async fn setup() -> (Arc<MemoryDataPort>, Arc<EntityStore>, DraftWorkflow) {
        let port = Arc::new(MemoryDataPort::seeded());
        let store = Arc::new(EntityStore::new());
        store.load(port.as_ref()).await;
        let workflow = DraftWorkflow::new(port.clone(), store.clone());
        (port, store, workflow)
    }

    #[tokio::test]
    async fn test_panel_only_opens_in_curator_mode() {
        let (_port, _store, wf) = setup().await;
        let panel = CuratorPanel::Project { org_id: "climeworks".into() };
        assert!(!wf.open_panel(panel.clone(), Mode::Read));
        assert!(wf.panel().is_none());
        assert!(wf.open_panel(panel, Mode::Curator));
        wf.on_mode_changed(Mode::Read);
        assert!(wf.panel().is_none());
    }

    #[tokio::test]
    async fn test_submit_without_panel() {
        let (_port, _store, wf) = setup().await;
        let err = wf.submit(json!({ "name": "x" })).await.unwrap_err();
        assert!(matches!(err, DashError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_appends_collaboration() {
        let (port, store, wf) = setup().await;
        wf.open_panel(CuratorPanel::Collab { org_id: "heirloom".into() }, Mode::Curator);
        wf.submit(json!({ "with": "Microsoft", "kind": "Offtake" })).await.unwrap();

        let heirloom = store.get("heirloom").unwrap();
        assert_eq!(heirloom.collaborations.last().unwrap().with, "Microsoft");
        let drafts = port.list_drafts().await.unwrap();
        assert_eq!(drafts[0].kind, DraftKind::Relation);
        assert!(wf.panel().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_panel_open_with_error() {
        let (port, store, wf) = setup().await;
        let before = store.snapshot();
        port.fail_writes(Some("Storage unavailable".into())).await;

        wf.open_panel(CuratorPanel::Image { org_id: "climeworks".into() }, Mode::Curator);
        let err = wf.submit(json!({ "src": "/img/orca.jpg" })).await.unwrap_err();
        assert_eq!(err.message(), "Storage unavailable");

        let panel = wf.panel().unwrap();
        assert!(!panel.saving);
        assert_eq!(panel.error.as_deref(), Some("Storage unavailable"));
        assert_eq!(*store.snapshot(), *before);

        // Retry after the store recovers
        port.fail_writes(None).await;
        wf.submit(json!({ "src": "/img/orca.jpg" })).await.unwrap();
        assert_eq!(store.get("climeworks").unwrap().overview_images.len(), 1);
    }

    #[tokio::test]
    async fn test_evidence_for_unknown_claim_is_not_persisted() {
        let (port, _store, wf) = setup().await;
        wf.open_panel(
            CuratorPanel::Evidence { org_id: "climeworks".into(), claim_id: "nope".into() },
            Mode::Curator,
        );
        let err = wf
            .submit(json!({ "type": "News", "title": "t", "url": "https://example.org" }))
            .await
            .unwrap_err();
        assert!(matches!(err, DashError::NotFound(_)));
        assert_eq!(port.draft_count().await, 0);
    }

    #[tokio::test]
    async fn test_evidence_appends_to_claim() {
        let (_port, store, wf) = setup().await;
        wf.open_panel(
            CuratorPanel::Evidence { org_id: "climeworks".into(), claim_id: "clm-cw-energy".into() },
            Mode::Curator,
        );
        wf.submit(json!({ "type": "News", "title": "Audit", "url": "https://example.org/audit" }))
            .await
            .unwrap();
        let dossier = store.get("climeworks").unwrap();
        assert_eq!(dossier.claim("clm-cw-energy").unwrap().evidence.len(), 2);
    }

    #[tokio::test]
    async fn test_entity_change_closes_panel() {
        let (_port, _store, wf) = setup().await;
        wf.open_panel(CuratorPanel::Claim { org_id: "climeworks".into() }, Mode::Curator);
        wf.on_entity_changed(Some("climeworks"));
        assert!(wf.panel().is_some());
        wf.on_entity_changed(Some("heirloom"));
        assert!(wf.panel().is_none());
    }

    #[tokio::test]
    async fn test_add_organization() {
        let (port, store, wf) = setup().await;
        let id = wf
            .add_organization(OrgForm { name: "Holocene Climate".into(), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(id, "holocene-climate");
        let dossier = store.get(&id).unwrap();
        assert_eq!(dossier.website, "#");
        assert_eq!(dossier.stage, "Not set");
        assert_eq!(port.draft_count().await, 1);

        let err = wf
            .add_organization(OrgForm { name: "Holocene".into(), slug: Some("holocene-climate".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Organization already exists");
        assert_eq!(wf.org_panel().error.as_deref(), Some("Organization already exists"));
    }

    #[tokio::test]
    async fn test_add_organization_requires_name() {
        let (_port, _store, wf) = setup().await;
        let err = wf.add_organization(OrgForm::default()).await.unwrap_err();
        assert_eq!(err.message(), "Name is required");
    }

    #[test]
    fn test_fallback_org_id_is_base36_millis() {
        assert_eq!(fallback_org_id(0), "org-0");
        assert_eq!(fallback_org_id(35), "org-z");
        assert_eq!(fallback_org_id(1_700_000_000_000), "org-loyw3v28");
    }

    #[tokio::test]
    async fn test_add_organization_without_slug_characters() {
        let (_port, store, wf) = setup().await;
        let id = wf
            .add_organization(OrgForm { name: "碳捕集".into(), ..Default::default() })
            .await
            .unwrap();
        assert!(id.starts_with("org-"), "unexpected id {id}");
        assert_eq!(store.get(&id).unwrap().name, "碳捕集");
    }

    #[tokio::test]
    async fn test_add_organization_keeps_explicit_slug() {
        let (_port, store, wf) = setup().await;
        let id = wf
            .add_organization(OrgForm { name: "Acme".into(), slug: Some(" Acme_Co ".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(id, "acme_co");
        assert!(store.get("acme_co").is_some());
    }

    #[tokio::test]
    async fn test_approve_removes_from_outstanding() {
        let (port, _store, wf) = setup().await;
        let receipt = port.propose_write(DraftKind::Claim, json!({})).await.unwrap();
        assert_eq!(wf.list_outstanding().await.unwrap().len(), 1);
        wf.approve(&receipt.draft_id).await.unwrap();
        assert!(wf.list_outstanding().await.unwrap().is_empty());
    }
}
