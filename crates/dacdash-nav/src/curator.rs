//! Curator edits: panel variants, their forms, and the edit plan each one yields.
//!
//! Every panel variant maps to exactly one draft kind, one payload shape and one
//! local patch. `plan` is pure; the workflow decides when to persist and apply.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dacdash_common::dossier::{
    ClaimRow, CollaborationRow, Dossier, EvidenceRow, ImageRow, InteractionRow, ProjectRow,
};
use dacdash_common::{DashError, DraftKind, Id, Result};

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// Which inline edit form is open, and for which organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CuratorPanel {
    Project { org_id: Id },
    Collab { org_id: Id },
    Interaction { org_id: Id },
    Claim { org_id: Id },
    Evidence { org_id: Id, claim_id: Id },
    Image { org_id: Id },
}

impl CuratorPanel {
    pub fn org_id(&self) -> &str {
        match self {
            CuratorPanel::Project { org_id }
            | CuratorPanel::Collab { org_id }
            | CuratorPanel::Interaction { org_id }
            | CuratorPanel::Claim { org_id }
            | CuratorPanel::Evidence { org_id, .. }
            | CuratorPanel::Image { org_id } => org_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CuratorPanel::Project { .. }     => "project",
            CuratorPanel::Collab { .. }      => "collab",
            CuratorPanel::Interaction { .. } => "interaction",
            CuratorPanel::Claim { .. }       => "claim",
            CuratorPanel::Evidence { .. }    => "evidence",
            CuratorPanel::Image { .. }       => "image",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CuratorPanel::Project { .. }     => "Add project",
            CuratorPanel::Collab { .. }      => "Add collaboration",
            CuratorPanel::Interaction { .. } => "Add interaction",
            CuratorPanel::Claim { .. }       => "Add claim",
            CuratorPanel::Evidence { .. }    => "Add claim evidence",
            CuratorPanel::Image { .. }       => "Add overview image",
        }
    }

    /// Build a panel from its short name, e.g. `("evidence", "climeworks", Some(claim))`.
    pub fn from_parts(kind: &str, org_id: &str, claim_id: Option<&str>) -> Result<Self> {
        let org_id = org_id.to_string();
        Ok(match (kind, claim_id) {
            ("project", _)           => CuratorPanel::Project { org_id },
            ("collab", _)            => CuratorPanel::Collab { org_id },
            ("interaction", _)       => CuratorPanel::Interaction { org_id },
            ("claim", _)             => CuratorPanel::Claim { org_id },
            ("image", _)             => CuratorPanel::Image { org_id },
            ("evidence", Some(c))    => CuratorPanel::Evidence { org_id, claim_id: c.to_string() },
            ("evidence", None)       => return Err(DashError::Validation("Evidence needs a claim id".into())),
            (other, _)               => return Err(DashError::Unsupported(format!("curator action '{other}'"))),
        })
    }
}

/// An open panel plus its transient flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuratorPanelState {
    pub panel: CuratorPanel,
    pub saving: bool,
    pub error: Option<String>,
}

impl CuratorPanelState {
    pub fn new(panel: CuratorPanel) -> Self {
        Self { panel, saving: false, error: None }
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectForm {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabForm {
    pub with: String,
    pub kind: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionForm {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimForm {
    pub text: String,
    #[serde(default)]
    pub metric_type: String,
    #[serde(default)]
    pub unit: String,
    /// RAG label: Green, Amber or Red.
    pub trust: String,
    #[serde(default)]
    pub trust_score: Option<u8>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub ml: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceForm {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageForm {
    pub src: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Submitted form, typed by the panel it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum CuratorForm {
    Project(ProjectForm),
    Collab(CollabForm),
    Interaction(InteractionForm),
    Claim(ClaimForm),
    Evidence(EvidenceForm),
    Image(ImageForm),
}

impl CuratorForm {
    /// Decode a raw submission using the panel's variant to pick the shape.
    pub fn parse(panel: &CuratorPanel, raw: Value) -> Result<Self> {
        Ok(match panel {
            CuratorPanel::Project { .. }     => CuratorForm::Project(serde_json::from_value(raw)?),
            CuratorPanel::Collab { .. }      => CuratorForm::Collab(serde_json::from_value(raw)?),
            CuratorPanel::Interaction { .. } => CuratorForm::Interaction(serde_json::from_value(raw)?),
            CuratorPanel::Claim { .. }       => CuratorForm::Claim(serde_json::from_value(raw)?),
            CuratorPanel::Evidence { .. }    => CuratorForm::Evidence(serde_json::from_value(raw)?),
            CuratorPanel::Image { .. }       => CuratorForm::Image(serde_json::from_value(raw)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Local change applied to a dossier once its draft is recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    AppendProject(ProjectRow),
    AppendCollaboration(CollaborationRow),
    AppendInteraction(InteractionRow),
    AppendClaim(ClaimRow),
    AppendEvidence { claim_id: Id, row: EvidenceRow },
    AppendImage(ImageRow),
}

impl Patch {
    /// Whether the patch can land on `dossier` at all.
    pub fn check(&self, dossier: &Dossier) -> Result<()> {
        match self {
            Patch::AppendEvidence { claim_id, .. } if dossier.claim(claim_id).is_none() => {
                Err(DashError::NotFound(format!("claim {claim_id}")))
            }
            _ => Ok(()),
        }
    }

    /// Optimistic claims are keyed by the draft that recorded them.
    pub fn with_draft_id(self, draft_id: &str) -> Self {
        match self {
            Patch::AppendClaim(mut row) => {
                row.id = format!("claim-{draft_id}");
                Patch::AppendClaim(row)
            }
            other => other,
        }
    }

    pub fn apply(self, dossier: &mut Dossier) -> Result<()> {
        self.check(dossier)?;
        match self {
            Patch::AppendProject(row)       => dossier.projects.push(row),
            Patch::AppendCollaboration(row) => dossier.collaborations.push(row),
            Patch::AppendInteraction(row)   => dossier.interactions.push(row),
            Patch::AppendClaim(row)         => dossier.claims.push(row),
            Patch::AppendImage(row)         => dossier.overview_images.push(row),
            Patch::AppendEvidence { claim_id, row } => {
                if let Some(claim) = dossier.claim_mut(&claim_id) {
                    claim.evidence.push(row);
                }
            }
        }
        Ok(())
    }
}

/// Draft to record plus the patch to apply after it is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct EditPlan {
    pub org_id: Id,
    pub draft_kind: DraftKind,
    pub payload: Value,
    pub patch: Patch,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn required(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(DashError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// Site-relative path: `/x`, but not protocol-relative `//x`.
fn is_relative_path(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//")
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub fn is_safe_link(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && (is_relative_path(value) || is_http_url(value))
}

pub fn is_safe_image_src(value: &str) -> bool {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    if value.is_empty() || lower.starts_with("javascript:") {
        return false;
    }
    lower.starts_with("data:image/") || lower.starts_with("blob:") || is_safe_link(value)
}

fn opt_text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Validate a submission and derive its draft and patch.
pub fn plan(panel: &CuratorPanel, form: CuratorForm) -> Result<EditPlan> {
    let org_id = panel.org_id().to_string();

    let (draft_kind, payload, patch) = match (panel, form) {
        (CuratorPanel::Project { .. }, CuratorForm::Project(f)) => {
            required(&f.name, "Project name is required")?;
            let row = ProjectRow {
                name: f.name.trim().to_string(),
                kind: opt_text(&f.kind).unwrap_or_else(|| "Project".to_string()),
                location: opt_text(&f.location).unwrap_or_else(|| "-".to_string()),
                status: opt_text(&f.status).unwrap_or_else(|| "Planned".to_string()),
                start_date: f.start_date,
                capacity: f.capacity.unwrap_or(0.0),
                partners: f.partners.clone(),
            };
            let payload = json!({ "action": "project", "orgId": org_id, "payload": f });
            (DraftKind::DossierText, payload, Patch::AppendProject(row))
        }
        (CuratorPanel::Collab { .. }, CuratorForm::Collab(f)) => {
            required(&f.with, "Collaborator is required")?;
            let row = CollaborationRow {
                with: f.with.trim().to_string(),
                kind: f.kind.clone(),
                start_date: f.start_date,
            };
            let payload = json!({ "orgId": org_id, "payload": f });
            (DraftKind::Relation, payload, Patch::AppendCollaboration(row))
        }
        (CuratorPanel::Interaction { .. }, CuratorForm::Interaction(f)) => {
            required(&f.kind, "Interaction type is required")?;
            let row = InteractionRow {
                date: f.date,
                kind: f.kind.clone(),
                attendees: f.attendees.clone(),
                summary: f.summary.clone().unwrap_or_default(),
            };
            let payload = json!({ "action": "interaction", "orgId": org_id, "payload": f });
            (DraftKind::DossierText, payload, Patch::AppendInteraction(row))
        }
        (CuratorPanel::Claim { .. }, CuratorForm::Claim(f)) => {
            required(&f.text, "Claim text is required")?;
            let trust_score = f.trust_score.unwrap_or(60);
            if trust_score > 100 {
                return Err(DashError::Validation("Trust score must be between 0 and 100".into()));
            }
            let row = ClaimRow {
                id: String::new(),
                text: f.text.trim().to_string(),
                metric_type: f.metric_type.clone(),
                unit: f.unit.clone(),
                min: f.min.unwrap_or(0.0),
                ml: f.ml.unwrap_or(0.0),
                max: f.max.unwrap_or(0.0),
                trust: f.trust.clone(),
                trust_score,
                evidence: Vec::new(),
            };
            let payload = json!({ "orgId": org_id, "payload": f });
            (DraftKind::Claim, payload, Patch::AppendClaim(row))
        }
        (CuratorPanel::Evidence { claim_id, .. }, CuratorForm::Evidence(f)) => {
            required(&f.title, "Evidence title is required")?;
            required(&f.url, "URL is required.")?;
            if !is_safe_link(&f.url) {
                return Err(DashError::Validation(
                    "Use an https:// URL or a site-relative path (starting with /).".into(),
                ));
            }
            let row = EvidenceRow {
                kind: f.kind.clone(),
                title: f.title.trim().to_string(),
                url: Some(f.url.trim().to_string()),
                date: f.date,
            };
            let payload = json!({
                "action": "evidence",
                "orgId": org_id,
                "claimId": claim_id,
                "payload": f,
            });
            let patch = Patch::AppendEvidence { claim_id: claim_id.clone(), row };
            (DraftKind::DossierText, payload, patch)
        }
        (CuratorPanel::Image { .. }, CuratorForm::Image(f)) => {
            if !is_safe_image_src(&f.src) {
                return Err(DashError::Validation("Image source must be an https:// URL, a relative path or a data URI".into()));
            }
            let row = ImageRow { src: f.src.trim().to_string(), caption: opt_text(&f.caption) };
            let payload = json!({ "action": "image", "orgId": org_id, "payload": f });
            (DraftKind::DossierText, payload, Patch::AppendImage(row))
        }
        (panel, _) => {
            return Err(DashError::Unsupported(format!("form does not match the {} panel", panel.kind())));
        }
    };

    Ok(EditPlan { org_id, draft_kind, payload, patch })
}
