/// Records exchanged with the Data Access Port.
/// These mirror the backing store's tables; the dashboard's display model lives in `dossier`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type Id = String;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Concept,
    Pilot,
    Demo,
    CommercialPilot,
    Commercial,
}

impl Stage {
    pub const ALL: [Stage; 5] = [Stage::Concept, Stage::Pilot, Stage::Demo, Stage::CommercialPilot, Stage::Commercial];

    pub fn parse(value: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Concept         => "concept",
            Stage::Pilot           => "pilot",
            Stage::Demo            => "demo",
            Stage::CommercialPilot => "commercial_pilot",
            Stage::Commercial      => "commercial",
        }
    }

    /// Human label used by the dossier view.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Concept         => "Concept",
            Stage::Pilot           => "Pilot",
            Stage::Demo            => "Demo",
            Stage::CommercialPilot => "Commercial pilot",
            Stage::Commercial      => "Commercial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Pilot,
    Demo,
    Commercial,
    Research,
}

impl ProjectType {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::Pilot      => "Pilot",
            ProjectType::Demo       => "Demo",
            ProjectType::Commercial => "Commercial",
            ProjectType::Research   => "Research",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Offtake,
    Storage,
    Technology,
    Investment,
    Collaboration,
}

impl RelationType {
    pub fn label(&self) -> &'static str {
        match self {
            RelationType::Offtake       => "Offtake",
            RelationType::Storage       => "Storage",
            RelationType::Technology    => "Technology",
            RelationType::Investment    => "Investment",
            RelationType::Collaboration => "Collaboration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    High,
    Medium,
    Low,
    Unknown,
}

impl Trust {
    /// Default trust score shown next to a claim.
    pub fn score(&self) -> u8 {
        match self {
            Trust::High    => 85,
            Trust::Medium  => 65,
            Trust::Low     => 45,
            Trust::Unknown => 55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rag {
    Green,
    Amber,
    Red,
}

impl Rag {
    pub fn label(&self) -> &'static str {
        match self {
            Rag::Green => "Green",
            Rag::Amber => "Amber",
            Rag::Red   => "Red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgKind {
    TechnologyVendor,
    Buyer,
    StoragePartner,
    ResearchPartner,
    Major,
    Startup,
    Lab,
    Mrv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    News,
    Publication,
    Patent,
    Report,
    Other,
}

impl EvidenceKind {
    pub fn label(&self) -> &'static str {
        match self {
            EvidenceKind::News        => "News",
            EvidenceKind::Publication => "Publication",
            EvidenceKind::Patent      => "Patent",
            EvidenceKind::Report      => "Report",
            EvidenceKind::Other       => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    News,
    Publication,
    Patent,
    Blog,
}

// ---------------------------------------------------------------------------
// Organisation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRound {
    pub id: Id,
    pub org_id: Id,
    pub announced_on: NaiveDate,
    pub round: String,
    pub amount_usd: f64,
    #[serde(default)]
    pub investors: Vec<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Id,
    pub org_id: Id,
    pub occurred_on: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Id,
    pub org_id: Id,
    pub src: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Org {
    pub id: Id,
    pub slug: String,
    pub name: String,
    pub org_kind: OrgKind,
    pub stage: Stage,
    pub approach: String,
    pub description: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub founded_year: Option<i32>,
    pub total_funding_usd: Option<f64>,
    pub freshness_days: Option<u32>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub funding_rounds: Vec<FundingRound>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub overview_images: Vec<MediaAsset>,
}

// ---------------------------------------------------------------------------
// Sub-resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub org_id: Id,
    pub name: String,
    pub project_type: ProjectType,
    pub stage: Stage,
    pub status: String,
    pub location: Option<String>,
    pub capacity_t_co2_per_year: Option<f64>,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub partners: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Id,
    pub claim_id: Id,
    pub kind: EvidenceKind,
    pub title: String,
    pub url: Option<String>,
    pub published_on: Option<NaiveDate>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: Id,
    pub org_id: Id,
    pub statement: String,
    pub metric: String,
    pub unit: String,
    pub min: Option<f64>,
    pub ml: Option<f64>,
    pub max: Option<f64>,
    pub trust: Trust,
    pub rag: Rag,
    pub asserted_on: NaiveDate,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
    pub relation_type: RelationType,
    pub description: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub confidence: Option<Trust>,
}

impl Relation {
    /// The other end of the relation, seen from `org_id`.
    pub fn counterpart(&self, org_id: &str) -> &str {
        if self.source_id == org_id { &self.target_id } else { &self.source_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Id,
    pub org_id: Id,
    pub kind: DocumentKind,
    pub title: String,
    pub url: String,
    pub published_on: NaiveDate,
    pub summary: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Id,
    pub entity_id: Id,
    pub rag: Rag,
    pub message: String,
    pub updated_on: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    Relation,
    Claim,
    DossierText,
}

impl DraftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftKind::Relation    => "relation",
            DraftKind::Claim       => "claim",
            DraftKind::DossierText => "dossier_text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Proposed,
    Approved,
}

/// A proposed change awaiting curator approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Id,
    pub kind: DraftKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub state: DraftState,
}

impl Draft {
    pub fn new(kind: DraftKind, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            kind,
            payload,
            created_at: Utc::now(),
            state: DraftState::Proposed,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.state == DraftState::Proposed
    }

    /// `proposed -> approved`. One-way; returns false if already approved.
    pub fn approve(&mut self) -> bool {
        if self.state == DraftState::Approved {
            return false;
        }
        self.state = DraftState::Approved;
        true
    }
}

/// A source reference attached to an answer or a draft payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub url: String,
}

impl Citation {
    pub fn label(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_approval_is_one_way() {
        let mut draft = Draft::new(DraftKind::Claim, serde_json::json!({ "orgId": "climeworks" }));
        assert!(draft.is_outstanding());
        assert!(draft.approve());
        assert!(!draft.approve());
        assert_eq!(draft.state, DraftState::Approved);
    }

    #[test]
    fn test_draft_kind_wire_names() {
        assert_eq!(DraftKind::DossierText.as_str(), "dossier_text");
        let json = serde_json::to_string(&DraftKind::DossierText).unwrap();
        assert_eq!(json, "\"dossier_text\"");
    }

    #[test]
    fn test_relation_counterpart() {
        let rel = Relation {
            id: "r1".into(),
            source_id: "climeworks".into(),
            target_id: "carbfix".into(),
            relation_type: RelationType::Storage,
            description: None,
            since: None,
            until: None,
            confidence: None,
        };
        assert_eq!(rel.counterpart("climeworks"), "carbfix");
        assert_eq!(rel.counterpart("carbfix"), "climeworks");
    }

    #[test]
    fn test_citation_label_falls_back_to_url() {
        let c = Citation { title: Some(String::new()), url: "https://example.org".into() };
        assert_eq!(c.label(), "https://example.org");
    }
}
