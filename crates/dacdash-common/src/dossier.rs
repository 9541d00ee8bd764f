//! The dossier: one hydrated organisation as the dashboard displays it.
//!
//! A dossier joins an `Org` with its projects, claims, relations and documents.
//! It is the element type of the entity collection; curator edits patch it in place.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub name: String,
    pub kind: String,
    pub location: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub capacity: f64,
    pub partners: Vec<String>,
}

impl ProjectRow {
    /// A pilot counts as active unless it is still planned.
    pub fn is_active_pilot(&self) -> bool {
        self.kind.eq_ignore_ascii_case("pilot") && !self.status.eq_ignore_ascii_case("planned")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationRow {
    pub with: String,
    pub kind: String,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRow {
    pub date: NaiveDate,
    pub kind: String,
    pub attendees: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub kind: String,
    pub title: String,
    pub url: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRow {
    pub id: Id,
    pub text: String,
    pub metric_type: String,
    pub unit: String,
    pub min: f64,
    pub ml: f64,
    pub max: f64,
    pub trust: String,
    pub trust_score: u8,
    pub evidence: Vec<EvidenceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRow {
    pub date: NaiveDate,
    pub round: String,
    pub amount_usd: f64,
    pub investors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRow {
    pub date: NaiveDate,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRow {
    pub src: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub id: Id,
    pub slug: String,
    pub name: String,
    pub website: String,
    pub country: String,
    pub approach: String,
    pub stage: String,
    pub founded: i32,
    pub total_funding: f64,
    pub freshness_days: u32,
    pub description: String,
    pub aliases: Vec<String>,
    pub logo_url: Option<String>,
    pub collaborations: Vec<CollaborationRow>,
    pub funding_rounds: Vec<FundingRow>,
    pub projects: Vec<ProjectRow>,
    pub interactions: Vec<InteractionRow>,
    pub claims: Vec<ClaimRow>,
    pub publications: Vec<FeedRow>,
    pub patents: Vec<FeedRow>,
    pub news: Vec<FeedRow>,
    pub overview_images: Vec<ImageRow>,
}

impl Dossier {
    /// An empty dossier for a freshly added organisation.
    pub fn blank(id: impl Into<Id>, name: impl Into<String>, founded: i32) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            id,
            name: name.into(),
            website: "#".to_string(),
            country: String::new(),
            approach: String::new(),
            stage: "Not set".to_string(),
            founded,
            total_funding: 0.0,
            freshness_days: 0,
            description: String::new(),
            aliases: Vec::new(),
            logo_url: None,
            collaborations: Vec::new(),
            funding_rounds: Vec::new(),
            projects: Vec::new(),
            interactions: Vec::new(),
            claims: Vec::new(),
            publications: Vec::new(),
            patents: Vec::new(),
            news: Vec::new(),
            overview_images: Vec::new(),
        }
    }

    pub fn claim(&self, claim_id: &str) -> Option<&ClaimRow> {
        self.claims.iter().find(|c| c.id == claim_id)
    }

    pub fn claim_mut(&mut self, claim_id: &str) -> Option<&mut ClaimRow> {
        self.claims.iter_mut().find(|c| c.id == claim_id)
    }

    pub fn has_active_pilot(&self) -> bool {
        self.projects.iter().any(ProjectRow::is_active_pilot)
    }
}

lazy_static! {
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").expect("static regex");
}

/// Lowercase, collapse non-alphanumeric runs into `-`, trim dashes.
/// Returns None when nothing usable is left.
pub fn slugify(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let dashed = NON_SLUG.replace_all(&lowered, "-");
    let slug = dashed.trim_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
