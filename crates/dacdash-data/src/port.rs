//! The Data Access Port: every capability the dashboard core consumes.
//!
//! The core never implements these; it only calls them and converts failures
//! into plain `error` strings at the boundary of the controller that issued the call.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use dacdash_common::entities::{
    Citation, Claim, Document, Draft, DraftKind, Id, Org, Project, Relation, RelationType, Signal, Stage,
};
use dacdash_common::Result;

/// Structured finder filters. Empty lists mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub approaches: Vec<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub has_active_pilot: bool,
    pub max_funding_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationQuery {
    pub since: Option<NaiveDate>,
    pub types: Vec<RelationType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskContext {
    pub entity_id: Option<Id>,
    #[serde(default)]
    pub filters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub include_web: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftReceipt {
    pub draft_id: Id,
}

/// Capability surface of the backing store.
#[async_trait]
pub trait DataPort: Send + Sync {
    /// Organisations matching free text and filters; `None` for both lists everything.
    async fn search_entities(
        &self,
        query: Option<&str>,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<Org>>;

    async fn get_entity_by_slug(&self, slug: &str) -> Result<Option<Org>>;

    async fn get_projects(&self, org_id: &str) -> Result<Vec<Project>>;

    async fn get_claims(&self, org_id: &str) -> Result<Vec<Claim>>;

    async fn get_relations(
        &self,
        entity_id: &str,
        query: Option<&RelationQuery>,
    ) -> Result<Vec<Relation>>;

    async fn get_documents(&self, org_id: &str) -> Result<Vec<Document>>;

    async fn get_signals(&self) -> Result<Vec<Signal>>;

    /// All drafts known to the store, in creation order.
    async fn list_drafts(&self) -> Result<Vec<Draft>>;

    /// Record a draft; nothing is applied to the domain model.
    async fn propose_write(&self, kind: DraftKind, payload: serde_json::Value) -> Result<DraftReceipt>;

    /// Transition a draft `proposed -> approved`.
    async fn approve_write(&self, draft_id: &str) -> Result<()>;

    async fn ask_ai(&self, question: &str, context: Option<&AskContext>) -> Result<AskAnswer>;
}
