//! Process-local implementation of the Data Access Port.
//!
//! Backs the headless shell and the test suites. Nothing survives a restart.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use dacdash_common::entities::{
    Citation, Claim, Document, Draft, DraftKind, Org, Project, Relation, Signal,
};
use dacdash_common::{DashError, Result};

use crate::port::{AskAnswer, AskContext, DataPort, DraftReceipt, RelationQuery, SearchFilters};

/// The tables held by the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub orgs: Vec<Org>,
    pub projects: Vec<Project>,
    pub claims: Vec<Claim>,
    pub relations: Vec<Relation>,
    pub documents: Vec<Document>,
    pub signals: Vec<Signal>,
    pub drafts: Vec<Draft>,
}

const MAX_ANSWER_CITATIONS: usize = 5;

pub struct MemoryDataPort {
    tables: RwLock<Tables>,
    latency: Duration,
    /// When set, every write fails with this message.
    write_failure: RwLock<Option<String>>,
}

impl std::fmt::Debug for MemoryDataPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDataPort")
            .field("latency", &self.latency)
            .field("tables", &"<in-memory tables>")
            .finish()
    }
}

impl MemoryDataPort {
    pub fn new(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            latency: Duration::ZERO,
            write_failure: RwLock::new(None),
        }
    }

    pub fn empty() -> Self {
        Self::new(Tables::default())
    }

    /// Store pre-filled with the demo organisations.
    pub fn seeded() -> Self {
        Self::new(crate::seed::demo_tables())
    }

    /// Delay every call, to make load races observable from the shell.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make subsequent writes fail (`Some`) or succeed again (`None`).
    pub async fn fail_writes(&self, message: Option<String>) {
        *self.write_failure.write().await = message;
    }

    /// Replace the organisation table, e.g. to simulate another actor editing the store.
    pub async fn replace_orgs(&self, orgs: Vec<Org>) {
        self.tables.write().await.orgs = orgs;
    }

    pub async fn draft_count(&self) -> usize {
        self.tables.read().await.drafts.len()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn check_writable(&self) -> Result<()> {
        match self.write_failure.read().await.as_ref() {
            Some(message) => Err(DashError::port(message.clone())),
            None => Ok(()),
        }
    }
}

fn matches_text(org: &Org, needle: &str) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        org.name,
        org.approach,
        org.country.as_deref().unwrap_or(""),
        org.description.as_deref().unwrap_or(""),
    )
    .to_lowercase();
    haystack.contains(needle)
}

fn matches_filters(org: &Org, projects: &[Project], filters: &SearchFilters) -> bool {
    if !filters.approaches.is_empty() && !filters.approaches.iter().any(|a| a == &org.approach) {
        return false;
    }
    if !filters.stages.is_empty() && !filters.stages.contains(&org.stage) {
        return false;
    }
    if filters.has_active_pilot {
        let active = projects.iter().any(|p| {
            p.org_id == org.id
                && p.project_type == dacdash_common::entities::ProjectType::Pilot
                && !p.status.eq_ignore_ascii_case("planned")
        });
        if !active {
            return false;
        }
    }
    if let Some(max) = filters.max_funding_usd {
        if org.total_funding_usd.unwrap_or(0.0) > max {
            return false;
        }
    }
    true
}

#[async_trait]
impl DataPort for MemoryDataPort {
    async fn search_entities(
        &self,
        query: Option<&str>,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<Org>> {
        self.pause().await;
        let tables = self.tables.read().await;
        let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();

        let orgs: Vec<Org> = tables
            .orgs
            .iter()
            .filter(|org| needle.is_empty() || matches_text(org, &needle))
            .filter(|org| filters.map_or(true, |f| matches_filters(org, &tables.projects, f)))
            .cloned()
            .collect();

        debug!(query = ?query, matched = orgs.len(), "search_entities");
        Ok(orgs)
    }

    async fn get_entity_by_slug(&self, slug: &str) -> Result<Option<Org>> {
        self.pause().await;
        let tables = self.tables.read().await;
        Ok(tables.orgs.iter().find(|o| o.slug == slug).cloned())
    }

    async fn get_projects(&self, org_id: &str) -> Result<Vec<Project>> {
        self.pause().await;
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().filter(|p| p.org_id == org_id).cloned().collect())
    }

    async fn get_claims(&self, org_id: &str) -> Result<Vec<Claim>> {
        self.pause().await;
        let tables = self.tables.read().await;
        Ok(tables.claims.iter().filter(|c| c.org_id == org_id).cloned().collect())
    }

    async fn get_relations(
        &self,
        entity_id: &str,
        query: Option<&RelationQuery>,
    ) -> Result<Vec<Relation>> {
        self.pause().await;
        let tables = self.tables.read().await;
        let relations = tables
            .relations
            .iter()
            .filter(|r| r.source_id == entity_id || r.target_id == entity_id)
            .filter(|r| match query {
                None => true,
                Some(q) => {
                    let type_ok = q.types.is_empty() || q.types.contains(&r.relation_type);
                    let since_ok = match (q.since, r.since) {
                        (Some(cutoff), Some(since)) => since >= cutoff,
                        (Some(_), None) => false,
                        (None, _) => true,
                    };
                    type_ok && since_ok
                }
            })
            .cloned()
            .collect();
        Ok(relations)
    }

    async fn get_documents(&self, org_id: &str) -> Result<Vec<Document>> {
        self.pause().await;
        let tables = self.tables.read().await;
        Ok(tables.documents.iter().filter(|d| d.org_id == org_id).cloned().collect())
    }

    async fn get_signals(&self) -> Result<Vec<Signal>> {
        self.pause().await;
        Ok(self.tables.read().await.signals.clone())
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>> {
        self.pause().await;
        Ok(self.tables.read().await.drafts.clone())
    }

    async fn propose_write(&self, kind: DraftKind, payload: serde_json::Value) -> Result<DraftReceipt> {
        self.pause().await;
        self.check_writable().await?;

        let draft = Draft::new(kind, payload);
        let draft_id = draft.id.clone();
        self.tables.write().await.drafts.push(draft);

        info!(draft_id = %draft_id, kind = kind.as_str(), "Draft proposed");
        Ok(DraftReceipt { draft_id })
    }

    async fn approve_write(&self, draft_id: &str) -> Result<()> {
        self.pause().await;
        self.check_writable().await?;

        let mut tables = self.tables.write().await;
        let draft = tables
            .drafts
            .iter_mut()
            .find(|d| d.id == draft_id)
            .ok_or_else(|| DashError::NotFound(format!("draft {draft_id}")))?;

        if draft.approve() {
            info!(draft_id = %draft_id, "Draft approved");
        } else {
            debug!(draft_id = %draft_id, "Draft already approved");
        }
        Ok(())
    }

    async fn ask_ai(&self, question: &str, context: Option<&AskContext>) -> Result<AskAnswer> {
        self.pause().await;
        let tables = self.tables.read().await;
        let lowered = question.to_lowercase();

        let focus = context.and_then(|c| c.entity_id.as_deref());
        let relevant: Vec<&Org> = tables
            .orgs
            .iter()
            .filter(|org| {
                Some(org.id.as_str()) == focus
                    || lowered.contains(&org.name.to_lowercase())
                    || org.aliases.iter().any(|a| lowered.contains(&a.to_lowercase()))
            })
            .collect();

        if relevant.is_empty() {
            return Ok(AskAnswer {
                answer: "No tracked organisations match that question.".to_string(),
                citations: Vec::new(),
            });
        }

        let names: Vec<&str> = relevant.iter().map(|o| o.name.as_str()).collect();
        let claim_count = tables
            .claims
            .iter()
            .filter(|c| relevant.iter().any(|o| o.id == c.org_id))
            .count();
        let citations: Vec<Citation> = tables
            .documents
            .iter()
            .filter(|d| relevant.iter().any(|o| o.id == d.org_id))
            .take(MAX_ANSWER_CITATIONS)
            .map(|d| Citation { title: Some(d.title.clone()), url: d.url.clone() })
            .collect();

        Ok(AskAnswer {
            answer: format!(
                "{} tracked organisation(s) relevant: {}. {} claim(s) on record.",
                relevant.len(),
                names.join(", "),
                claim_count
            ),
            citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dacdash_common::entities::{DraftState, Stage};

    #[tokio::test]
    async fn test_search_matches_text_case_insensitive() {
        let port = MemoryDataPort::seeded();
        let orgs = port.search_entities(Some("ICELAND"), None).await.unwrap();
        assert!(orgs.iter().any(|o| o.id == "climeworks"));
        assert!(orgs.iter().all(|o| o.id != "heirloom"));
    }

    #[tokio::test]
    async fn test_search_filters_by_stage_and_funding() {
        let port = MemoryDataPort::seeded();
        let filters = SearchFilters {
            stages: vec![Stage::Commercial],
            ..Default::default()
        };
        let orgs = port.search_entities(None, Some(&filters)).await.unwrap();
        assert!(orgs.iter().all(|o| o.stage == Stage::Commercial));

        let cheap = SearchFilters { max_funding_usd: Some(1.0), ..Default::default() };
        assert!(port.search_entities(None, Some(&cheap)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_pilot_filter() {
        let port = MemoryDataPort::seeded();
        let filters = SearchFilters { has_active_pilot: true, ..Default::default() };
        let orgs = port.search_entities(None, Some(&filters)).await.unwrap();
        assert_eq!(orgs.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["heirloom"]);
    }

    #[tokio::test]
    async fn test_propose_then_approve() {
        let port = MemoryDataPort::empty();
        let receipt = port
            .propose_write(DraftKind::Claim, serde_json::json!({ "orgId": "x" }))
            .await
            .unwrap();
        port.approve_write(&receipt.draft_id).await.unwrap();

        let drafts = port.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].state, DraftState::Approved);
        // Approving twice is harmless
        port.approve_write(&receipt.draft_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_unknown_draft_is_not_found() {
        let port = MemoryDataPort::empty();
        let err = port.approve_write("nope").await.unwrap_err();
        assert!(matches!(err, DashError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_failure_records_nothing() {
        let port = MemoryDataPort::empty();
        port.fail_writes(Some("store offline".into())).await;
        let err = port
            .propose_write(DraftKind::DossierText, serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "store offline");
        assert_eq!(port.draft_count().await, 0);
    }

    #[tokio::test]
    async fn test_ask_uses_context_entity() {
        let port = MemoryDataPort::seeded();
        let ctx = AskContext { entity_id: Some("heirloom".into()), ..Default::default() };
        let answer = port.ask_ai("what changed recently?", Some(&ctx)).await.unwrap();
        assert!(answer.answer.contains("Heirloom"));
    }

    #[tokio::test]
    async fn test_relations_filtered_by_type() {
        let port = MemoryDataPort::seeded();
        let q = RelationQuery {
            types: vec![dacdash_common::entities::RelationType::Storage],
            ..Default::default()
        };
        let rels = port.get_relations("climeworks", Some(&q)).await.unwrap();
        assert!(!rels.is_empty());
        assert!(rels.iter().all(|r| r.relation_type == dacdash_common::entities::RelationType::Storage));
    }

    #[test]
    fn test_signals_listing_blocks_on_plain_thread() {
        let port = MemoryDataPort::seeded();
        let signals = tokio_test::block_on(port.get_signals()).unwrap();
        assert_eq!(signals.len(), 1);
    }
}
