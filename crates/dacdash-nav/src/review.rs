//! Draft review surface: the curator's list of proposed changes.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use dacdash_common::{Citation, DashError, Draft, Id, Result};

use crate::lock;
use crate::route::Mode;
use crate::workflow::DraftWorkflow;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewState {
    pub open: bool,
    pub loading: bool,
    pub drafts: Vec<Draft>,
    /// Draft currently being approved.
    pub submitting: Option<Id>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Surface {
    view: ReviewState,
    /// Bumped by every listing and by `close`; only the latest listing publishes.
    generation: u64,
}

#[derive(Debug)]
pub struct DraftReview {
    workflow: Arc<DraftWorkflow>,
    state: Mutex<Surface>,
}

impl DraftReview {
    pub fn new(workflow: Arc<DraftWorkflow>) -> Self {
        Self { workflow, state: Mutex::new(Surface::default()) }
    }

    pub fn state(&self) -> ReviewState {
        lock(&self.state).view.clone()
    }

    /// Open the surface and fetch a fresh list.
    pub async fn open(&self) -> Result<Vec<Draft>> {
        lock(&self.state).view.open = true;
        self.refresh().await
    }

    /// Tear the surface down. Listings still in flight are dropped when they land.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.view = ReviewState::default();
    }

    /// A failed listing shows an empty list plus the message. A listing that
    /// was overtaken by a newer one, or by `close`, returns its result to the
    /// caller but leaves the surface alone.
    pub async fn refresh(&self) -> Result<Vec<Draft>> {
        let ticket = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.view.loading = true;
            state.generation
        };
        let result = self.workflow.list_outstanding().await;

        let mut state = lock(&self.state);
        if state.generation != ticket {
            debug!(ticket, current = state.generation, "Stale draft listing dropped");
            return result;
        }
        state.view.loading = false;
        match result {
            Ok(drafts) => {
                debug!(count = drafts.len(), "Drafts refreshed");
                state.view.drafts = drafts.clone();
                state.view.error = None;
                Ok(drafts)
            }
            Err(e) => {
                state.view.drafts.clear();
                state.view.error = Some(e.message());
                Err(e)
            }
        }
    }

    /// Approve one draft, then re-list. Curators only; one approval at a time.
    pub async fn approve(&self, draft_id: &str, mode: Mode) -> Result<()> {
        if !mode.is_curator() {
            return Err(DashError::Validation("Approval requires curator mode".into()));
        }
        {
            let mut state = lock(&self.state);
            let view = &mut state.view;
            if let Some(current) = &view.submitting {
                return Err(DashError::Busy(format!("approval of {current}")));
            }
            view.submitting = Some(draft_id.to_string());
            view.error = None;
        }

        let result = self.workflow.approve(draft_id).await;
        {
            let mut state = lock(&self.state);
            let view = &mut state.view;
            view.submitting = None;
            if let Err(e) = &result {
                view.error = Some(e.message());
            }
        }
        result?;
        self.refresh().await.map(|_| ())
    }

    /// Rejection has no durable effect; it is only recorded in the log.
    pub fn reject(&self, draft_id: &str, mode: Mode) -> Result<()> {
        if !mode.is_curator() {
            return Err(DashError::Validation("Rejection requires curator mode".into()));
        }
        info!(target: "dacdash::telemetry", event = "reject_write", draft_id = %draft_id);
        Ok(())
    }
}

/// Every `{url|href, title?}` object nested anywhere in a draft payload.
pub fn find_citations(payload: &Value) -> Vec<Citation> {
    let mut out = Vec::new();
    collect_citations(payload, &mut out);
    out
}

fn collect_citations(value: &Value, out: &mut Vec<Citation>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_citations(item, out)),
        Value::Object(map) => {
            let link = ["url", "href"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty());
            if let Some(url) = link {
                out.push(Citation {
                    title: map.get("title").and_then(Value::as_str).map(str::to_string),
                    url: url.to_string(),
                });
            }
            map.values().for_each(|child| collect_citations(child, out));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dacdash_common::DraftKind;
    use dacdash_data::{DataPort, MemoryDataPort};
    use serde_json::json;

    use crate::store::EntityStore;

    fn review(port: Arc<MemoryDataPort>) -> DraftReview {
        let store = Arc::new(EntityStore::new());
        DraftReview::new(Arc::new(DraftWorkflow::new(port, store)))
    }

    #[test]
    fn test_find_citations_walks_nested_payload() {
        let payload = json!({
            "orgId": "x",
            "payload": {
                "sources": [
                    { "title": "Paper", "url": "https://doi.org/1" },
                    { "href": "/docs/memo.pdf" },
                    { "url": "" }
                ],
                "citation": { "title": "News", "url": "https://news.example/a" }
            }
        });
        let mut urls: Vec<String> = find_citations(&payload).into_iter().map(|c| c.url).collect();
        urls.sort();
        assert_eq!(urls, vec!["/docs/memo.pdf", "https://doi.org/1", "https://news.example/a"]);
        assert!(find_citations(&json!("plain")).is_empty());
    }

    #[tokio::test]
    async fn test_open_always_refetches() {
        let port = Arc::new(MemoryDataPort::empty());
        let review = review(port.clone());
        assert!(review.open().await.unwrap().is_empty());

        // Another actor files a draft between opens
        port.propose_write(DraftKind::Relation, json!({})).await.unwrap();
        review.close();
        assert_eq!(review.open().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_then_refresh() {
        let port = Arc::new(MemoryDataPort::empty());
        let receipt = port.propose_write(DraftKind::Claim, json!({})).await.unwrap();
        let review = review(port.clone());
        review.open().await.unwrap();

        review.approve(&receipt.draft_id, Mode::Curator).await.unwrap();
        let state = review.state();
        assert!(state.drafts.is_empty());
        assert_eq!(state.submitting, None);
    }

    #[tokio::test]
    async fn test_read_mode_cannot_approve() {
        let port = Arc::new(MemoryDataPort::empty());
        let receipt = port.propose_write(DraftKind::Claim, json!({})).await.unwrap();
        let review = review(port.clone());
        assert!(review.approve(&receipt.draft_id, Mode::Read).await.is_err());
        assert_eq!(review.open().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_surfaces_message() {
        let port = Arc::new(MemoryDataPort::empty());
        let receipt = port.propose_write(DraftKind::Claim, json!({})).await.unwrap();
        port.fail_writes(Some("Approval service down".into())).await;
        let review = review(port.clone());

        let err = review.approve(&receipt.draft_id, Mode::Curator).await.unwrap_err();
        assert_eq!(err.message(), "Approval service down");
        assert_eq!(review.state().error.as_deref(), Some("Approval service down"));
        assert_eq!(review.state().submitting, None);
    }

    #[tokio::test]
    async fn test_reject_is_a_no_op() {
        let port = Arc::new(MemoryDataPort::empty());
        let receipt = port.propose_write(DraftKind::Claim, json!({})).await.unwrap();
        let review = review(port.clone());
        review.reject(&receipt.draft_id, Mode::Curator).unwrap();
        assert_eq!(review.open().await.unwrap().len(), 1);
    }
}
