//! Ask-AI session: one question at a time, answers carry citations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use dacdash_common::{DashError, DraftKind, Id, Result};
use dacdash_data::{AskAnswer, AskContext, DataPort};

use crate::lock;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AskState {
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<AskAnswer>,
}

pub struct AskSession {
    port: Arc<dyn DataPort>,
    state: Mutex<AskState>,
    /// Citation keys with a relation proposal in flight.
    proposing: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for AskSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskSession").field("state", &*lock(&self.state)).finish()
    }
}

/// Stable key of a citation within one answer.
pub fn citation_key(url: &str, index: usize) -> String {
    format!("{url}-{index}")
}

impl AskSession {
    pub fn new(port: Arc<dyn DataPort>) -> Self {
        Self {
            port,
            state: Mutex::new(AskState::default()),
            proposing: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self) -> AskState {
        lock(&self.state).clone()
    }

    /// Clear everything, as when the drawer closes.
    pub fn reset(&self) {
        *lock(&self.state) = AskState::default();
    }

    pub async fn ask(&self, question: &str, context: Option<AskContext>) -> Result<AskAnswer> {
        let question = question.trim();
        if question.is_empty() {
            let err = DashError::Validation("Enter a question for Ask AI.".into());
            lock(&self.state).error = Some(err.message());
            return Err(err);
        }
        {
            let mut state = lock(&self.state);
            if state.loading {
                return Err(DashError::Busy("Ask AI".into()));
            }
            state.loading = true;
            state.error = None;
        }

        let result = self.port.ask_ai(question, context.as_ref()).await;
        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(answer) => {
                info!(citations = answer.citations.len(), "Ask AI answered");
                state.result = Some(answer.clone());
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "Ask AI failed");
                state.error = Some(e.message());
                Err(e)
            }
        }
    }

    /// File a `relation` draft for the `index`-th citation of the current answer.
    pub async fn propose_relation(&self, index: usize, entity_id: Option<&str>) -> Result<Id> {
        let citation = lock(&self.state)
            .result
            .as_ref()
            .and_then(|r| r.citations.get(index).cloned())
            .ok_or_else(|| DashError::NotFound(format!("citation {index}")))?;

        let key = citation_key(&citation.url, index);
        if !lock(&self.proposing).insert(key.clone()) {
            return Err(DashError::Busy(key));
        }

        let payload = json!({
            "citationKey": key,
            "entityId": entity_id,
            "citation": { "title": citation.title, "url": citation.url },
        });
        let result = self.port.propose_write(DraftKind::Relation, payload).await;
        lock(&self.proposing).remove(&key);

        let receipt = result?;
        info!(
            target: "dacdash::telemetry",
            event = "propose_relation",
            citation_key = %key,
            draft_id = %receipt.draft_id
        );
        Ok(receipt.draft_id)
    }
}
