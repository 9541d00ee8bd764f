//! The structured route: which page, which entity, which query, which mode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dacdash_common::entities::Stage;
use dacdash_common::Id;
use dacdash_data::SearchFilters;

/// Query key carrying the free-text search.
pub const KEY_QUERY: &str = "q";

// Finder filter keys
pub const KEY_APPROACH: &str = "approach";
pub const KEY_STAGE: &str = "stage";
pub const KEY_PILOT: &str = "pilot";
pub const KEY_MAX_FUNDING: &str = "max_funding";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Finder,
    Company,
    Funding,
    Pubs,
    Stale,
    Map,
    Network,
    Radar,
    Triage,
    /// Reachable by link only; not listed in the primary navigation.
    Brief,
    NotFound,
}

impl View {
    pub const ALL: [View; 12] = [
        View::Home,
        View::Finder,
        View::Company,
        View::Funding,
        View::Pubs,
        View::Stale,
        View::Map,
        View::Network,
        View::Radar,
        View::Triage,
        View::Brief,
        View::NotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Home     => "home",
            View::Finder   => "finder",
            View::Company  => "company",
            View::Funding  => "funding",
            View::Pubs     => "pubs",
            View::Stale    => "stale",
            View::Map      => "map",
            View::Network  => "network",
            View::Radar    => "radar",
            View::Triage   => "triage",
            View::Brief    => "brief",
            View::NotFound => "notfound",
        }
    }

    /// Exact, case-sensitive match against the fragment spelling.
    pub fn parse(value: &str) -> Option<View> {
        View::ALL.into_iter().find(|v| v.as_str() == value)
    }

    /// Whether the view has an entry in the primary navigation.
    pub fn is_tab(&self) -> bool {
        !matches!(self, View::Brief | View::NotFound)
    }

    /// Views that show the selected organisation and so carry it in the fragment.
    pub fn carries_entity(&self) -> bool {
        matches!(self, View::Company | View::Map | View::Brief)
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Read,
    Curator,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Read    => "read",
            Mode::Curator => "curator",
        }
    }

    /// Anything but `curator` is read-only.
    pub fn parse(value: &str) -> Mode {
        if value == "curator" { Mode::Curator } else { Mode::Read }
    }

    pub fn is_curator(&self) -> bool {
        *self == Mode::Curator
    }
}

/// Decoded form of the address fragment.
///
/// `query` holds every non-empty parameter other than `view`, `org` and
/// `mode`, including the search text under `q`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Route {
    pub view: View,
    pub entity_id: Option<Id>,
    pub query: BTreeMap<String, String>,
    pub mode: Mode,
}

impl Route {
    pub fn new(view: View) -> Self {
        Self { view, ..Default::default() }
    }

    pub fn with_entity(mut self, id: impl Into<Id>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.query.insert(key.into(), value);
        }
        self
    }

    pub fn search_text(&self) -> Option<&str> {
        self.query.get(KEY_QUERY).map(String::as_str)
    }

    /// Comma-separated list parameter, trimmed and de-duplicated in first-seen order.
    pub fn query_list(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.query.get(key) else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !out.iter().any(|seen| seen == item) {
                out.push(item.to_string());
            }
        }
        out
    }

    /// Finder filters carried in the query. Unknown stages and unparseable
    /// amounts are ignored rather than rejected.
    pub fn search_filters(&self) -> SearchFilters {
        SearchFilters {
            approaches: self.query_list(KEY_APPROACH),
            stages: self
                .query_list(KEY_STAGE)
                .iter()
                .filter_map(|s| Stage::parse(s))
                .collect(),
            has_active_pilot: self.query.get(KEY_PILOT).is_some_and(|v| v == "active"),
            max_funding_usd: self
                .query
                .get(KEY_MAX_FUNDING)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite()),
        }
    }
}
