//! Hash codec: address fragment <-> `Route`.
//!
//! Grammar: `#<view>[?org=<id>][&q=<text>][&<key>=<value>...][&mode=curator]`.
//! Also accepted on input: a leading slash in the path (`#/finder`) and the
//! all-query form (`#view=company&org=x`).

use url::form_urlencoded;

use crate::route::{Mode, Route, View, KEY_QUERY};

pub const KEY_VIEW: &str = "view";
pub const KEY_ORG: &str = "org";
pub const KEY_MODE: &str = "mode";

fn is_reserved(key: &str) -> bool {
    key == KEY_VIEW || key == KEY_ORG || key == KEY_MODE
}

/// Parse a fragment. Never fails: unknown views become `home`, unknown modes `read`.
pub fn decode(fragment: &str) -> Route {
    let raw = fragment.trim();
    let raw = raw.strip_prefix('#').unwrap_or(raw).trim();
    if raw.is_empty() {
        return Route::default();
    }

    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, query),
        None if raw.contains('=') => ("", raw),
        None => (raw, ""),
    };
    let path = path.trim_matches('/');

    let mut view_key: Option<String> = None;
    let mut route = Route::default();
    let mut seen: Vec<String> = Vec::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        // First occurrence of a key wins
        if seen.iter().any(|k| *k == key) {
            continue;
        }
        seen.push(key.to_string());

        match key.as_ref() {
            KEY_VIEW => view_key = Some(value.into_owned()),
            KEY_ORG => {
                if !value.is_empty() {
                    route.entity_id = Some(value.into_owned());
                }
            }
            KEY_MODE => route.mode = Mode::parse(&value),
            _ => {
                if !value.is_empty() {
                    route.query.insert(key.into_owned(), value.into_owned());
                }
            }
        }
    }

    let view_name = if path.is_empty() { view_key.as_deref().unwrap_or("") } else { path };
    // `notfound` is only ever set programmatically
    route.view = View::parse(view_name)
        .filter(|v| *v != View::NotFound)
        .unwrap_or(View::Home);
    route
}

/// Serialise a route into its canonical fragment, including the leading `#`.
pub fn encode(route: &Route) -> String {
    let mut pairs = form_urlencoded::Serializer::new(String::new());
    let mut any = false;

    if let Some(org) = route.entity_id.as_deref().filter(|id| !id.is_empty()) {
        pairs.append_pair(KEY_ORG, org);
        any = true;
    }
    if let Some(q) = route.search_text().filter(|q| !q.is_empty()) {
        pairs.append_pair(KEY_QUERY, q);
        any = true;
    }
    for (key, value) in &route.query {
        if key == KEY_QUERY || is_reserved(key) || key.is_empty() || value.is_empty() {
            continue;
        }
        pairs.append_pair(key, value);
        any = true;
    }
    if route.mode.is_curator() {
        pairs.append_pair(KEY_MODE, Mode::Curator.as_str());
        any = true;
    }

    let query = pairs.finish();
    if any {
        format!("#{}?{}", route.view.as_str(), query)
    } else {
        format!("#{}", route.view.as_str())
    }
}

/// Shareable link: `base_url` followed by the encoded fragment.
pub fn link(base_url: &str, route: &Route) -> String {
    let base = base_url.split('#').next().unwrap_or_default();
    format!("{}{}", base, encode(route))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fragments_decode_to_default() {
        assert_eq!(decode(""), Route::default());
        assert_eq!(decode("#"), Route::default());
        assert_eq!(decode("  #  "), Route::default());
        assert_eq!(decode("").view, View::Home);
        assert_eq!(decode("").mode, Mode::Read);
    }

    #[test]
    fn test_unknown_view_canonicalizes_to_home() {
        let route = decode("#bogus-view");
        assert_eq!(route.view, View::Home);
        assert_eq!(route.entity_id, None);
        assert!(route.query.is_empty());
        assert_eq!(decode("#notfound?org=x").view, View::Home);
        assert_eq!(decode("#view=notfound").view, View::Home);
    }

    #[test]
    fn test_brief_is_preserved() {
        let route = decode("#brief?org=heirloom");
        assert_eq!(route.view, View::Brief);
        assert_eq!(route.entity_id.as_deref(), Some("heirloom"));
    }

    #[test]
    fn test_full_fragment() {
        let route = decode("#company?org=climeworks&q=solid%20sorbent&mode=curator");
        assert_eq!(route.view, View::Company);
        assert_eq!(route.entity_id.as_deref(), Some("climeworks"));
        assert_eq!(route.search_text(), Some("solid sorbent"));
        assert_eq!(route.mode, Mode::Curator);
    }

    #[test]
    fn test_mode_other_than_curator_is_read() {
        assert_eq!(decode("#home?mode=admin").mode, Mode::Read);
        assert_eq!(decode("#home?mode=").mode, Mode::Read);
    }

    #[test]
    fn test_legacy_all_query_form() {
        let route = decode("#view=company&org=climeworks&mode=curator");
        assert_eq!(route.view, View::Company);
        assert_eq!(route.entity_id.as_deref(), Some("climeworks"));
        assert_eq!(route.mode, Mode::Curator);
    }

    #[test]
    fn test_leading_slash_and_path_precedence() {
        assert_eq!(decode("#/finder").view, View::Finder);
        assert_eq!(decode("#radar?view=map").view, View::Radar);
        assert_eq!(decode("#?view=map").view, View::Map);
    }

    #[test]
    fn test_first_duplicate_key_wins() {
        let route = decode("#company?org=a&org=b");
        assert_eq!(route.entity_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let route = decode("#finder?org=&q=&stage=");
        assert_eq!(route.entity_id, None);
        assert!(route.query.is_empty());
        assert_eq!(encode(&route), "#finder");
    }

    #[test]
    fn test_encode_ordering_is_canonical() {
        let route = Route::new(View::Finder)
            .with_entity("climeworks")
            .with_query("stage", "pilot,demo")
            .with_query(KEY_QUERY, "iceland")
            .with_query("approach", "solid")
            .with_mode(Mode::Curator);
        assert_eq!(
            encode(&route),
            "#finder?org=climeworks&q=iceland&approach=solid&stage=pilot%2Cdemo&mode=curator"
        );
    }

    #[test]
    fn test_read_mode_is_omitted() {
        assert_eq!(encode(&Route::new(View::Home)), "#home");
        assert_eq!(encode(&Route::new(View::Company).with_entity("x")), "#company?org=x");
    }

    #[test]
    fn test_round_trip_for_every_view() {
        for view in View::ALL.into_iter().filter(|v| *v != View::NotFound) {
            let route = Route::new(view)
                .with_entity("carbon engineering/ltd")
                .with_query(KEY_QUERY, "a&b=c")
                .with_mode(Mode::Curator);
            assert_eq!(decode(&encode(&route)), route, "view {view}");
        }
    }

    #[test]
    fn test_encode_is_stable_after_decode() {
        let messy = "#/company?mode=curator&org=x&q=&extra=1";
        let once = encode(&decode(messy));
        assert_eq!(once, "#company?org=x&extra=1&mode=curator");
        assert_eq!(encode(&decode(&once)), once);
    }

    #[test]
    fn test_link_replaces_existing_fragment() {
        let route = Route::new(View::Brief).with_entity("heirloom");
        assert_eq!(link("https://dash.example/app#old", &route), "https://dash.example/app#brief?org=heirloom");
        assert_eq!(link("", &route), "#brief?org=heirloom");
    }
}
