//! Route controller: one authoritative `Route`, synchronised with the address bar.
//!
//! Programmatic navigation either writes the bar (and lets the resulting change
//! notification update state) or, when the bar would not change, updates state
//! directly. Never both. Each write is tagged with a sequence number so the
//! notification it causes can be recognised when it comes back.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use dacdash_common::Id;

use crate::codec;
use crate::lock;
use crate::route::{Mode, Route, View, KEY_QUERY};

// ---------------------------------------------------------------------------
// Address bar
// ---------------------------------------------------------------------------

/// The host's address fragment.
pub trait AddressBar: Send + Sync {
    /// Current fragment, or `None` when running without an address bar.
    fn fragment(&self) -> Option<String>;

    /// Replace the fragment. Hosts only notify when the value actually changes.
    fn write(&self, fragment: &str);
}

/// A fragment-change notification. The payload may already be stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChange {
    pub fragment: String,
    pub revision: u64,
}

#[derive(Debug)]
struct BarState {
    fragment: String,
    revision: u64,
}

/// In-process address bar that behaves like a browser's: writing the same
/// fragment again is a no-op and fires nothing.
#[derive(Debug)]
pub struct MemoryAddressBar {
    state: Mutex<BarState>,
    notify: mpsc::UnboundedSender<HashChange>,
}

impl MemoryAddressBar {
    pub fn new(initial: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<HashChange>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let bar = Arc::new(Self {
            state: Mutex::new(BarState { fragment: initial.to_string(), revision: 0 }),
            notify,
        });
        (bar, rx)
    }

    /// Number of effective writes so far.
    pub fn revision(&self) -> u64 {
        lock(&self.state).revision
    }

    /// Simulate the user typing into the address bar or pressing back.
    pub fn user_edit(&self, fragment: &str) {
        self.set(fragment);
    }

    fn set(&self, fragment: &str) {
        let change = {
            let mut state = lock(&self.state);
            if state.fragment == fragment {
                return;
            }
            state.fragment = fragment.to_string();
            state.revision += 1;
            HashChange { fragment: state.fragment.clone(), revision: state.revision }
        };
        // A closed receiver just means nobody is listening any more
        let _ = self.notify.send(change);
    }
}

impl AddressBar for MemoryAddressBar {
    fn fragment(&self) -> Option<String> {
        Some(lock(&self.state).fragment.clone())
    }

    fn write(&self, fragment: &str) {
        self.set(fragment);
    }
}

/// No address bar at all, e.g. a batch job driving the core.
#[derive(Debug, Default)]
pub struct Detached;

impl AddressBar for Detached {
    fn fragment(&self) -> Option<String> {
        None
    }

    fn write(&self, _fragment: &str) {}
}

// ---------------------------------------------------------------------------
// Navigation requests
// ---------------------------------------------------------------------------

/// Extra fields for one `navigate` call.
///
/// Mode and the search query carry over from the current route unless
/// overridden here. Other query keys do not carry over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavExtras {
    mode: Option<Mode>,
    set: Vec<(String, String)>,
    clear: Vec<String>,
}

impl NavExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set a query key. An empty value clears it.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.push((key.into(), value.into()));
        self
    }

    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.clear.push(key.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The address bar was written; state follows when its notification arrives.
    Written { seq: u64 },
    /// The fragment would not change; state was replaced in place and listeners re-run.
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// An external change replaced the route.
    Applied,
    /// The notification for one of our own writes arrived.
    Settled { seq: u64 },
    /// Nothing new; the bar already matches the applied route.
    Ignored,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    seq: u64,
    fragment: String,
}

#[derive(Debug, Default)]
struct Tracking {
    next_seq: u64,
    pending: Option<PendingWrite>,
    applied: Option<String>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct RouteController {
    bar: Arc<dyn AddressBar>,
    route: watch::Sender<Route>,
    tracking: Mutex<Tracking>,
}

impl std::fmt::Debug for RouteController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteController")
            .field("route", &*self.route.borrow())
            .finish()
    }
}

impl RouteController {
    /// Seed the route from the bar's current fragment (`home` without a bar).
    pub fn new(bar: Arc<dyn AddressBar>) -> Self {
        let initial = bar.fragment();
        let route = initial.as_deref().map(codec::decode).unwrap_or_default();
        info!(view = %route.view, org_id = ?route.entity_id, "Route initialised");
        let (tx, _rx) = watch::channel(route);
        Self {
            bar,
            route: tx,
            tracking: Mutex::new(Tracking { applied: initial, ..Default::default() }),
        }
    }

    pub fn route(&self) -> Route {
        self.route.borrow().clone()
    }

    /// Receiver notified on every applied change and every forced refresh.
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    /// Fragment for the current route in canonical form.
    pub fn current_fragment(&self) -> String {
        codec::encode(&self.route.borrow())
    }

    /// Target route for a navigation, merging the current mode and search text.
    pub fn target(&self, view: View, entity_id: Option<&str>, extras: &NavExtras) -> Route {
        let current = self.route.borrow();
        let mut target = Route {
            view,
            entity_id: entity_id.filter(|id| !id.is_empty()).map(Id::from),
            mode: extras.mode.unwrap_or(current.mode),
            ..Default::default()
        };
        if let Some(q) = current.search_text() {
            target.query.insert(KEY_QUERY.to_string(), q.to_string());
        }
        drop(current);

        for key in &extras.clear {
            target.query.remove(key);
        }
        for (key, value) in &extras.set {
            if value.is_empty() {
                target.query.remove(key);
            } else {
                target.query.insert(key.clone(), value.clone());
            }
        }
        target
    }

    pub fn navigate(&self, view: View, entity_id: Option<&str>, extras: NavExtras) -> NavOutcome {
        let target = self.target(view, entity_id, &extras);
        let fragment = codec::encode(&target);

        let current = match self.bar.fragment() {
            Some(current) => current,
            None => {
                debug!(fragment = %fragment, "No address bar; updating route in place");
                self.route.send_replace(codec::decode(&fragment));
                return NavOutcome::Refreshed;
            }
        };

        let mut tracking = lock(&self.tracking);
        if current == fragment {
            debug!(fragment = %fragment, "Fragment unchanged; forcing refresh");
            tracking.pending = None;
            tracking.applied = Some(fragment.clone());
            self.route.send_replace(codec::decode(&fragment));
            return NavOutcome::Refreshed;
        }

        tracking.next_seq += 1;
        let seq = tracking.next_seq;
        tracking.pending = Some(PendingWrite { seq, fragment: fragment.clone() });
        drop(tracking);

        info!(seq, view = %view, org_id = ?entity_id, fragment = %fragment, "Navigating");
        self.bar.write(&fragment);
        NavOutcome::Written { seq }
    }

    /// Process one change notification by re-reading the bar, never the payload.
    pub fn handle_fragment_change(&self) -> ChangeOutcome {
        let Some(fragment) = self.bar.fragment() else {
            return ChangeOutcome::Ignored;
        };

        let mut tracking = lock(&self.tracking);
        if let Some(pending) = tracking.pending.take() {
            if pending.fragment == fragment {
                tracking.applied = Some(fragment.clone());
                drop(tracking);
                self.route.send_replace(codec::decode(&fragment));
                debug!(seq = pending.seq, "Navigation settled");
                return ChangeOutcome::Settled { seq: pending.seq };
            }
            debug!(seq = pending.seq, "Pending navigation superseded by an external change");
        }

        if tracking.applied.as_deref() == Some(fragment.as_str()) {
            debug!(fragment = %fragment, "Duplicate fragment notification ignored");
            return ChangeOutcome::Ignored;
        }
        tracking.applied = Some(fragment.clone());
        drop(tracking);

        let next = codec::decode(&fragment);
        info!(view = %next.view, org_id = ?next.entity_id, "Route changed externally");
        self.route.send_if_modified(|route| {
            if *route == next {
                false
            } else {
                *route = next;
                true
            }
        });
        ChangeOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(initial: &str) -> (Arc<MemoryAddressBar>, mpsc::UnboundedReceiver<HashChange>, RouteController) {
        let (bar, rx) = MemoryAddressBar::new(initial);
        let controller = RouteController::new(bar.clone());
        (bar, rx, controller)
    }

    #[test]
    fn test_initial_route_from_fragment() {
        let (_bar, _rx, controller) = setup("#company?org=climeworks&mode=curator");
        let route = controller.route();
        assert_eq!(route.view, View::Company);
        assert_eq!(route.entity_id.as_deref(), Some("climeworks"));
        assert_eq!(route.mode, Mode::Curator);
    }

    #[test]
    fn test_detached_defaults_to_home() {
        let controller = RouteController::new(Arc::new(Detached));
        assert_eq!(controller.route(), Route::default());
        let outcome = controller.navigate(View::Radar, None, NavExtras::new());
        assert_eq!(outcome, NavOutcome::Refreshed);
        assert_eq!(controller.route().view, View::Radar);
    }

    #[test]
    fn test_navigate_writes_then_settles() {
        let (bar, mut rx, controller) = setup("#home");
        let outcome = controller.navigate(View::Company, Some("heirloom"), NavExtras::new());
        assert_eq!(outcome, NavOutcome::Written { seq: 1 });
        // State waits for the notification
        assert_eq!(controller.route().view, View::Home);
        assert_eq!(bar.fragment().as_deref(), Some("#company?org=heirloom"));

        assert!(rx.try_recv().is_ok());
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Settled { seq: 1 });
        assert_eq!(controller.route().entity_id.as_deref(), Some("heirloom"));
    }

    #[test]
    fn test_identical_target_refreshes_without_write() {
        let (bar, mut rx, controller) = setup("#company?org=climeworks");
        let mut listener = controller.subscribe();
        listener.borrow_and_update();

        let outcome = controller.navigate(View::Company, Some("climeworks"), NavExtras::new());
        assert_eq!(outcome, NavOutcome::Refreshed);
        assert_eq!(bar.revision(), 0);
        assert!(rx.try_recv().is_err());
        assert!(listener.has_changed().unwrap());
    }

    #[test]
    fn test_mode_and_query_carry_over() {
        let (bar, _rx, controller) = setup("#finder?q=iceland&stage=pilot&mode=curator");
        controller.navigate(View::Company, Some("climeworks"), NavExtras::new());
        assert_eq!(
            bar.fragment().as_deref(),
            Some("#company?org=climeworks&q=iceland&mode=curator")
        );
    }

    #[test]
    fn test_extras_override_and_clear() {
        let (bar, _rx, controller) = setup("#finder?q=iceland&mode=curator");
        controller.navigate(
            View::Finder,
            None,
            NavExtras::new().mode(Mode::Read).clear(KEY_QUERY).set("stage", "demo"),
        );
        assert_eq!(bar.fragment().as_deref(), Some("#finder?stage=demo"));
    }

    #[test]
    fn test_external_change_replaces_route_wholesale() {
        let (bar, _rx, controller) = setup("#finder?q=iceland&mode=curator");
        bar.user_edit("#network");
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Applied);
        assert_eq!(controller.route(), Route::new(View::Network));
    }

    #[test]
    fn test_stale_notification_rereads_current_fragment() {
        let (bar, mut rx, controller) = setup("#home");
        bar.user_edit("#radar");
        bar.user_edit("#triage");
        // Two notifications queued; the first one already carries a stale payload
        assert_eq!(rx.try_recv().unwrap().fragment, "#radar");
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Applied);
        assert_eq!(controller.route().view, View::Triage);
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Ignored);
    }

    #[test]
    fn test_user_edit_supersedes_pending_write() {
        let (bar, _rx, controller) = setup("#home");
        controller.navigate(View::Map, Some("climeworks"), NavExtras::new());
        bar.user_edit("#stale");
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Applied);
        assert_eq!(controller.route().view, View::Stale);
        assert_eq!(controller.handle_fragment_change(), ChangeOutcome::Ignored);
    }

    #[test]
    fn test_identical_write_is_not_observable() {
        let (bar, mut rx) = MemoryAddressBar::new("#home");
        bar.write("#home");
        assert_eq!(bar.revision(), 0);
        assert!(rx.try_recv().is_err());
    }
}
