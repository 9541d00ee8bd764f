//! dacdash-nav — Navigation and state core of the DAC dashboard.
//!
//! One URL fragment drives the page, the selected organisation, the search
//! query and the read/curator mode. This crate keeps that fragment and the
//! in-memory state consistent, resolves the entity on screen, and runs the
//! curator draft workflow against a `DataPort`.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod route;
pub mod codec;
pub mod controller;
pub mod store;
pub mod resolve;
pub mod curator;
pub mod workflow;
pub mod review;
pub mod ask;
pub mod session;

pub use route::{Mode, Route, View};
pub use controller::{AddressBar, Detached, MemoryAddressBar, NavExtras, NavOutcome, RouteController};
pub use store::{EntityStore, LoadOutcome, Snapshot};
pub use resolve::{resolve, Resolution, SelectionCache};
pub use curator::{CuratorPanel, CuratorPanelState};
pub use workflow::{DraftWorkflow, OrgForm};
pub use session::{DashboardSession, SessionView};

// A panic while holding one of these locks leaves plain data behind; keep going.

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}
