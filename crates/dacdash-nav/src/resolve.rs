//! Entity resolution: which dossier is on screen.
//!
//! Fallback chain: requested id, then the previous selection, then the first
//! entity in the collection, then nothing. Resolution never touches the route.

use serde::Serialize;
use tracing::debug;

use dacdash_common::{Dossier, Id};

use crate::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Requested(&'a Dossier),
    Previous(&'a Dossier),
    First(&'a Dossier),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    Requested,
    Previous,
    First,
    Absent,
}

impl<'a> Resolution<'a> {
    pub fn entity(&self) -> Option<&'a Dossier> {
        match *self {
            Resolution::Requested(d) | Resolution::Previous(d) | Resolution::First(d) => Some(d),
            Resolution::Absent => None,
        }
    }

    pub fn via(&self) -> ResolvedVia {
        match self {
            Resolution::Requested(_) => ResolvedVia::Requested,
            Resolution::Previous(_)  => ResolvedVia::Previous,
            Resolution::First(_)     => ResolvedVia::First,
            Resolution::Absent       => ResolvedVia::Absent,
        }
    }
}

pub fn resolve<'a>(
    collection: &'a [Dossier],
    requested: Option<&str>,
    previous: Option<&str>,
) -> Resolution<'a> {
    let find = |id: Option<&str>| id.and_then(|id| collection.iter().find(|d| d.id == id));

    if let Some(d) = find(requested) {
        Resolution::Requested(d)
    } else if let Some(d) = find(previous) {
        Resolution::Previous(d)
    } else if let Some(d) = collection.first() {
        Resolution::First(d)
    } else {
        Resolution::Absent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChange {
    pub previous: Option<Id>,
    pub selected: Option<Id>,
    pub via: ResolvedVia,
}

impl SelectionChange {
    pub fn changed(&self) -> bool {
        self.previous != self.selected
    }
}

/// Remembers the selection and re-resolves only when its inputs change:
/// a new collection generation or a different requested id.
#[derive(Debug, Default)]
pub struct SelectionCache {
    selected: Option<Id>,
    inputs: Option<(u64, Option<Id>)>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected dossier within `snapshot`, if it is still there.
    pub fn current<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Dossier> {
        self.selected.as_deref().and_then(|id| snapshot.get(id))
    }

    /// Re-resolve if the inputs changed. `None` means nothing was re-evaluated.
    pub fn sync(&mut self, snapshot: &Snapshot, requested: Option<&str>) -> Option<SelectionChange> {
        let inputs = (snapshot.generation, requested.map(Id::from));
        if self.inputs.as_ref() == Some(&inputs) {
            return None;
        }
        self.inputs = Some(inputs);

        let resolution = resolve(&snapshot.dossiers, requested, self.selected.as_deref());
        let previous = self.selected.take();
        self.selected = resolution.entity().map(|d| d.id.clone());

        let change = SelectionChange {
            previous,
            selected: self.selected.clone(),
            via: resolution.via(),
        };
        debug!(
            requested = ?requested,
            selected = ?change.selected,
            via = ?change.via,
            "Selection resolved"
        );
        Some(change)
    }

    /// Force the next `sync` to re-resolve, e.g. after a forced refresh.
    pub fn invalidate(&mut self) {
        self.inputs = None;
    }

    /// Point the selection at `id` directly, without resolving.
    pub fn select(&mut self, id: impl Into<Id>) -> SelectionChange {
        let previous = self.selected.replace(id.into());
        SelectionChange { previous, selected: self.selected.clone(), via: ResolvedVia::Requested }
    }
}
