//! dacdash-data — The Data Access Port and its in-memory implementation.
//!
//! The dashboard core depends only on the [`DataPort`] trait. This crate also
//! ships a process-local store with demo organisations and the hydration step
//! that joins port records into dossiers.

pub mod port;
pub mod memory;
pub mod seed;
pub mod hydrate;

pub use port::{AskAnswer, AskContext, DataPort, DraftReceipt, RelationQuery, SearchFilters};
pub use memory::{MemoryDataPort, Tables};
pub use hydrate::load_dossiers;
