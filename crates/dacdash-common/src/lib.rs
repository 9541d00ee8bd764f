//! dacdash-common — Shared types and errors used across all dacdash crates.

pub mod error;
pub mod entities;
pub mod dossier;

// Re-export commonly used types
pub use error::{DashError, Result};
pub use entities::{Citation, Draft, DraftKind, DraftState, Id, Org};
pub use dossier::Dossier;
