#![warn(clippy::all, missing_docs)]

//! Core domain logic for Deckforge.
//!
//! This crate hosts the card and deck models, the format rules, deck
//! analytics, suggestion handling and the persistence layer that keeps a
//! deck in step with a remote deck service and a local fallback store.

pub mod config;
pub mod deck;
pub mod inventory;
pub mod models;
pub mod persist;
pub mod rules;
pub mod suggest;

pub use config::AppConfig;
pub use deck::{Composition, CompositionEntry};
pub use inventory::Inventory;
pub use models::{CardIdentity, CardKey, Format, OwnedCard};
pub use persist::{Reconciler, StoreError};
pub use suggest::{Suggestion, SuggestionReport};
