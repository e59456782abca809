//! Deck composition, availability and analytics.

/// Mana curve and deck summaries.
pub mod analytics;
/// Owned-versus-placed copy tracking.
pub mod availability;
/// The mutable deck aggregate.
pub mod composition;

pub use analytics::{mana_curve, summarize, CardCategory, CurveBucket, DeckSummary};
pub use availability::available;
pub use composition::{Composition, CompositionEntry};
