//! Applying externally generated deck suggestions.
//!
//! A provider turns a free-text request into named-card recommendations.
//! The recommendations are matched against the inventory by exact,
//! case-insensitive name and then run through the same mutators a user
//! action would use.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    deck::Composition,
    inventory::{AvailableCard, Inventory},
    models::Format,
    persist::CardLine,
};

/// One recommendation from a provider.
///
/// A positive count asks for copies to be added, a negative one for copies
/// to be cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Card name to look up in the inventory.
    pub card_name: String,
    /// Copies to add (positive) or remove (negative).
    pub count: i32,
    /// Provider's explanation.
    #[serde(default)]
    pub reason: String,
}

/// Everything a provider is given to work with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// The player's free-text request.
    pub prompt: String,
    /// Format of the deck.
    pub format: Format,
    /// Current deck contents.
    pub deck: Vec<CardLine>,
    /// Owned cards with copies to spare.
    pub available: Vec<AvailableCard>,
}

impl SuggestionRequest {
    /// Capture the request for `composition` against `inventory`.
    pub fn new(prompt: impl Into<String>, composition: &Composition, inventory: &Inventory) -> Self {
        Self {
            prompt: prompt.into(),
            format: composition.format(),
            deck: composition
                .entries()
                .iter()
                .map(CardLine::from_entry)
                .collect(),
            available: inventory.available_for(composition),
        }
    }
}

/// Opaque source of deck recommendations.
pub trait SuggestionProvider: Send + Sync {
    /// Produce suggestions, or a message describing why none could be made.
    fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> impl Future<Output = Result<Vec<Suggestion>, String>> + Send;
}

/// Failures while obtaining suggestions.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// The provider failed; its message is passed through unchanged.
    #[error("{0}")]
    Provider(String),
}

/// A suggestion that matched an owned card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSuggestion {
    /// Display name of the matched card.
    pub card_name: String,
    /// Signed count the provider asked for.
    pub requested: i32,
    /// Copies in the deck before.
    pub before: u32,
    /// Copies in the deck after.
    pub after: u32,
    /// Provider's explanation.
    pub reason: String,
}

/// A suggestion naming a card the player does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardNotFound {
    /// Name the provider used.
    pub card_name: String,
    /// Provider's explanation.
    pub reason: String,
}

/// Result of applying a batch of suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionReport {
    /// Suggestions that resolved, in input order.
    pub applied: Vec<AppliedSuggestion>,
    /// Suggestions that did not resolve.
    pub unresolved: Vec<CardNotFound>,
}

impl SuggestionReport {
    /// Number of suggestions that matched no owned card.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

/// Apply one suggestion to `composition`.
pub fn apply_suggestion(
    composition: &mut Composition,
    inventory: &Inventory,
    suggestion: &Suggestion,
) -> Result<AppliedSuggestion, CardNotFound> {
    let Some(card) = inventory.find_by_name(&suggestion.card_name) else {
        warn!(card = %suggestion.card_name, "Suggested card not in inventory");
        return Err(CardNotFound {
            card_name: suggestion.card_name.clone(),
            reason: suggestion.reason.clone(),
        });
    };

    let before = composition.count_of(card);
    let after = match suggestion.count {
        count if count > 0 => composition.add(card, count.unsigned_abs()),
        count if count < 0 => composition.remove(card, count.unsigned_abs()),
        _ => before,
    };
    Ok(AppliedSuggestion {
        card_name: card.display_name().to_string(),
        requested: suggestion.count,
        before,
        after,
        reason: suggestion.reason.clone(),
    })
}

/// Apply a batch of suggestions in order, collecting resolved and unresolved ones.
pub fn apply_suggestions(
    composition: &mut Composition,
    inventory: &Inventory,
    suggestions: &[Suggestion],
) -> SuggestionReport {
    let mut report = SuggestionReport::default();
    for suggestion in suggestions {
        match apply_suggestion(composition, inventory, suggestion) {
            Ok(applied) => report.applied.push(applied),
            Err(missing) => report.unresolved.push(missing),
        }
    }
    info!(
        applied = report.applied.len(),
        unresolved = report.unresolved_count(),
        "Suggestions applied"
    );
    report
}

/// Ask `provider` for suggestions about `composition`. Not retried on failure.
pub async fn request_suggestions<P: SuggestionProvider>(
    provider: &P,
    prompt: &str,
    composition: &Composition,
    inventory: &Inventory,
) -> Result<Vec<Suggestion>, SuggestError> {
    let request = SuggestionRequest::new(prompt, composition, inventory);
    provider.suggest(&request).await.map_err(|message| {
        warn!(error = %message, "Suggestion provider failed");
        SuggestError::Provider(message)
    })
}
