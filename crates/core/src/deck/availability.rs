//! Owned-minus-used bookkeeping.

use crate::models::OwnedCard;

use super::Composition;

/// Copies of `card` not yet placed in `composition`.
///
/// Not clamped: callers may probe speculatively, and a negative result means
/// the deck holds more copies than the inventory now reports.
pub fn available(card: &OwnedCard, composition: &Composition) -> i64 {
    i64::from(card.owned_count) - i64::from(composition.count_of(card))
}
