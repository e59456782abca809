//! Format rules: copy limits and deck legality.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    deck::Composition,
    models::{Format, OwnedCard},
};

/// Copy limit applied to every non-basic card.
pub const DEFAULT_COPY_LIMIT: u32 = 4;
/// Effective copy limit for basic lands.
pub const BASIC_LAND_COPY_LIMIT: u32 = 999;
/// Minimum number of cards in a legal deck.
pub const MINIMUM_DECK_SIZE: u32 = 60;

static BASIC_LAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbasic\b.*\bland\b").expect("invalid basic land regex"));

/// Whether a type line carries the basic land supertype.
pub fn is_basic_land_type(type_line: &str) -> bool {
    BASIC_LAND_RE.is_match(type_line)
}

impl Format {
    /// Maximum legal copies of `card` in a deck of this format.
    ///
    /// The policy is currently identical for every format.
    pub fn max_copies(self, card: &OwnedCard) -> u32 {
        match card.type_line() {
            Some(type_line) if is_basic_land_type(type_line) => BASIC_LAND_COPY_LIMIT,
            _ => DEFAULT_COPY_LIMIT,
        }
    }

    /// Smallest card count at which a deck of this format is legal.
    pub fn minimum_deck_size(self) -> u32 {
        MINIMUM_DECK_SIZE
    }

    /// Largest count `card` can hold in a deck: the format limit capped by ownership.
    pub fn copy_ceiling(self, card: &OwnedCard) -> u32 {
        self.max_copies(card).min(card.owned_count)
    }
}

/// Whether `composition` meets its format's minimum size.
pub fn is_legal(composition: &Composition) -> bool {
    composition.total_count() >= composition.format().minimum_deck_size()
}
