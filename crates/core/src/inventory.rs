//! Read-only view over the player's card collection.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    deck::{available, Composition},
    models::OwnedCard,
};

/// Cards the player owns, as supplied by the collection source.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    cards: Vec<OwnedCard>,
}

/// An owned card together with its spare copies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCard {
    /// The owned card.
    pub card: OwnedCard,
    /// Copies not yet in the deck.
    pub available: i64,
}

impl Inventory {
    /// Wrap an existing card list.
    pub fn new(cards: Vec<OwnedCard>) -> Self {
        Self { cards }
    }

    /// Load an inventory from a JSON array of owned cards.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read inventory {}", path.display()))?;
        let cards: Vec<OwnedCard> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse inventory {}", path.display()))?;
        Ok(Self::new(cards))
    }

    /// All owned cards.
    pub fn cards(&self) -> &[OwnedCard] {
        &self.cards
    }

    /// Number of distinct owned cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the inventory is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card with the given catalog identifier.
    pub fn find_by_id(&self, card_id: &str) -> Option<&OwnedCard> {
        self.cards
            .iter()
            .find(|card| card.card_id() == Some(card_id))
    }

    /// Card whose display or fallback name equals `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&OwnedCard> {
        self.cards.iter().find(|card| card.matches_name(name))
    }

    /// Resolve a stored reference: identifier first, then name.
    pub fn resolve(&self, card_id: Option<&str>, name: &str) -> Option<&OwnedCard> {
        card_id
            .filter(|id| !id.is_empty())
            .and_then(|id| self.find_by_id(id))
            .or_else(|| self.find_by_name(name))
    }

    /// Cards with at least one copy left over after `composition`.
    pub fn available_for(&self, composition: &Composition) -> Vec<AvailableCard> {
        self.cards
            .iter()
            .filter_map(|card| {
                let spare = available(card, composition);
                (spare > 0).then(|| AvailableCard {
                    card: card.clone(),
                    available: spare,
                })
            })
            .collect()
    }
}

impl FromIterator<OwnedCard> for Inventory {
    fn from_iter<I: IntoIterator<Item = OwnedCard>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
