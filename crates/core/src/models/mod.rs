//! Shared domain models.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical catalog entry for a physical card printing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardIdentity {
    /// Stable catalog identifier.
    pub id: String,
    /// Display name (e.g. `Lightning Bolt`).
    pub name: String,
    /// Printed mana cost such as `{1}{R}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    /// Converted mana cost / mana value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmc: Option<f64>,
    /// Full type line, e.g. `Basic Land — Forest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
    /// Color identity as single-letter WUBRG codes.
    #[serde(default)]
    pub colors: Vec<String>,
    /// Printing rarity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    /// Set code of the printing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_code: Option<String>,
}

impl CardIdentity {
    /// Minimal identity with only an identifier and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mana_cost: None,
            cmc: None,
            type_line: None,
            colors: Vec::new(),
            rarity: None,
            set_code: None,
        }
    }
}

/// A card from the player's collection.
///
/// `identity` is absent when the catalog match failed; `fallback_name` is
/// always present and stands in for the identity in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCard {
    /// Catalog match, if one was found.
    #[serde(default)]
    pub identity: Option<CardIdentity>,
    /// Name recorded in the collection.
    pub fallback_name: String,
    /// Total copies owned.
    #[serde(default)]
    pub owned_count: u32,
}

impl OwnedCard {
    /// Owned card backed by a catalog identity.
    pub fn identified(identity: CardIdentity, owned_count: u32) -> Self {
        Self {
            fallback_name: identity.name.clone(),
            identity: Some(identity),
            owned_count,
        }
    }

    /// Owned card whose catalog lookup failed.
    pub fn unmatched(name: impl Into<String>, owned_count: u32) -> Self {
        Self {
            identity: None,
            fallback_name: name.into(),
            owned_count,
        }
    }

    /// Key used to match this card against deck entries and saved lines.
    pub fn key(&self) -> CardKey {
        match &self.identity {
            Some(identity) => CardKey::Id(identity.id.clone()),
            None => CardKey::name(&self.fallback_name),
        }
    }

    /// Name shown to the user.
    pub fn display_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(|identity| identity.name.as_str())
            .unwrap_or(&self.fallback_name)
    }

    /// Catalog identifier, when matched.
    pub fn card_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    /// Type line, when matched.
    pub fn type_line(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|identity| identity.type_line.as_deref())
    }

    /// Mana value, treating a missing value as zero.
    pub fn mana_value(&self) -> f64 {
        self.identity
            .as_ref()
            .and_then(|identity| identity.cmc)
            .unwrap_or(0.0)
    }

    /// Case-insensitive exact match against the display or fallback name.
    pub fn matches_name(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        self.fallback_name.to_lowercase() == needle
            || self
                .identity
                .as_ref()
                .map(|identity| identity.name.to_lowercase() == needle)
                .unwrap_or(false)
    }
}

/// Identity used to decide whether two cards occupy the same deck slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardKey {
    /// Catalog identifier.
    Id(String),
    /// Lowercased fallback name for cards without a catalog match.
    Name(String),
}

impl CardKey {
    /// Name key, normalised for case-insensitive comparison.
    pub fn name(name: &str) -> Self {
        CardKey::Name(name.trim().to_lowercase())
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKey::Id(id) => write!(f, "id:{id}"),
            CardKey::Name(name) => write!(f, "name:{name}"),
        }
    }
}

/// Constructed play format a deck is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Standard.
    #[default]
    Standard,
    /// Pioneer.
    Pioneer,
    /// Modern.
    Modern,
    /// Legacy.
    Legacy,
    /// Vintage.
    Vintage,
    /// Pauper.
    Pauper,
    /// Unsanctioned kitchen-table play.
    Casual,
}

impl Format {
    /// All supported formats.
    pub const ALL: [Format; 7] = [
        Format::Standard,
        Format::Pioneer,
        Format::Modern,
        Format::Legacy,
        Format::Vintage,
        Format::Pauper,
        Format::Casual,
    ];

    /// Lowercase identifier used in storage and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Standard => "standard",
            Format::Pioneer => "pioneer",
            Format::Modern => "modern",
            Format::Legacy => "legacy",
            Format::Vintage => "vintage",
            Format::Pauper => "pauper",
            Format::Casual => "casual",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a format name is not recognised.
#[derive(Debug, Error)]
#[error("unknown format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| format.as_str() == needle)
            .ok_or_else(|| UnknownFormat(value.to_string()))
    }
}
