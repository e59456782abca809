//! Aggregates derived from a composition. Recomputed on every call.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Composition;

/// Highest mana curve bucket; it also collects everything above.
pub const TOP_CURVE_BUCKET: u8 = 7;

/// Cards at one point of the mana curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurveBucket {
    /// Mana value, with `7` meaning seven or more.
    pub bucket: u8,
    /// Copies at that mana value.
    pub count: u32,
}

/// Broad card category used for the type breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CardCategory {
    /// Creature.
    Creature,
    /// Planeswalker.
    Planeswalker,
    /// Instant.
    Instant,
    /// Sorcery.
    Sorcery,
    /// Artifact.
    Artifact,
    /// Enchantment.
    Enchantment,
    /// Battle.
    Battle,
    /// Land.
    Land,
    /// Unmatched or unrecognised type line.
    Other,
}

impl CardCategory {
    const ORDER: [(CardCategory, &'static str); 8] = [
        (CardCategory::Creature, "creature"),
        (CardCategory::Planeswalker, "planeswalker"),
        (CardCategory::Instant, "instant"),
        (CardCategory::Sorcery, "sorcery"),
        (CardCategory::Artifact, "artifact"),
        (CardCategory::Enchantment, "enchantment"),
        (CardCategory::Battle, "battle"),
        (CardCategory::Land, "land"),
    ];

    /// Primary category of a type line; the first match in display order wins.
    pub fn from_type_line(type_line: Option<&str>) -> Self {
        let Some(type_line) = type_line else {
            return CardCategory::Other;
        };
        let lowered = type_line.to_lowercase();
        Self::ORDER
            .iter()
            .find(|(_, word)| lowered.contains(word))
            .map(|(category, _)| *category)
            .unwrap_or(CardCategory::Other)
    }
}

/// Overview numbers for a deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    /// Copies in the deck.
    pub total_count: u32,
    /// Distinct slots.
    pub unique_count: usize,
    /// Copies whose type line mentions `Land`.
    pub land_count: u32,
    /// Everything else.
    pub non_land_count: u32,
    /// Weighted over non-land cards only.
    pub average_mana_value: f64,
    /// Copies per color letter; colorless cards count under `C`.
    pub colors: BTreeMap<String, u32>,
    /// Copies per primary category.
    pub types: BTreeMap<CardCategory, u32>,
    /// Whether the deck meets its format minimum.
    pub legal: bool,
    /// Cards still missing to reach the format minimum.
    pub cards_needed: u32,
}

/// Mana curve with one bucket per value from 0 to 7+.
pub fn mana_curve(composition: &Composition) -> Vec<CurveBucket> {
    let mut curve: Vec<CurveBucket> = (0..=TOP_CURVE_BUCKET)
        .map(|bucket| CurveBucket { bucket, count: 0 })
        .collect();
    for entry in composition.entries() {
        let index = bucket_for(entry.card.mana_value());
        curve[index].count += entry.count;
    }
    curve
}

/// Full summary: curve-independent counts, colors and categories.
pub fn summarize(composition: &Composition) -> DeckSummary {
    let mut land_count = 0;
    let mut non_land_count = 0;
    let mut mana_total = 0.0;
    let mut colors = BTreeMap::new();
    let mut types = BTreeMap::new();

    for entry in composition.entries() {
        let category = CardCategory::from_type_line(entry.card.type_line());
        *types.entry(category).or_insert(0) += entry.count;

        let is_land = entry
            .card
            .type_line()
            .map(|line| line.to_lowercase().contains("land"))
            .unwrap_or(false);
        if is_land {
            land_count += entry.count;
        } else {
            non_land_count += entry.count;
            mana_total += entry.card.mana_value() * f64::from(entry.count);
        }

        let card_colors = entry
            .card
            .identity
            .as_ref()
            .map(|identity| identity.colors.as_slice())
            .unwrap_or_default();
        if card_colors.is_empty() {
            *colors.entry("C".to_string()).or_insert(0) += entry.count;
        }
        for color in card_colors {
            *colors.entry(color.to_uppercase()).or_insert(0) += entry.count;
        }
    }

    let total_count = composition.total_count();
    let minimum = composition.format().minimum_deck_size();
    DeckSummary {
        total_count,
        unique_count: composition.unique_count(),
        land_count,
        non_land_count,
        average_mana_value: if non_land_count == 0 {
            0.0
        } else {
            mana_total / f64::from(non_land_count)
        },
        colors,
        types,
        legal: composition.is_legal(),
        cards_needed: minimum.saturating_sub(total_count),
    }
}

fn bucket_for(mana_value: f64) -> usize {
    if !mana_value.is_finite() || mana_value <= 0.0 {
        return 0;
    }
    (mana_value.floor() as usize).min(TOP_CURVE_BUCKET as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardIdentity, Format, OwnedCard};

    fn card(id: &str, cmc: Option<f64>, type_line: &str, colors: &[&str]) -> OwnedCard {
        let mut identity = CardIdentity::new(id, id);
        identity.cmc = cmc;
        identity.type_line = Some(type_line.to_string());
        identity.colors = colors.iter().map(|c| c.to_string()).collect();
        OwnedCard::identified(identity, 60)
    }

    fn sample_deck() -> Composition {
        let mut deck = Composition::new("Curve", Format::Modern);
        deck.add(&card("bolt", Some(1.0), "Instant", &["R"]), 4);
        deck.add(&card("helix", Some(2.0), "Instant", &["R", "W"]), 3);
        deck.add(&card("titan", Some(6.0), "Creature — Giant", &["R"]), 2);
        deck.add(&card("emrakul", Some(15.0), "Legendary Creature — Eldrazi", &[]), 1);
        deck.add(&card("ulamog", Some(7.0), "Legendary Creature — Eldrazi", &[]), 1);
        deck.add(&card("mountain", Some(0.0), "Basic Land — Mountain", &[]), 20);
        deck.add(&OwnedCard::unmatched("Mystery", 2), 2);
        deck
    }

    #[test]
    fn curve_buckets_high_costs_together() {
        let deck = sample_deck();
        let curve = mana_curve(&deck);
        assert_eq!(curve.len(), 8);
        assert_eq!(curve[0].count, 22);
        assert_eq!(curve[1].count, 4);
        assert_eq!(curve[2].count, 3);
        assert_eq!(curve[6].count, 2);
        assert_eq!(curve[7].count, 2);
        assert_eq!(
            curve.iter().map(|bucket| bucket.count).sum::<u32>(),
            deck.total_count()
        );
    }

    #[test]
    fn empty_deck_has_zero_curve() {
        let deck = Composition::new("Empty", Format::Standard);
        let curve = mana_curve(&deck);
        assert!(curve.iter().all(|bucket| bucket.count == 0));
        let summary = summarize(&deck);
        assert!(!summary.legal);
        assert_eq!(summary.cards_needed, 60);
        assert_eq!(summary.average_mana_value, 0.0);
    }

    #[test]
    fn summary_counts_colors_and_types() {
        let summary = summarize(&sample_deck());
        assert_eq!(summary.total_count, 33);
        assert_eq!(summary.land_count, 20);
        assert_eq!(summary.non_land_count, 13);
        assert_eq!(summary.colors.get("R"), Some(&9));
        assert_eq!(summary.colors.get("W"), Some(&3));
        assert_eq!(summary.colors.get("C"), Some(&24));
        assert_eq!(summary.types.get(&CardCategory::Instant), Some(&7));
        assert_eq!(summary.types.get(&CardCategory::Creature), Some(&4));
        assert_eq!(summary.types.get(&CardCategory::Land), Some(&20));
        assert_eq!(summary.types.get(&CardCategory::Other), Some(&2));
        assert_eq!(summary.cards_needed, 27);

        let expected = (4.0 + 6.0 + 12.0 + 15.0 + 7.0) / 13.0;
        assert!((summary.average_mana_value - expected).abs() < 1e-9);
    }

    #[test]
    fn artifact_creatures_count_as_creatures() {
        assert_eq!(
            CardCategory::from_type_line(Some("Artifact Creature — Golem")),
            CardCategory::Creature
        );
        assert_eq!(
            CardCategory::from_type_line(Some("Artifact Land")),
            CardCategory::Artifact
        );
        assert_eq!(CardCategory::from_type_line(None), CardCategory::Other);
    }
}
