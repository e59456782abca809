//! Keeps a composition in step with the remote store and the local mirror.
//!
//! Saves write remote first and then always mirror locally, whatever the
//! remote outcome. Loads rebuild a composition from stored card references,
//! resolving each against the current inventory and reporting what no
//! longer resolves.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    deck::Composition,
    inventory::Inventory,
    models::Format,
};

use super::{
    local::{LocalDeckStore, SavedCardLine, SavedDeckRecord, SavedDeckSummary},
    remote::{CardLine, DeckMetadata, RemoteDeckStore},
    StoreError,
};

/// Outcome of the best-effort local mirror write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Record written.
    Written,
    /// Write failed with the given message.
    Failed(String),
}

impl MirrorStatus {
    /// Whether the local record was written.
    pub fn is_written(&self) -> bool {
        matches!(self, MirrorStatus::Written)
    }
}

/// Successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Remote identifier of the deck.
    pub id: String,
    /// Whether this save created the remote record.
    pub created: bool,
    /// Local mirror outcome.
    pub mirror: MirrorStatus,
}

/// Save whose remote half failed. The local mirror may still hold the work.
#[derive(Debug, Error)]
#[error("failed to save deck to the remote store: {source}")]
pub struct SaveError {
    /// Key the local mirror was written under.
    pub local_id: String,
    /// Local mirror outcome.
    pub mirror: MirrorStatus,
    /// Remote failure.
    #[source]
    pub source: StoreError,
}

/// Failure to load a saved deck.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The remote record could not be fetched.
    #[error("failed to fetch remote deck {id}: {source}")]
    Remote {
        /// Requested id.
        id: String,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
    /// The local record could not be read.
    #[error("failed to read local deck {id}: {source}")]
    Local {
        /// Requested id.
        id: String,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
}

/// Stored card row that no longer matches anything in the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLine {
    /// Stored identifier, if any.
    pub card_identifier: Option<String>,
    /// Stored name.
    pub name: String,
    /// Stored count.
    pub quantity: u32,
}

/// Stored row that resolved but could not be restored in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClampedLine {
    /// Display name of the resolved card.
    pub name: String,
    /// Stored count.
    pub requested: u32,
    /// Count the deck now holds.
    pub applied: u32,
}

/// A rebuilt composition plus what could not be restored.
#[derive(Debug, Clone)]
pub struct LoadedDeck {
    /// Reconstructed deck, associated with the loaded id.
    pub composition: Composition,
    /// Rows dropped because they no longer resolve.
    pub unresolved: Vec<UnresolvedLine>,
    /// Rows reduced by ownership or format limits.
    pub clamped: Vec<ClampedLine>,
}

impl LoadedDeck {
    /// Number of dropped rows.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    /// Whether every stored row came back at its stored count.
    ///
    /// Saving an incomplete deck overwrites the stored copy with the reduced one.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.clamped.is_empty()
    }
}

/// Dual-target persistence for compositions.
pub struct Reconciler<R, L> {
    remote: R,
    local: L,
}

impl<R, L> Reconciler<R, L>
where
    R: RemoteDeckStore,
    L: LocalDeckStore,
{
    /// Wire the reconciler to its stores.
    pub fn new(remote: R, local: L) -> Self {
        Self { remote, local }
    }

    /// Remote store in use.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Local store in use.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// Save `composition` remotely, then mirror it locally.
    ///
    /// The deck contents are captured before the first remote call. A
    /// successful create stores the new id on `composition`.
    pub async fn save(&self, composition: &mut Composition) -> Result<SaveReceipt, SaveError> {
        let metadata = DeckMetadata {
            name: composition.name().to_string(),
            format: composition.format(),
        };
        let lines: Vec<CardLine> = composition
            .entries()
            .iter()
            .map(CardLine::from_entry)
            .collect();
        let saved_lines: Vec<SavedCardLine> = lines
            .iter()
            .map(|line| SavedCardLine {
                card_identifier: line.identifier().map(str::to_string),
                fallback_name: line.card_name.clone(),
                count: line.quantity,
            })
            .collect();
        let total_count = composition.total_count();

        let outcome = self.write_remote(composition, &metadata, &lines).await;

        let (mirror_id, synced) = match composition.remote_id() {
            Some(id) => (id.to_string(), true),
            None => {
                let id = composition
                    .local_id()
                    .map(str::to_string)
                    .unwrap_or_else(new_local_id);
                composition.assign_local_id(id.clone());
                (id, false)
            }
        };

        let mirror = self.write_mirror(&mirror_id, synced, &metadata, saved_lines, total_count);

        if synced {
            if let Some(stale) = composition.local_id().map(str::to_string) {
                if stale != mirror_id {
                    match self.local.delete(&stale) {
                        Ok(()) => debug!(local_id = %stale, deck_id = %mirror_id, "Local-only record migrated"),
                        Err(err) if err.is_not_found() => {}
                        Err(err) => warn!(local_id = %stale, "Failed to remove migrated local record: {err}"),
                    }
                }
                composition.clear_local_id();
            }
        }

        match outcome {
            Ok(created) => {
                info!(deck_id = %mirror_id, cards = total_count, created, "Deck saved");
                Ok(SaveReceipt {
                    id: mirror_id,
                    created,
                    mirror,
                })
            }
            Err(source) => {
                warn!(local_id = %mirror_id, mirrored = mirror.is_written(), "Remote deck save failed: {source}");
                Err(SaveError {
                    local_id: mirror_id,
                    mirror,
                    source,
                })
            }
        }
    }

    /// Fetch a deck from the remote store and rebuild it against `inventory`.
    pub async fn load_remote(&self, id: &str, inventory: &Inventory) -> Result<LoadedDeck, LoadError> {
        let deck = self
            .remote
            .fetch(id)
            .await
            .map_err(|source| LoadError::Remote {
                id: id.to_string(),
                source,
            })?;
        let rows = deck
            .cards
            .iter()
            .map(|line| (line.identifier(), line.card_name.as_str(), line.quantity));
        let mut loaded = rebuild(&deck.name, deck.format, rows, inventory);
        loaded.composition.assign_remote_id(id);
        info!(deck_id = %id, unresolved = loaded.unresolved_count(), "Remote deck loaded");
        Ok(loaded)
    }

    /// Read a deck from the local store and rebuild it against `inventory`.
    pub fn load_local(&self, id: &str, inventory: &Inventory) -> Result<LoadedDeck, LoadError> {
        let record = self
            .local
            .get(id)
            .and_then(|record| record.ok_or_else(|| StoreError::NotFound(id.to_string())))
            .map_err(|source| LoadError::Local {
                id: id.to_string(),
                source,
            })?;
        let rows = record.cards.iter().map(|line| {
            (
                line.card_identifier.as_deref(),
                line.fallback_name.as_str(),
                line.count,
            )
        });
        let mut loaded = rebuild(&record.name, record.format, rows, inventory);
        if record.synced {
            loaded.composition.assign_remote_id(id);
        } else {
            loaded.composition.assign_local_id(id);
        }
        info!(deck_id = %id, unresolved = loaded.unresolved_count(), "Local deck loaded");
        Ok(loaded)
    }

    /// Delete the local record under `id`.
    ///
    /// When `active` is associated with `id` that association is dropped,
    /// so its next save creates a fresh remote record.
    pub fn delete(&self, id: &str, active: Option<&mut Composition>) -> Result<(), StoreError> {
        if let Some(composition) = active {
            if composition.remote_id() == Some(id) {
                composition.clear_remote_id();
            }
            if composition.local_id() == Some(id) {
                composition.clear_local_id();
            }
        }
        self.local.delete(id)?;
        info!(deck_id = %id, "Saved deck deleted");
        Ok(())
    }

    /// Saved decks, most recently updated first.
    pub fn list(&self) -> Result<Vec<SavedDeckSummary>, StoreError> {
        let mut summaries: Vec<SavedDeckSummary> =
            self.local.list()?.iter().map(SavedDeckSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn write_remote(
        &self,
        composition: &mut Composition,
        metadata: &DeckMetadata,
        lines: &[CardLine],
    ) -> Result<bool, StoreError> {
        if let Some(id) = composition.remote_id().map(str::to_string) {
            self.remote.update_metadata(&id, metadata).await?;
            self.remote.replace_cards(&id, lines).await?;
            return Ok(false);
        }

        let id = self.remote.create(metadata).await?;
        composition.assign_remote_id(id.clone());
        self.remote.replace_cards(&id, lines).await?;
        Ok(true)
    }

    fn write_mirror(
        &self,
        id: &str,
        synced: bool,
        metadata: &DeckMetadata,
        cards: Vec<SavedCardLine>,
        total_count: u32,
    ) -> MirrorStatus {
        let now = Utc::now();
        let created_at = match self.local.get(id) {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => now,
            Err(err) => {
                warn!(deck_id = %id, "Existing local record unreadable, overwriting: {err}");
                now
            }
        };
        let record = SavedDeckRecord {
            id: id.to_string(),
            name: metadata.name.clone(),
            format: metadata.format,
            cards,
            total_count,
            created_at,
            updated_at: now,
            synced,
        };
        match self.local.put(&record) {
            Ok(()) => MirrorStatus::Written,
            Err(err) => {
                warn!(deck_id = %id, "Local deck mirror failed: {err}");
                MirrorStatus::Failed(err.to_string())
            }
        }
    }
}

fn rebuild<'a>(
    name: &str,
    format: Format,
    rows: impl Iterator<Item = (Option<&'a str>, &'a str, u32)>,
    inventory: &Inventory,
) -> LoadedDeck {
    let mut composition = Composition::new(name, format);
    let mut unresolved = Vec::new();
    let mut clamped = Vec::new();

    for (card_id, card_name, quantity) in rows {
        if quantity == 0 {
            continue;
        }
        let Some(card) = inventory.resolve(card_id, card_name) else {
            warn!(card = %card_name, "Saved card no longer in inventory");
            unresolved.push(UnresolvedLine {
                card_identifier: card_id.map(str::to_string),
                name: card_name.to_string(),
                quantity,
            });
            continue;
        };
        let before = composition.count_of(card);
        let applied = composition.add(card, quantity).saturating_sub(before);
        if applied < quantity {
            clamped.push(ClampedLine {
                name: card.display_name().to_string(),
                requested: quantity,
                applied,
            });
        }
    }

    LoadedDeck {
        composition,
        unresolved,
        clamped,
    }
}

fn new_local_id() -> String {
    format!("local-{}", Utc::now().format("%Y%m%d%H%M%S%6f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CardIdentity, OwnedCard},
        persist::{local::MemoryDeckStore, remote::MemoryRemoteStore},
    };
    use anyhow::Result;

    fn card(id: &str, name: &str, owned: u32) -> OwnedCard {
        let mut identity = CardIdentity::new(id, name);
        identity.type_line = Some("Instant".to_string());
        identity.cmc = Some(1.0);
        OwnedCard::identified(identity, owned)
    }

    fn card_a() -> OwnedCard {
        card("a", "Card A", 4)
    }

    fn card_b() -> OwnedCard {
        card("b", "Card B", 3)
    }

    fn reconciler() -> Reconciler<MemoryRemoteStore, MemoryDeckStore> {
        Reconciler::new(MemoryRemoteStore::new(), MemoryDeckStore::new())
    }

    fn sample_deck() -> Composition {
        let mut deck = Composition::new("Test Deck", Format::Modern);
        deck.add(&card_a(), 4);
        deck.add(&card_b(), 2);
        deck
    }

    fn counts(deck: &Composition) -> Vec<(String, u32)> {
        let mut counts: Vec<_> = deck
            .entries()
            .iter()
            .map(|entry| (entry.card.display_name().to_string(), entry.count))
            .collect();
        counts.sort();
        counts
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<()> {
        let reconciler = reconciler();
        let inventory = Inventory::new(vec![card_a(), card_b()]);
        let mut deck = sample_deck();

        let receipt = reconciler.save(&mut deck).await?;
        assert!(receipt.created);
        assert!(receipt.mirror.is_written());
        assert_eq!(deck.remote_id(), Some(receipt.id.as_str()));

        let remote = reconciler.load_remote(&receipt.id, &inventory).await?;
        assert_eq!(remote.unresolved_count(), 0);
        assert_eq!(counts(&remote.composition), counts(&deck));
        assert_eq!(remote.composition.remote_id(), Some(receipt.id.as_str()));

        let local = reconciler.load_local(&receipt.id, &inventory)?;
        assert_eq!(local.unresolved_count(), 0);
        assert_eq!(counts(&local.composition), counts(&deck));
        assert_eq!(local.composition.remote_id(), Some(receipt.id.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn missing_inventory_cards_are_reported() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = sample_deck();
        let receipt = reconciler.save(&mut deck).await?;

        let shrunk = Inventory::new(vec![card_a()]);
        let loaded = reconciler.load_remote(&receipt.id, &shrunk).await?;
        assert_eq!(counts(&loaded.composition), vec![("Card A".to_string(), 4)]);
        assert_eq!(loaded.unresolved_count(), 1);
        assert_eq!(loaded.unresolved[0].name, "Card B");
        assert_eq!(loaded.unresolved[0].quantity, 2);

        let local = reconciler.load_local(&receipt.id, &shrunk)?;
        assert_eq!(local.unresolved_count(), 1);
        assert!(!local.is_complete());

        let full = Inventory::new(vec![card_a(), card_b()]);
        assert!(reconciler.load_local(&receipt.id, &full)?.is_complete());
        Ok(())
    }

    #[tokio::test]
    async fn empty_inventory_load_keeps_stored_copy_intact() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = Composition::new("Single", Format::Modern);
        deck.add(&card_a(), 4);
        let receipt = reconciler.save(&mut deck).await?;

        let loaded = reconciler.load_local(&receipt.id, &Inventory::default())?;
        assert!(loaded.composition.is_empty());
        assert_eq!(loaded.unresolved_count(), 1);
        assert!(!loaded.is_complete());

        // Loading alone never writes back.
        let record = reconciler.local().get(&receipt.id)?.expect("mirror missing");
        assert_eq!(record.total_count, 4);
        let remote = reconciler.remote().deck(&receipt.id).expect("remote missing");
        assert_eq!(remote.cards.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn load_resolves_by_name_and_clamps() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = sample_deck();
        let receipt = reconciler.save(&mut deck).await?;

        // Reprinted under a new id, and fewer copies owned now.
        let inventory = Inventory::new(vec![card("a2", "Card A", 2), card_b()]);
        let loaded = reconciler.load_remote(&receipt.id, &inventory).await?;
        assert_eq!(loaded.unresolved_count(), 0);
        assert_eq!(
            loaded.clamped,
            vec![ClampedLine {
                name: "Card A".to_string(),
                requested: 4,
                applied: 2,
            }]
        );
        assert_eq!(loaded.composition.total_count(), 4);
        assert!(!loaded.is_complete());
        Ok(())
    }

    #[tokio::test]
    async fn save_is_idempotent() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = sample_deck();

        let first = reconciler.save(&mut deck).await?;
        let record_before = reconciler.local().get(&first.id)?.expect("mirror missing");
        let remote_before = reconciler.remote().deck(&first.id);

        let second = reconciler.save(&mut deck).await?;
        assert_eq!(second.id, first.id);
        assert!(!second.created);
        assert_eq!(reconciler.remote().len(), 1);
        assert_eq!(reconciler.remote().deck(&first.id), remote_before);

        let record_after = reconciler.local().get(&first.id)?.expect("mirror missing");
        assert_eq!(record_after.cards, record_before.cards);
        assert_eq!(record_after.total_count, 6);
        assert_eq!(record_after.created_at, record_before.created_at);
        assert!(record_after.updated_at >= record_before.updated_at);
        assert_eq!(reconciler.list()?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn remote_outage_falls_back_to_local_mirror() -> Result<()> {
        let reconciler = reconciler();
        let inventory = Inventory::new(vec![card_a(), card_b()]);
        let mut deck = sample_deck();

        reconciler.remote().set_offline(true);
        let err = reconciler.save(&mut deck).await.unwrap_err();
        assert!(matches!(err.source, StoreError::Unavailable(_)));
        assert!(err.mirror.is_written());
        assert_eq!(deck.remote_id(), None);
        assert_eq!(deck.local_id(), Some(err.local_id.as_str()));

        // A second offline save overwrites the same local record.
        let again = reconciler.save(&mut deck).await.unwrap_err();
        assert_eq!(again.local_id, err.local_id);
        assert_eq!(reconciler.list()?.len(), 1);

        let offline_copy = reconciler.load_local(&err.local_id, &inventory)?;
        assert_eq!(counts(&offline_copy.composition), counts(&deck));
        assert_eq!(offline_copy.composition.local_id(), Some(err.local_id.as_str()));

        // Once the remote is back, the local-only record migrates to the remote id.
        reconciler.remote().set_offline(false);
        let receipt = reconciler.save(&mut deck).await?;
        assert!(receipt.created);
        assert_eq!(deck.local_id(), None);
        let saved = reconciler.list()?;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, receipt.id);
        assert!(saved[0].synced);
        Ok(())
    }

    #[tokio::test]
    async fn missing_remote_record_is_a_hard_load_failure() {
        let reconciler = reconciler();
        let inventory = Inventory::default();
        let err = reconciler
            .load_remote("deck-404", &inventory)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Remote {
                source: StoreError::NotFound(_),
                ..
            }
        ));
        assert!(matches!(
            reconciler.load_local("deck-404", &inventory),
            Err(LoadError::Local { .. })
        ));
    }

    #[tokio::test]
    async fn delete_clears_active_association() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = sample_deck();
        let first = reconciler.save(&mut deck).await?;

        reconciler.delete(&first.id, Some(&mut deck))?;
        assert_eq!(deck.remote_id(), None);
        assert!(reconciler.list()?.is_empty());
        assert!(reconciler.remote().deck(&first.id).is_some());

        let second = reconciler.save(&mut deck).await?;
        assert!(second.created);
        assert_ne!(second.id, first.id);
        assert_eq!(reconciler.remote().len(), 2);

        assert!(reconciler.delete(&first.id, None).unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn update_against_purged_remote_still_mirrors() -> Result<()> {
        let reconciler = reconciler();
        let mut deck = sample_deck();
        let receipt = reconciler.save(&mut deck).await?;
        reconciler.remote().purge(&receipt.id);

        deck.remove(&card_b(), 1);
        let err = reconciler.save(&mut deck).await.unwrap_err();
        assert!(err.source.is_not_found());
        assert_eq!(err.local_id, receipt.id);
        let record = reconciler.local().get(&receipt.id)?.expect("mirror missing");
        assert_eq!(record.total_count, 5);
        Ok(())
    }
}
