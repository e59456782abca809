use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use deckforge_core::{
    deck::{analytics::TOP_CURVE_BUCKET, mana_curve, summarize},
    persist::{FsDeckStore, LoadError, LoadedDeck, Reconciler},
    suggest::{apply_suggestions, Suggestion},
    Composition, Format, Inventory, OwnedCard,
};
use tracing::{info, warn};

use crate::backend::RemoteBackend;

type DeckReconciler = Reconciler<RemoteBackend, FsDeckStore>;

/// One CLI invocation: the reconciler, the inventory and defaults.
pub struct Session {
    reconciler: DeckReconciler,
    inventory: Inventory,
    default_format: Format,
    drop_missing: bool,
}

impl Session {
    pub fn new(
        reconciler: DeckReconciler,
        inventory_path: Option<&Path>,
        default_format: Format,
        drop_missing: bool,
    ) -> Result<Self> {
        let inventory = match inventory_path {
            Some(path) => Inventory::load(path)?,
            None => {
                warn!("No inventory configured; saved cards will not resolve");
                Inventory::default()
            }
        };
        info!(cards = inventory.len(), "Inventory loaded");
        Ok(Self {
            reconciler,
            inventory,
            default_format,
            drop_missing,
        })
    }

    pub fn list(&self) -> Result<()> {
        let decks = self.reconciler.list()?;
        if decks.is_empty() {
            println!("No saved decks.");
            return Ok(());
        }
        for deck in decks {
            let origin = if deck.synced { "remote" } else { "local" };
            println!(
                "{:<28} {:<24} {:<9} {:>3} cards  {} ({origin})",
                deck.id,
                deck.name,
                deck.format,
                deck.total_count,
                deck.updated_at.format("%Y-%m-%d %H:%M"),
            );
        }
        Ok(())
    }

    pub async fn create(&self, name: &str, format: Option<Format>) -> Result<()> {
        let mut deck = Composition::new(name, format.unwrap_or(self.default_format));
        self.save(&mut deck).await
    }

    pub async fn show(&self, id: &str, remote: bool) -> Result<()> {
        let loaded = if remote {
            let loaded = self.reconciler.load_remote(id, &self.inventory).await?;
            report_load(&loaded);
            loaded
        } else {
            self.open(id).await?
        };
        print_deck(&loaded.composition);
        Ok(())
    }

    pub async fn add(&self, id: &str, name: &str, count: u32) -> Result<()> {
        let mut deck = self.edit(id).await?;
        let card = self.card(name)?;
        let before = deck.count_of(&card);
        let after = deck.add(&card, count);
        report_change(&card, count, after.saturating_sub(before), "added");
        self.save(&mut deck).await
    }

    pub async fn remove(&self, id: &str, name: &str, count: u32) -> Result<()> {
        let mut deck = self.edit(id).await?;
        let card = self.card(name)?;
        let before = deck.count_of(&card);
        let after = deck.remove(&card, count);
        report_change(&card, count, before - after, "removed");
        self.save(&mut deck).await
    }

    pub async fn set(&self, id: &str, name: &str, count: u32) -> Result<()> {
        let mut deck = self.edit(id).await?;
        let card = self.card(name)?;
        let applied = deck.set_count(&card, count);
        if applied != count {
            println!(
                "Requested {count} × {}, set to {applied} (limit {} for this card)",
                card.display_name(),
                deck.format().copy_ceiling(&card)
            );
        }
        self.save(&mut deck).await
    }

    pub async fn clear(&self, id: &str) -> Result<()> {
        let mut deck = self.edit(id).await?;
        deck.clear();
        self.save(&mut deck).await
    }

    pub async fn suggest(&self, id: &str, file: &Path) -> Result<()> {
        let contents = fs::read_to_string(file)
            .with_context(|| format!("failed to read suggestions {}", file.display()))?;
        let suggestions: Vec<Suggestion> = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse suggestions {}", file.display()))?;

        let mut deck = self.edit(id).await?;
        let report = apply_suggestions(&mut deck, &self.inventory, &suggestions);
        for applied in &report.applied {
            println!(
                "{:>+3} {:<28} {} -> {}  {}",
                applied.requested, applied.card_name, applied.before, applied.after, applied.reason
            );
        }
        for missing in &report.unresolved {
            println!("  ? {:<28} not in inventory", missing.card_name);
        }
        self.save(&mut deck).await
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.reconciler.delete(id, None)?;
        println!("Deleted local copy of {id}.");
        Ok(())
    }

    /// Local copy first; the remote service when the local copy is missing.
    async fn open(&self, id: &str) -> Result<LoadedDeck> {
        let loaded = match self.reconciler.load_local(id, &self.inventory) {
            Ok(loaded) => loaded,
            Err(LoadError::Local { source, .. })
                if source.is_not_found() && self.reconciler.remote().is_online() =>
            {
                info!(deck_id = %id, "No local copy, fetching from remote");
                self.reconciler.load_remote(id, &self.inventory).await?
            }
            Err(err) => return Err(err.into()),
        };
        report_load(&loaded);
        Ok(loaded)
    }

    /// Open a deck that is about to be changed and saved back.
    async fn edit(&self, id: &str) -> Result<Composition> {
        let loaded = self.open(id).await?;
        if let Err(err) = ensure_complete(&loaded, self.drop_missing) {
            if self.inventory.is_empty() {
                return Err(err.context("the inventory is empty; pass --inventory"));
            }
            return Err(err);
        }
        Ok(loaded.composition)
    }

    fn card(&self, name: &str) -> Result<OwnedCard> {
        self.inventory
            .find_by_name(name)
            .or_else(|| self.inventory.find_by_id(name))
            .cloned()
            .ok_or_else(|| anyhow!("'{name}' is not in the inventory"))
    }

    async fn save(&self, deck: &mut Composition) -> Result<()> {
        match self.reconciler.save(deck).await {
            Ok(receipt) => {
                let verb = if receipt.created { "Created" } else { "Saved" };
                println!("{verb} {} ({} cards) as {}", deck.name(), deck.total_count(), receipt.id);
                if !receipt.mirror.is_written() {
                    println!("Warning: local copy not updated: {:?}", receipt.mirror);
                }
                Ok(())
            }
            Err(err) if err.mirror.is_written() => {
                if self.reconciler.remote().is_online() {
                    println!("Remote save failed ({}); kept locally as {}", err.source, err.local_id);
                } else {
                    println!("Saved {} ({} cards) locally as {}", deck.name(), deck.total_count(), err.local_id);
                }
                Ok(())
            }
            Err(err) => Err(err).context("deck could not be saved anywhere"),
        }
    }
}

fn report_load(loaded: &LoadedDeck) {
    for line in &loaded.unresolved {
        println!("  ! {} × {} no longer in inventory, dropped", line.quantity, line.name);
    }
    for line in &loaded.clamped {
        println!("  ! {}: saved {}, restored {}", line.name, line.requested, line.applied);
    }
}

/// Refuse to save over a stored deck that did not load in full.
fn ensure_complete(loaded: &LoadedDeck, drop_missing: bool) -> Result<()> {
    if drop_missing || loaded.is_complete() {
        return Ok(());
    }
    bail!(
        "{} would lose {} missing and {} reduced card line(s) if saved; \
         rerun with --drop-missing to save anyway",
        loaded.composition.name(),
        loaded.unresolved.len(),
        loaded.clamped.len()
    )
}

fn report_change(card: &OwnedCard, requested: u32, applied: u32, verb: &str) {
    if applied == requested {
        println!("{verb} {applied} × {}", card.display_name());
    } else {
        println!("Requested {requested} × {}, {verb} {applied}", card.display_name());
    }
}

fn curve_label(bucket: u8) -> String {
    if bucket == TOP_CURVE_BUCKET {
        format!("{bucket}+")
    } else {
        bucket.to_string()
    }
}

fn print_deck(deck: &Composition) {
    let association = deck
        .remote_id()
        .map(|id| format!("remote {id}"))
        .or_else(|| deck.local_id().map(|id| format!("local {id}")))
        .unwrap_or_else(|| "unsaved".to_string());
    println!("{} [{}] ({association})", deck.name(), deck.format());

    for entry in deck.entries() {
        let mana_cost = entry
            .card
            .identity
            .as_ref()
            .and_then(|identity| identity.mana_cost.as_deref())
            .unwrap_or("");
        println!(
            "{:>3} × {:<32} {:<12} {}",
            entry.count,
            entry.card.display_name(),
            mana_cost,
            entry.card.type_line().unwrap_or("")
        );
    }

    println!();
    for bucket in mana_curve(deck) {
        let label = curve_label(bucket.bucket);
        println!("{label:>3} | {:<40} {}", "#".repeat(bucket.count as usize), bucket.count);
    }

    let summary = summarize(deck);
    println!();
    println!(
        "{} cards ({} lands, {} spells), average mana value {:.2}",
        summary.total_count, summary.land_count, summary.non_land_count, summary.average_mana_value
    );
    let colors: Vec<String> = summary
        .colors
        .iter()
        .map(|(color, count)| format!("{color}:{count}"))
        .collect();
    println!("Colors: {}", colors.join(" "));
    let types: Vec<String> = summary
        .types
        .iter()
        .map(|(category, count)| format!("{category:?}:{count}"))
        .collect();
    println!("Types: {}", types.join(" "));
    if summary.legal {
        println!("Legal for {}.", deck.format());
    } else {
        println!("Not legal yet: {} more cards needed.", summary.cards_needed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use deckforge_core::{
        persist::{LocalDeckStore, OfflineRemoteStore, UnresolvedLine},
        CardIdentity,
    };
    use tempfile::tempdir;

    fn card_a() -> OwnedCard {
        OwnedCard::identified(CardIdentity::new("a", "Card A"), 4)
    }

    fn session(root: &Path, inventory: Inventory, drop_missing: bool) -> Session {
        Session {
            reconciler: Reconciler::new(
                RemoteBackend::Offline(OfflineRemoteStore),
                FsDeckStore::new(root),
            ),
            inventory,
            default_format: Format::Modern,
            drop_missing,
        }
    }

    #[test]
    fn top_curve_bucket_is_open_ended() {
        assert_eq!(curve_label(0), "0");
        assert_eq!(curve_label(TOP_CURVE_BUCKET - 1), "6");
        assert_eq!(curve_label(TOP_CURVE_BUCKET), "7+");
    }

    #[test]
    fn incomplete_loads_are_not_writable() {
        let complete = LoadedDeck {
            composition: Composition::new("Burn", Format::Modern),
            unresolved: Vec::new(),
            clamped: Vec::new(),
        };
        assert!(ensure_complete(&complete, false).is_ok());

        let mut partial = complete.clone();
        partial.unresolved.push(UnresolvedLine {
            card_identifier: Some("a".to_string()),
            name: "Card A".to_string(),
            quantity: 4,
        });
        assert!(ensure_complete(&partial, false).is_err());
        assert!(ensure_complete(&partial, true).is_ok());
    }

    #[tokio::test]
    async fn edits_without_inventory_leave_saved_deck_alone() -> Result<()> {
        let dir = tempdir()?;
        let owner = session(dir.path(), Inventory::new(vec![card_a()]), false);
        let mut deck = Composition::new("Burn", Format::Modern);
        deck.add(&card_a(), 4);
        owner.save(&mut deck).await?;
        let id = deck.local_id().expect("offline save keeps a local id").to_string();

        let suggestions = dir.path().join("suggestions.json");
        fs::write(&suggestions, "[]")?;

        let bare = session(dir.path(), Inventory::default(), false);
        assert!(bare.suggest(&id, &suggestions).await.is_err());
        assert!(bare.clear(&id).await.is_err());
        let record = owner.reconciler.local().get(&id)?.expect("record missing");
        assert_eq!(record.total_count, 4);

        let forced = session(dir.path(), Inventory::default(), true);
        forced.suggest(&id, &suggestions).await?;
        let record = owner.reconciler.local().get(&id)?.expect("record missing");
        assert_eq!(record.total_count, 0);
        Ok(())
    }
}
