//! The deck under construction and the operations that change it.
//!
//! Every mutator clamps instead of failing: a request for more copies than
//! the format allows or the player owns is reduced to the legal maximum.
//! Each operation returns the resulting count of the touched entry so callers
//! can report a requested/applied difference themselves.

use tracing::debug;

use crate::{
    models::{CardKey, Format, OwnedCard},
    rules,
};

/// One card slot in a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionEntry {
    /// The owned card occupying the slot.
    pub card: OwnedCard,
    /// Copies in the deck, always at least one.
    pub count: u32,
}

impl CompositionEntry {
    /// Matching key of the slot.
    pub fn key(&self) -> CardKey {
        self.card.key()
    }
}

/// A deck being built, plus its save associations.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    name: String,
    format: Format,
    remote_id: Option<String>,
    local_id: Option<String>,
    entries: Vec<CompositionEntry>,
}

impl Composition {
    /// Empty, unsaved deck.
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        Self {
            name: name.into(),
            format,
            remote_id: None,
            local_id: None,
            entries: Vec::new(),
        }
    }

    /// Deck name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format the deck is validated against.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Identifier assigned by the remote store, once created there.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Key of the local-only mirror record, used until a remote id exists.
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CompositionEntry] {
        &self.entries
    }

    /// Whether the deck has no cards.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry counts.
    pub fn total_count(&self) -> u32 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Number of distinct slots.
    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the deck meets its format's minimum size.
    pub fn is_legal(&self) -> bool {
        rules::is_legal(self)
    }

    /// Entry for `key`, if present.
    pub fn entry_for_key(&self, key: &CardKey) -> Option<&CompositionEntry> {
        self.position(key).map(|index| &self.entries[index])
    }

    /// Copies of `card` currently in the deck.
    pub fn count_of(&self, card: &OwnedCard) -> u32 {
        self.entry_for_key(&card.key())
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Add up to `requested` copies of `card`, clamped to the copy ceiling.
    ///
    /// A ceiling of zero (the card is no longer owned) leaves a new card out.
    /// An existing entry is dropped in that case, so no slot ever holds more
    /// copies than are owned.
    pub fn add(&mut self, card: &OwnedCard, requested: u32) -> u32 {
        let key = card.key();
        let ceiling = self.format.copy_ceiling(card);
        match self.position(&key) {
            Some(index) => {
                let entry = &mut self.entries[index];
                let count = entry.count.saturating_add(requested).min(ceiling);
                if count == 0 {
                    self.entries.remove(index);
                    return 0;
                }
                entry.count = count;
                debug!(card = %card.display_name(), requested, count, "Card count increased");
                count
            }
            None => {
                let count = requested.min(ceiling);
                if count == 0 {
                    return 0;
                }
                self.entries.push(CompositionEntry {
                    card: card.clone(),
                    count,
                });
                debug!(card = %card.display_name(), requested, count, "Card added");
                count
            }
        }
    }

    /// Remove up to `requested` copies of `card`, dropping the slot at zero.
    pub fn remove(&mut self, card: &OwnedCard, requested: u32) -> u32 {
        let Some(index) = self.position(&card.key()) else {
            return 0;
        };
        let remaining = self.entries[index].count.saturating_sub(requested);
        if remaining == 0 {
            self.entries.remove(index);
            debug!(card = %card.display_name(), "Card removed");
        } else {
            self.entries[index].count = remaining;
            debug!(card = %card.display_name(), requested, count = remaining, "Card count reduced");
        }
        remaining
    }

    /// Set the count of `card` directly. Zero removes the slot.
    pub fn set_count(&mut self, card: &OwnedCard, count: u32) -> u32 {
        let key = card.key();
        let clamped = count.min(self.format.copy_ceiling(card));
        match (self.position(&key), clamped) {
            (Some(index), 0) => {
                self.entries.remove(index);
            }
            (None, 0) => {}
            (Some(index), clamped) => self.entries[index].count = clamped,
            (None, clamped) => self.entries.push(CompositionEntry {
                card: card.clone(),
                count: clamped,
            }),
        }
        debug!(card = %card.display_name(), requested = count, count = clamped, "Card count set");
        clamped
    }

    /// Remove every card. Save associations are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop the remote and local save associations so the next save creates a new record.
    pub fn forget_saved_association(&mut self) {
        self.remote_id = None;
        self.local_id = None;
    }

    /// Rename the deck.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Switch format, re-clamping every entry under the new limits.
    pub fn set_format(&mut self, format: Format) {
        self.format = format;
        self.entries.retain_mut(|entry| {
            entry.count = entry.count.min(format.copy_ceiling(&entry.card));
            entry.count > 0
        });
    }

    pub(crate) fn assign_remote_id(&mut self, id: impl Into<String>) {
        self.remote_id = Some(id.into());
    }

    pub(crate) fn assign_local_id(&mut self, id: impl Into<String>) {
        self.local_id = Some(id.into());
    }

    pub(crate) fn clear_local_id(&mut self) {
        self.local_id = None;
    }

    pub(crate) fn clear_remote_id(&mut self) {
        self.remote_id = None;
    }

    fn position(&self, key: &CardKey) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key() == key)
    }
}
