//! Deck persistence: remote store, local fallback store and the reconciler
//! that keeps them in step with a composition.

mod error;
/// Local fallback storage.
pub mod local;
/// Dual-target save and load.
pub mod reconciler;
/// Remote deck service.
pub mod remote;

pub use error::StoreError;
pub use local::{
    FsDeckStore, LocalDeckStore, MemoryDeckStore, SavedCardLine, SavedDeckRecord,
    SavedDeckSummary,
};
pub use reconciler::{
    ClampedLine, LoadError, LoadedDeck, MirrorStatus, Reconciler, SaveError, SaveReceipt,
    UnresolvedLine,
};
pub use remote::{
    CardLine, DeckMetadata, HttpRemoteStore, MemoryRemoteStore, OfflineRemoteStore, RemoteDeck,
    RemoteDeckStore,
};
