use deckforge_core::{
    config::RemoteConfig,
    persist::{
        CardLine, DeckMetadata, HttpRemoteStore, OfflineRemoteStore, RemoteDeck, RemoteDeckStore,
        StoreError,
    },
};
use tracing::info;

/// Remote store chosen from configuration: HTTP when a URL is set, offline otherwise.
pub enum RemoteBackend {
    Http(HttpRemoteStore),
    Offline(OfflineRemoteStore),
}

impl RemoteBackend {
    pub fn from_config(config: &RemoteConfig) -> Result<Self, StoreError> {
        match HttpRemoteStore::from_config(config)? {
            Some(store) => Ok(RemoteBackend::Http(store)),
            None => {
                info!("No remote deck service configured; decks are kept locally");
                Ok(RemoteBackend::Offline(OfflineRemoteStore))
            }
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, RemoteBackend::Http(_))
    }
}

impl RemoteDeckStore for RemoteBackend {
    async fn create(&self, metadata: &DeckMetadata) -> Result<String, StoreError> {
        match self {
            RemoteBackend::Http(store) => store.create(metadata).await,
            RemoteBackend::Offline(store) => store.create(metadata).await,
        }
    }

    async fn update_metadata(&self, id: &str, metadata: &DeckMetadata) -> Result<(), StoreError> {
        match self {
            RemoteBackend::Http(store) => store.update_metadata(id, metadata).await,
            RemoteBackend::Offline(store) => store.update_metadata(id, metadata).await,
        }
    }

    async fn replace_cards(&self, id: &str, cards: &[CardLine]) -> Result<(), StoreError> {
        match self {
            RemoteBackend::Http(store) => store.replace_cards(id, cards).await,
            RemoteBackend::Offline(store) => store.replace_cards(id, cards).await,
        }
    }

    async fn fetch(&self, id: &str) -> Result<RemoteDeck, StoreError> {
        match self {
            RemoteBackend::Http(store) => store.fetch(id).await,
            RemoteBackend::Offline(store) => store.fetch(id).await,
        }
    }
}
