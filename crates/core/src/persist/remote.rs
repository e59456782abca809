//! Remote deck store: the trait the reconciler talks to and its backends.

use std::{collections::HashMap, future::Future, time::Duration};

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::RemoteConfig, deck::CompositionEntry, models::Format};

use super::StoreError;

/// One card row as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLine {
    /// Catalog identifier; empty for cards without a catalog match.
    #[serde(default)]
    pub card_identifier: String,
    /// Card name, used as the fallback reference.
    pub card_name: String,
    /// Copies in the deck.
    pub quantity: u32,
    /// Printed mana cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    /// Mana value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmc: Option<f64>,
    /// Type line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
    /// Color identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    /// Rarity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    /// Set code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_code: Option<String>,
}

impl CardLine {
    /// Project a deck entry into a remote row.
    pub fn from_entry(entry: &CompositionEntry) -> Self {
        let identity = entry.card.identity.as_ref();
        Self {
            card_identifier: entry.card.card_id().unwrap_or_default().to_string(),
            card_name: entry.card.display_name().to_string(),
            quantity: entry.count,
            mana_cost: identity.and_then(|identity| identity.mana_cost.clone()),
            cmc: identity.and_then(|identity| identity.cmc),
            type_line: identity.and_then(|identity| identity.type_line.clone()),
            colors: identity
                .map(|identity| identity.colors.clone())
                .filter(|colors| !colors.is_empty()),
            rarity: identity.and_then(|identity| identity.rarity.clone()),
            set_code: identity.and_then(|identity| identity.set_code.clone()),
        }
    }

    /// Identifier, or `None` when the line was saved without a catalog match.
    pub fn identifier(&self) -> Option<&str> {
        Some(self.card_identifier.as_str()).filter(|id| !id.is_empty())
    }
}

/// Deck metadata written alongside the card list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckMetadata {
    /// Deck name.
    pub name: String,
    /// Deck format.
    pub format: Format,
}

/// Full remote deck as returned by a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDeck {
    /// Remote identifier.
    pub id: String,
    /// Deck name.
    pub name: String,
    /// Deck format.
    #[serde(default)]
    pub format: Format,
    /// Card rows.
    #[serde(default)]
    pub cards: Vec<CardLine>,
}

/// Persistent deck storage reachable over the network.
pub trait RemoteDeckStore: Send + Sync {
    /// Create an empty deck record and return its identifier.
    fn create(
        &self,
        metadata: &DeckMetadata,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Overwrite name and format of an existing record.
    fn update_metadata(
        &self,
        id: &str,
        metadata: &DeckMetadata,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the full card list of an existing record.
    fn replace_cards(
        &self,
        id: &str,
        cards: &[CardLine],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a record, failing with [`StoreError::NotFound`] when absent.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<RemoteDeck, StoreError>> + Send;
}

/// JSON-over-HTTP deck service client.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedDeck {
    id: String,
}

impl HttpRemoteStore {
    /// Build a client for `base_url` with the given request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Build a client from the `[remote]` configuration section.
    ///
    /// Returns `Ok(None)` when no base URL is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, StoreError> {
        let Some(base_url) = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            return Ok(None);
        };
        Self::new(
            base_url,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, id: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(deck_id = %id, status = status.as_u16(), "Remote deck request rejected");
        Err(status_error(id, status, body))
    }
}

/// Map a non-success HTTP status to a store error.
pub(crate) fn status_error(id: &str, status: StatusCode, body: String) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound(id.to_string());
    }
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.trim().to_string()
    };
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}

impl RemoteDeckStore for HttpRemoteStore {
    async fn create(&self, metadata: &DeckMetadata) -> Result<String, StoreError> {
        let request = self.client.post(self.url("decks")).json(metadata);
        let created: CreatedDeck = self.send("<new>", request).await?.json().await?;
        debug!(deck_id = %created.id, "Remote deck created");
        Ok(created.id)
    }

    async fn update_metadata(&self, id: &str, metadata: &DeckMetadata) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(self.url(&format!("decks/{id}")))
            .json(metadata);
        self.send(id, request).await?;
        Ok(())
    }

    async fn replace_cards(&self, id: &str, cards: &[CardLine]) -> Result<(), StoreError> {
        let request = self
            .client
            .put(self.url(&format!("decks/{id}/cards")))
            .json(cards);
        self.send(id, request).await?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<RemoteDeck, StoreError> {
        let request = self.client.get(self.url(&format!("decks/{id}")));
        let deck = self.send(id, request).await?.json().await?;
        Ok(deck)
    }
}

/// Remote backend used when no service is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct OfflineRemoteStore;

impl OfflineRemoteStore {
    fn unavailable() -> StoreError {
        StoreError::Unavailable("no remote deck service configured".to_string())
    }
}

impl RemoteDeckStore for OfflineRemoteStore {
    async fn create(&self, _metadata: &DeckMetadata) -> Result<String, StoreError> {
        Err(Self::unavailable())
    }

    async fn update_metadata(&self, _id: &str, _metadata: &DeckMetadata) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn replace_cards(&self, _id: &str, _cards: &[CardLine]) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn fetch(&self, _id: &str) -> Result<RemoteDeck, StoreError> {
        Err(Self::unavailable())
    }
}

/// In-process remote store with a switchable outage mode.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    inner: RwLock<MemoryRemoteInner>,
}

#[derive(Debug, Default)]
struct MemoryRemoteInner {
    decks: HashMap<String, RemoteDeck>,
    next_id: u64,
    offline: bool,
}

impl MemoryRemoteStore {
    /// Empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline, every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.write().offline = offline;
    }

    /// Stored copy of a deck, for inspection.
    pub fn deck(&self, id: &str) -> Option<RemoteDeck> {
        self.inner.read().decks.get(id).cloned()
    }

    /// Number of stored decks.
    pub fn len(&self) -> usize {
        self.inner.read().decks.len()
    }

    /// Whether no decks are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().decks.is_empty()
    }

    /// Drop a record out-of-band, as an administrator would.
    pub fn purge(&self, id: &str) -> Option<RemoteDeck> {
        self.inner.write().decks.remove(id)
    }

    fn with_online<T>(
        &self,
        f: impl FnOnce(&mut MemoryRemoteInner) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.write();
        if inner.offline {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        f(&mut inner)
    }
}

impl RemoteDeckStore for MemoryRemoteStore {
    async fn create(&self, metadata: &DeckMetadata) -> Result<String, StoreError> {
        self.with_online(|inner| {
            inner.next_id += 1;
            let id = format!("deck-{}", inner.next_id);
            inner.decks.insert(
                id.clone(),
                RemoteDeck {
                    id: id.clone(),
                    name: metadata.name.clone(),
                    format: metadata.format,
                    cards: Vec::new(),
                },
            );
            Ok(id)
        })
    }

    async fn update_metadata(&self, id: &str, metadata: &DeckMetadata) -> Result<(), StoreError> {
        self.with_online(|inner| {
            let deck = inner
                .decks
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            deck.name = metadata.name.clone();
            deck.format = metadata.format;
            Ok(())
        })
    }

    async fn replace_cards(&self, id: &str, cards: &[CardLine]) -> Result<(), StoreError> {
        self.with_online(|inner| {
            let deck = inner
                .decks
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            deck.cards = cards.to_vec();
            Ok(())
        })
    }

    async fn fetch(&self, id: &str) -> Result<RemoteDeck, StoreError> {
        self.with_online(|inner| {
            inner
                .decks
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardIdentity, OwnedCard};

    #[test]
    fn status_mapping() {
        assert!(status_error("d1", StatusCode::NOT_FOUND, String::new()).is_not_found());

        match status_error("d1", StatusCode::UNPROCESSABLE_ENTITY, " bad format ".into()) {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad format");
            }
            other => panic!("unexpected error {other:?}"),
        }

        match status_error("d1", StatusCode::BAD_GATEWAY, String::new()) {
            StoreError::Rejected { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn http_store_requires_base_url() -> anyhow::Result<()> {
        let mut config = RemoteConfig::default();
        assert!(HttpRemoteStore::from_config(&config)?.is_none());

        config.base_url = Some("https://decks.example.com/api/".to_string());
        let store = HttpRemoteStore::from_config(&config)?.expect("store expected");
        assert_eq!(store.url("decks/7"), "https://decks.example.com/api/decks/7");
        Ok(())
    }

    #[test]
    fn card_line_serialises_camel_case() -> anyhow::Result<()> {
        let mut identity = CardIdentity::new("bolt", "Lightning Bolt");
        identity.cmc = Some(1.0);
        identity.colors = vec!["R".to_string()];
        let entry = CompositionEntry {
            card: OwnedCard::identified(identity, 4),
            count: 3,
        };
        let line = CardLine::from_entry(&entry);
        let json = serde_json::to_value(&line)?;
        assert_eq!(json["cardIdentifier"], "bolt");
        assert_eq!(json["quantity"], 3);
        assert_eq!(json["colors"][0], "R");
        assert!(json.get("manaCost").is_none());

        let loose = CompositionEntry {
            card: OwnedCard::unmatched("Proxy", 1),
            count: 1,
        };
        assert_eq!(CardLine::from_entry(&loose).identifier(), None);
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_honours_outage() {
        let store = MemoryRemoteStore::new();
        let metadata = DeckMetadata {
            name: "Test".to_string(),
            format: Format::Modern,
        };
        let id = store.create(&metadata).await.expect("create");
        assert!(store.fetch(&id).await.is_ok());

        store.set_offline(true);
        assert!(matches!(
            store.fetch(&id).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.fetch("missing").await.unwrap_err().is_not_found());
    }
}
