//! # Favorites Controller
//!
//! Owns the in-memory favorite set. Toggles apply synchronously; the whole
//! updated set is then handed to a background writer that persists
//! snapshots one at a time, in toggle order. A failed write is logged and
//! the in-memory state is kept.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::store::FavoriteStore;
use crate::catalog::CharacterId;

/// Favorited character ids
pub type FavoriteSet = BTreeSet<CharacterId>;

enum WriterMessage {
    Persist(String),
    Flush(oneshot::Sender<()>),
}

/// Read the favorite set once. Missing, unreadable or corrupt data yields
/// an empty set.
pub async fn load_favorites(store: &dyn FavoriteStore, key: &str) -> FavoriteSet {
    let stored = match store.get(key).await {
        Ok(Some(stored)) => stored,
        Ok(None) => return FavoriteSet::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read favorites; starting empty");
            return FavoriteSet::new();
        }
    };

    match serde_json::from_str::<Vec<CharacterId>>(&stored) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored favorites are corrupt; starting empty");
            FavoriteSet::new()
        }
    }
}

fn spawn_writer(store: Arc<dyn FavoriteStore>, key: String) -> mpsc::UnboundedSender<WriterMessage> {
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterMessage>();

    tokio::spawn(async move {
        while let Some(message) = writer_rx.recv().await {
            match message {
                WriterMessage::Persist(value) => {
                    if let Err(e) = store.set(&key, &value).await {
                        tracing::warn!(error = %e, "Failed to persist favorites");
                    }
                }
                WriterMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });

    writer_tx
}

pub struct FavoritesController {
    favorites: Arc<FavoriteSet>,
    writer_tx: mpsc::UnboundedSender<WriterMessage>,
}

impl FavoritesController {
    /// Load the persisted set and start the writer
    pub async fn hydrate(store: Arc<dyn FavoriteStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let favorites = load_favorites(store.as_ref(), &key).await;
        tracing::info!(count = favorites.len(), "Favorites loaded");

        Self {
            favorites: Arc::new(favorites),
            writer_tx: spawn_writer(store, key),
        }
    }

    /// Current set (shared snapshot)
    pub fn favorites(&self) -> Arc<FavoriteSet> {
        Arc::clone(&self.favorites)
    }

    pub fn is_favorite(&self, id: CharacterId) -> bool {
        self.favorites.contains(&id)
    }

    /// Flip membership of `id` and queue the whole set for persistence.
    /// Returns whether `id` is now a favorite.
    pub fn toggle(&mut self, id: CharacterId) -> bool {
        let mut updated = FavoriteSet::clone(&self.favorites);
        let now_favorite = if updated.remove(&id) {
            false
        } else {
            updated.insert(id);
            true
        };
        self.favorites = Arc::new(updated);
        tracing::debug!(id, now_favorite, "Favorite toggled");

        match serde_json::to_string(self.favorites.as_ref()) {
            Ok(serialized) => {
                if self.writer_tx.send(WriterMessage::Persist(serialized)).is_err() {
                    tracing::warn!("Favorites writer stopped; change not persisted");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize favorites"),
        }

        now_favorite
    }

    /// Wait until every queued write has been attempted
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.writer_tx.send(WriterMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::store::MemoryStore;
    use crate::testing::RecordingStore;

    #[tokio::test]
    async fn test_toggle_twice_restores_and_persists_twice() {
        let store = Arc::new(RecordingStore::new());
        let mut controller = FavoritesController::hydrate(store.clone(), "favorites").await;
        let original = controller.favorites();

        assert!(controller.toggle(1017100));
        assert!(controller.is_favorite(1017100));
        assert!(!controller.toggle(1017100));
        controller.flush().await;

        assert_eq!(controller.favorites(), original);
        assert_eq!(
            store.writes(),
            vec![
                ("favorites".to_string(), "[1017100]".to_string()),
                ("favorites".to_string(), "[]".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_hydrate_from_store() {
        let store = Arc::new(MemoryStore::new());
        store.set("favorites", "[3,1,2]").await.unwrap();

        let controller = FavoritesController::hydrate(store, "favorites").await;
        let ids: Vec<_> = controller.favorites().iter().copied().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_corrupt_or_unreadable_yields_empty() {
        let store = MemoryStore::new();
        store.set("favorites", "{not json").await.unwrap();
        assert!(load_favorites(&store, "favorites").await.is_empty());

        let failing = RecordingStore::failing();
        assert!(load_favorites(&failing, "favorites").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_toggle() {
        let store = Arc::new(RecordingStore::failing());
        let mut controller = FavoritesController::hydrate(store.clone(), "favorites").await;

        assert!(controller.toggle(42));
        controller.flush().await;

        assert!(controller.is_favorite(42));
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_membership_independent_of_catalog() {
        let store = Arc::new(MemoryStore::new());
        let mut controller = FavoritesController::hydrate(store.clone(), "favorites").await;
        controller.toggle(7);
        controller.flush().await;

        // A fresh controller over the same store still sees it
        let reloaded = FavoritesController::hydrate(store, "favorites").await;
        assert!(reloaded.is_favorite(7));
    }
}
