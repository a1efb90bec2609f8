use log::warn;

use crate::database::{SqliteDatabaseError, Storage};

const FAVORITES_KEY: &str = "favorites";

/// Returns a new list with `place` added last. Duplicates are kept.
pub fn append(favorites: &[String], place: &str) -> Vec<String> {
    let mut favorites = favorites.to_vec();
    favorites.push(place.to_string());
    favorites
}

/// Favorite places persisted as one JSON array under a fixed storage key.
pub struct FavoritesStore<S: Storage> {
    storage: S,
}

impl<S: Storage> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        FavoritesStore { storage }
    }

    /// Read the stored list. Anything missing or unreadable yields an empty
    /// list.
    pub async fn load(&self) -> Vec<String> {
        let data = match self.storage.read(FAVORITES_KEY).await {
            Ok(Some(data)) => data,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Failed to read favorites, starting with an empty list: {err}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&data) {
            Ok(favorites) => favorites,
            Err(err) => {
                warn!("Ignoring malformed favorites {data:?}: {err}");
                Vec::new()
            }
        }
    }

    pub async fn save(&self, favorites: &[String]) -> Result<(), SqliteDatabaseError> {
        let data = serde_json::to_string(favorites)
            .expect("Serializing a list of strings should never fail");
        self.storage.write(FAVORITES_KEY, &data).await
    }
}
