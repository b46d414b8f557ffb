use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    model::Location,
    store::{KeyValueStore, load_json, save_json},
};

pub const LOCATIONS_KEY: &str = "weather-app-locations";
pub const MAX_FAVORITES: usize = 3;

/// Location shown before the user picks one.
pub fn default_location() -> Location {
    Location::new("Rio Paranaíba", Some("Minas Gerais".into()), "BR", -19.1851, -46.2481)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationSelection {
    pub current_location: Option<Location>,
    pub favorites: Vec<Location>,
}

/// Current selection plus up to [`MAX_FAVORITES`] favorites.
///
/// Mutations hold the write lock until the document is persisted, so
/// concurrent favorite edits are applied one after another.
#[derive(Debug)]
pub struct LocationState {
    store: Arc<dyn KeyValueStore>,
    selection: RwLock<LocationSelection>,
}

impl LocationState {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let selection = match load_json::<LocationSelection>(store.as_ref(), LOCATIONS_KEY).await {
            Ok(found) => found.unwrap_or_default(),
            Err(StoreError::Json { source, .. }) => {
                tracing::warn!(error = %source, "stored locations are corrupt, starting empty");
                LocationSelection::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self { store, selection: RwLock::new(selection) })
    }

    pub async fn snapshot(&self) -> LocationSelection {
        self.selection.read().await.clone()
    }

    pub async fn current(&self) -> Option<Location> {
        self.selection.read().await.current_location.clone()
    }

    pub async fn favorites(&self) -> Vec<Location> {
        self.selection.read().await.favorites.clone()
    }

    pub async fn is_favorite(&self, id: &str) -> bool {
        self.selection.read().await.favorites.iter().any(|f| f.id == id)
    }

    pub async fn set_current(&self, location: Location) -> Result<(), StoreError> {
        self.update(|s| {
            s.current_location = Some(location);
            true
        })
        .await
        .map(|_| ())
    }

    /// Selects [`default_location`] when nothing is selected yet and returns
    /// the current location.
    pub async fn initialize(&self) -> Result<Location, StoreError> {
        let fallback = default_location();
        let mut selected = fallback.clone();
        self.update(|s| {
            if let Some(existing) = &s.current_location {
                selected = existing.clone();
                return false;
            }
            s.current_location = Some(fallback);
            true
        })
        .await?;
        Ok(selected)
    }

    /// Returns `false` without touching storage when the location is already a
    /// favorite or the list is full.
    pub async fn add_favorite(&self, location: Location) -> Result<bool, StoreError> {
        self.update(|s| {
            if s.favorites.len() >= MAX_FAVORITES || s.favorites.iter().any(|f| f.id == location.id) {
                return false;
            }
            s.favorites.push(location);
            true
        })
        .await
    }

    /// Returns `false` when no favorite has this id.
    pub async fn remove_favorite(&self, id: &str) -> Result<bool, StoreError> {
        self.update(|s| {
            let before = s.favorites.len();
            s.favorites.retain(|f| f.id != id);
            s.favorites.len() != before
        })
        .await
    }

    /// Applies `change` to a copy; persists and commits only if it reports a change.
    async fn update(
        &self,
        change: impl FnOnce(&mut LocationSelection) -> bool,
    ) -> Result<bool, StoreError> {
        let mut selection = self.selection.write().await;
        let mut next = selection.clone();
        if !change(&mut next) {
            return Ok(false);
        }

        save_json(self.store.as_ref(), LOCATIONS_KEY, &next).await?;
        *selection = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryStore, testing::FailingStore};

    fn city(n: u32) -> Location {
        Location::new(format!("City {n}"), None, "BR", f64::from(n), f64::from(n))
    }

    async fn state() -> LocationState {
        LocationState::load(Arc::new(MemoryStore::new())).await.unwrap()
    }

    #[tokio::test]
    async fn fourth_favorite_is_a_no_op() {
        let state = state().await;
        for n in 1..=3 {
            assert!(state.add_favorite(city(n)).await.unwrap());
        }

        let before = state.favorites().await;
        assert!(!state.add_favorite(city(4)).await.unwrap());

        let after = state.favorites().await;
        assert_eq!(after.len(), MAX_FAVORITES);
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn duplicate_favorite_is_a_no_op() {
        let state = state().await;
        assert!(state.add_favorite(city(1)).await.unwrap());
        assert!(!state.add_favorite(city(1)).await.unwrap());
        assert_eq!(state.favorites().await.len(), 1);
    }

    #[tokio::test]
    async fn removing_absent_favorite_is_a_no_op() {
        let state = state().await;
        state.add_favorite(city(1)).await.unwrap();

        assert!(!state.remove_favorite("nope").await.unwrap());
        assert!(state.remove_favorite(&city(1).id).await.unwrap());
        assert!(!state.is_favorite(&city(1).id).await);
    }

    #[tokio::test]
    async fn selection_persists_across_reloads() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let state = LocationState::load(store.clone()).await.unwrap();
        state.set_current(city(7)).await.unwrap();
        state.add_favorite(city(8)).await.unwrap();

        let reloaded = LocationState::load(store).await.unwrap();
        assert_eq!(reloaded.current().await, Some(city(7)));
        assert!(reloaded.is_favorite(&city(8).id).await);
    }

    #[tokio::test]
    async fn initialize_only_fills_an_empty_selection() {
        let state = state().await;
        assert_eq!(state.initialize().await.unwrap(), default_location());

        state.set_current(city(2)).await.unwrap();
        assert_eq!(state.initialize().await.unwrap(), city(2));
        assert_eq!(state.current().await, Some(city(2)));
    }

    #[tokio::test]
    async fn concurrent_adds_respect_the_bound() {
        let state = Arc::new(state().await);
        let mut tasks = tokio::task::JoinSet::new();
        for n in 1..=6 {
            let state = state.clone();
            tasks.spawn(async move { state.add_favorite(city(n)).await });
        }

        let mut added = 0;
        while let Some(res) = tasks.join_next().await {
            if res.unwrap().unwrap() {
                added += 1;
            }
        }

        assert_eq!(added, MAX_FAVORITES);
        assert_eq!(state.favorites().await.len(), MAX_FAVORITES);
    }

    #[tokio::test]
    async fn failed_write_is_not_visible() {
        let state = LocationState::load(Arc::new(FailingStore::failing_all())).await.unwrap();

        assert!(state.add_favorite(city(1)).await.is_err());
        assert!(state.favorites().await.is_empty());
        assert!(state.set_current(city(1)).await.is_err());
        assert_eq!(state.current().await, None);
    }
}
