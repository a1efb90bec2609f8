use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::database::{SqliteDatabaseError, Storage};
use crate::models::favorites::{FavoritesStore, append};
use crate::models::location::LocationState;
use crate::weather::WeatherSource;

/// Transient dashboard state of one login session.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub location: LocationState,
    pub favorites: Vec<String>,
}

pub type DashboardHandle = Arc<Mutex<Dashboard>>;

/// Dashboards keyed by session token.
#[derive(Clone, Default)]
pub struct DashboardCollection {
    dashboards: Arc<RwLock<HashMap<String, DashboardHandle>>>,
}

impl DashboardCollection {
    pub async fn get(&self, session_token: &str) -> Option<DashboardHandle> {
        self.dashboards.read().await.get(session_token).cloned()
    }

    /// Return the dashboard of a session, creating it on first use. Favorites
    /// are read from storage only when the dashboard is created.
    pub async fn mount<S: Storage>(
        &self,
        session_token: &str,
        favorites_store: &FavoritesStore<S>,
    ) -> DashboardHandle {
        if let Some(dashboard) = self.get(session_token).await {
            return dashboard;
        }
        let favorites = favorites_store.load().await;
        debug!("Mounting dashboard with {} favorites", favorites.len());
        self.dashboards
            .write()
            .await
            .entry(session_token.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Dashboard {
                    location: LocationState::default(),
                    favorites,
                }))
            })
            .clone()
    }

    pub async fn remove(&self, session_token: &str) {
        if self.dashboards.write().await.remove(session_token).is_some() {
            debug!("Dropped dashboard of ended session");
        }
    }
}

/// Commit a new place and start retrieving its weather in the background.
///
/// Returns the handle of the retrieval task, or `None` if the place was blank
/// and nothing was started.
pub async fn request_place(
    dashboard: DashboardHandle,
    weather: Arc<dyn WeatherSource>,
    name: &str,
) -> Option<JoinHandle<()>> {
    let (generation, place) = {
        let mut state = dashboard.lock().await;
        let generation = state.location.set_place(name)?;
        (generation, state.location.place()?.to_string())
    };
    info!("Retrieving weather for '{place}'");
    Some(tokio::spawn(async move {
        let result = weather.fetch(&place).await;
        dashboard.lock().await.location.complete(generation, result);
    }))
}

/// Append the current place to the favorites and persist the whole list.
/// Returns `false` if there is no current place.
pub async fn add_favorite<S: Storage>(
    dashboard: &DashboardHandle,
    favorites_store: &FavoritesStore<S>,
) -> Result<bool, SqliteDatabaseError> {
    let mut state = dashboard.lock().await;
    let Some(place) = state.location.place() else {
        return Ok(false);
    };
    let favorites = append(&state.favorites, place);
    favorites_store.save(&favorites).await?;
    state.favorites = favorites;
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::InMemoryStorage;
    use crate::weather::{
        Conditions, WeatherError, WeatherReport, WeatherSnapshot,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers slowly for places starting with "Slow".
    struct ScriptedWeather;

    #[async_trait]
    impl WeatherSource for ScriptedWeather {
        async fn fetch(&self, place: &str) -> Result<WeatherReport, WeatherError> {
            if place.starts_with("Slow") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(WeatherReport {
                place: place.to_string(),
                snapshot: WeatherSnapshot {
                    wind_speed: 1.0,
                    humidity: 40.0,
                    temperature: 10.0,
                    heat_index: 10.0,
                    conditions: Conditions::Cloudy,
                },
                forecast: vec![],
            })
        }
    }

    #[tokio::test]
    async fn mount_loads_favorites_once() {
        let storage = InMemoryStorage::default();
        let store = FavoritesStore::new(storage.clone());
        store.save(&["Paris".to_string()]).await.unwrap();

        let dashboards = DashboardCollection::default();
        let dashboard = dashboards.mount("token", &store).await;
        assert_eq!(dashboard.lock().await.favorites, vec!["Paris"]);

        // Later changes to storage are not picked up by a mounted dashboard.
        store.save(&[]).await.unwrap();
        let dashboard = dashboards.mount("token", &store).await;
        assert_eq!(dashboard.lock().await.favorites, vec!["Paris"]);

        dashboards.remove("token").await;
        assert!(dashboards.get("token").await.is_none());
    }

    #[tokio::test]
    async fn blank_place_starts_no_retrieval() {
        let dashboard = DashboardHandle::default();
        assert!(
            request_place(dashboard.clone(), Arc::new(ScriptedWeather), "  ")
                .await
                .is_none()
        );
        assert!(dashboard.lock().await.location.place().is_none());
    }

    #[tokio::test]
    async fn slow_earlier_search_does_not_overwrite_later_one() {
        let dashboard = DashboardHandle::default();
        let weather: Arc<dyn WeatherSource> = Arc::new(ScriptedWeather);
        let slow = request_place(dashboard.clone(), weather.clone(), "Slowtown")
            .await
            .unwrap();
        let fast = request_place(dashboard.clone(), weather, "Paris")
            .await
            .unwrap();
        fast.await.unwrap();
        slow.await.unwrap();

        let state = dashboard.lock().await;
        assert_eq!(state.location.place(), Some("Paris"));
        assert_eq!(
            state.location.report().map(|r| r.place.as_str()),
            Some("Paris")
        );
    }

    #[tokio::test]
    async fn add_favorite_persists_full_list() {
        let storage = InMemoryStorage::default();
        let store = FavoritesStore::new(storage.clone());
        let dashboard = DashboardHandle::default();

        assert!(!add_favorite(&dashboard, &store).await.unwrap());

        dashboard.lock().await.location.set_place("Paris");
        assert!(add_favorite(&dashboard, &store).await.unwrap());
        assert!(add_favorite(&dashboard, &store).await.unwrap());

        let in_memory = dashboard.lock().await.favorites.clone();
        assert_eq!(in_memory, vec!["Paris", "Paris"]);
        assert_eq!(FavoritesStore::new(storage).load().await, in_memory);
    }
}
