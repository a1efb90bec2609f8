use axum::middleware;
use axum::{Router, routing::get};
use log::info;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{Settings, WeatherProviderKind, WeatherSettings};
use crate::models::dashboard::DashboardCollection;
use crate::routes::authentication::{self, extract_session};
use crate::routes::{dashboard, index};
use crate::weather::open_meteo::OpenMeteoClient;
use crate::weather::{WeatherError, WeatherSource, fake};

// Anything that goes in here must be a handle or pointer that can be cloned.
// The underlying state itself should be shared.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<Mutex<Connection>>,
    pub dashboards: DashboardCollection,
    pub weather: Arc<dyn WeatherSource>,
    pub settings: Arc<Settings>,
}

pub fn create_weather_source(
    settings: &WeatherSettings,
) -> Result<Arc<dyn WeatherSource>, WeatherError> {
    Ok(match settings.provider {
        WeatherProviderKind::OpenMeteo => {
            info!("Using Open-Meteo at {}", settings.forecast_url);
            Arc::new(OpenMeteoClient::new(settings.clone())?)
        }
        WeatherProviderKind::Fake => {
            info!("Using fake weather");
            Arc::new(fake::create())
        }
    })
}

pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(index::get_index).with_state(state.clone()))
        .nest("/auth", authentication::routes(state.clone()))
        .merge(dashboard::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            extract_session,
        ));

    let assets_path = "assets";
    log::debug!("serving assets from {}", assets_path);
    let assets_service = ServeDir::new(assets_path);
    app = app.fallback_service(assets_service);
    app
}

#[cfg(test)]
pub fn create_test_state(weather: Arc<dyn WeatherSource>) -> AppState {
    use crate::database::create_sqlite_database_in_memory;

    AppState {
        database_connection: Arc::new(Mutex::new(
            create_sqlite_database_in_memory().expect("failed to create test database"),
        )),
        dashboards: DashboardCollection::default(),
        weather,
        settings: Arc::new(Settings::default()),
    }
}
