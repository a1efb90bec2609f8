use askama::Template;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form};
use axum::{
    Router,
    extract::{Query, State},
    routing::{get, post},
};
use log::info;
use serde::Deserialize;

use crate::app::AppState;
use crate::database::UserStorage;
use crate::error::InternalError;
use crate::models::dashboard::{DashboardHandle, add_favorite, request_place};
use crate::models::favorites::FavoritesStore;
use crate::models::session::Session;
use crate::models::units::DisplayUnit;
use crate::routes::index::render_main;
use crate::view::{CurrentCard, DashboardView, ForecastCard};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/weather/place", post(set_place))
        .route("/favorites", post(create_favorite))
        .with_state(state)
}

#[derive(Deserialize, Debug, Default)]
pub struct UnitQuery {
    #[serde(default)]
    pub unit: DisplayUnit,
}

#[derive(Deserialize, Debug)]
struct PlaceForm {
    place: String,
    #[serde(default)]
    unit: DisplayUnit,
}

#[derive(Deserialize, Debug)]
struct FavoriteForm {
    #[serde(default)]
    unit: DisplayUnit,
}

#[derive(Template)]
#[template(path = "weather.html")]
struct WeatherTemplate {
    unit: DisplayUnit,
    toggled: DisplayUnit,
    place: String,
    current: Option<CurrentCard>,
    forecast: Vec<ForecastCard>,
    chart_svg: Option<String>,
    favorites: Vec<String>,
    background: String,
    pending: bool,
    error: Option<String>,
}

impl From<DashboardView> for WeatherTemplate {
    fn from(view: DashboardView) -> Self {
        WeatherTemplate {
            chart_svg: view.chart_svg(),
            unit: view.unit,
            toggled: view.unit.toggled(),
            place: view.place.unwrap_or_default(),
            current: view.current,
            forecast: view.forecast,
            favorites: view.favorites,
            background: view.background,
            pending: view.pending,
            error: view.error,
        }
    }
}

fn favorites_store(state: &AppState, session: &Session) -> FavoritesStore<UserStorage> {
    FavoritesStore::new(UserStorage::new(
        state.database_connection.clone(),
        session.user.id,
    ))
}

async fn mount(state: &AppState, session: &Session) -> DashboardHandle {
    state
        .dashboards
        .mount(&session.token, &favorites_store(state, session))
        .await
}

async fn render(dashboard: &DashboardHandle, unit: DisplayUnit) -> Result<String, InternalError> {
    let view = {
        let dashboard = dashboard.lock().await;
        DashboardView::build(&dashboard.location, &dashboard.favorites, unit)
    };
    Ok(WeatherTemplate::from(view).render()?)
}

/// The dashboard of a session, rendered in the given unit.
pub async fn render_dashboard(
    state: &AppState,
    session: &Session,
    unit: DisplayUnit,
) -> Result<String, InternalError> {
    let dashboard = mount(state, session).await;
    render(&dashboard, unit).await
}

// htmx only wants the fragment, plain requests get the whole page.
fn respond(
    headers: &HeaderMap,
    session: &Session,
    content: String,
) -> Result<Response, InternalError> {
    let content = if headers.get("hx-request").is_some() {
        content
    } else {
        render_main(Some(&session.user), content)?
    };
    Ok(Html(content).into_response())
}

async fn get_weather(
    Extension(session): Extension<Option<Session>>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(query): Query<UnitQuery>,
) -> Result<Response, InternalError> {
    let Some(session) = session else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };
    let content = render_dashboard(&state, &session, query.unit).await?;
    respond(&headers, &session, content)
}

async fn set_place(
    Extension(session): Extension<Option<Session>>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(form): Form<PlaceForm>,
) -> Result<Response, InternalError> {
    let Some(session) = session else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };
    let dashboard = mount(&state, &session).await;
    // The retrieval runs on its own; the page polls until it is done.
    let _retrieval = request_place(dashboard.clone(), state.weather.clone(), &form.place).await;
    let content = render(&dashboard, form.unit).await?;
    respond(&headers, &session, content)
}

async fn create_favorite(
    Extension(session): Extension<Option<Session>>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Form(form): Form<FavoriteForm>,
) -> Result<Response, InternalError> {
    let Some(session) = session else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };
    let dashboard = mount(&state, &session).await;
    let added = add_favorite(&dashboard, &favorites_store(&state, &session))
        .await
        .map_err(|err| InternalError::new(format!("Failed to save favorites: {err}")))?;
    if added {
        info!("{} added a favorite", session.user.name);
    }
    let content = render(&dashboard, form.unit).await?;
    respond(&headers, &session, content)
}
