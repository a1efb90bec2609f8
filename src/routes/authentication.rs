use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use log::{debug, info, warn};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl, basic::BasicClient,
};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::Provider;
use crate::models::session::{Session, complete_oauth2_login, start_oauth2_login};
use crate::models::user::User;
use crate::routes::index::render_main;
use crate::{app::AppState, error::InternalError};

pub const SESSION_COOKIE_NAME: &str = "session";

fn get_session_token(headers: &HeaderMap<HeaderValue>) -> Option<&str> {
    let Ok(cookies) = headers.get(COOKIE)?.to_str() else {
        warn!("Could not parse cookie header as string");
        return None;
    };
    cookies
        .split(';')
        .filter_map(|kv_string| kv_string.trim().split_once('='))
        .find_map(|(key, value)| (key == SESSION_COOKIE_NAME).then_some(value))
}

/// Looks up the session cookie and inserts `Option<Session>` into the request.
/// Unknown tokens count as logged out, and any dashboard left behind for them
/// is dropped.
pub async fn extract_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, InternalError> {
    let session = match get_session_token(request.headers()) {
        Some(session_token) => {
            let session =
                Session::fetch(state.database_connection.clone(), session_token).await?;
            if session.is_none() {
                state.dashboards.remove(session_token).await;
            }
            session
        }
        None => None,
    };
    match &session {
        Some(session) => debug!("User {} authenticated.", session.user.name),
        None => debug!("No user logged in."),
    }
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/authorized", get(authenticate_from_oauth2))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/redirect/{provider_name}", get(redirect_to_auth_provider))
        .with_state(state)
}

fn auth_provider(state: &AppState, provider_name: &str) -> Result<Provider, InternalError> {
    state
        .settings
        .auth_provider
        .get(provider_name)
        .cloned()
        .ok_or_else(|| {
            InternalError::new(format!("No provider with name {provider_name} configured"))
        })
}

fn session_cookie(token: &str) -> Result<HeaderValue, InternalError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; SameSite=Lax; HttpOnly; Secure; Path=/"
    ))
    .map_err(|err| InternalError::new(format!("Failed to build session cookie: {err}")))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, InternalError> {
    if let Some(session_token) = get_session_token(&headers) {
        state.dashboards.remove(session_token).await;
        if let Some(session) =
            Session::fetch(state.database_connection.clone(), session_token).await?
        {
            info!("Logging out {}", session.user.name);
            session.delete(state.database_connection.clone()).await?;
        }
    }
    let cookie = HeaderValue::from_static(
        "session=deleted; SameSite=Lax; HttpOnly; Secure; Path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT",
    );

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((headers, Redirect::to("/")).into_response())
}

// Basic OAuth2 flow
//
// 1. User is prompted to select oauth2 provider.
// 2. User is redirected to OAuth2 provider.
// 3. User comes back with an authorization code.
// 4. We use that code to request an authorization token from oauth2 provider.
// 5. We use the token to get the identity of the user from oauth2 provider.

#[derive(Template)]
#[template(path = "login.html")]
struct SelectAuthProvider {
    provider_names: Vec<String>,
}

// 1. User is prompted to select oauth2 provider.
async fn login(State(state): State<AppState>) -> Result<impl IntoResponse, InternalError> {
    let content = SelectAuthProvider {
        provider_names: state.settings.provider_names(),
    }
    .render()?;
    Ok(Html(render_main(None, content)?))
}

// 2. We redirect the user to the auth provider where they authorize our app.
async fn redirect_to_auth_provider(
    Path(provider): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, InternalError> {
    let auth_provider = auth_provider(&state, &provider)?;
    let auth_uri = AuthUrl::new(auth_provider.auth_uri.clone())
        .map_err(|err| InternalError::new(format!("Bad auth_uri for {provider}: {err}")))?;
    let redirect_uri = RedirectUrl::new(auth_provider.redirect_uri.clone())
        .map_err(|err| InternalError::new(format!("Bad redirect_uri for {provider}: {err}")))?;
    let client = BasicClient::new(ClientId::new(auth_provider.client_id.clone()))
        .set_auth_uri(auth_uri)
        .set_redirect_uri(redirect_uri);
    let (url, token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(auth_provider.scopes.iter().cloned().map(Scope::new))
        .url();

    // The CSRF token tells us we originated the request when the user comes back.
    start_oauth2_login(state.database_connection.clone(), &provider, &token).await?;

    info!("Sending user to {provider} to authenticate");

    Ok(Redirect::to(url.as_ref()))
}

#[derive(Debug, Deserialize)]
struct AuthRequest {
    code: String,
    // We store the CSRF token in the state.
    state: String,
}

// 3. User comes back with an authorization code.
async fn authenticate_from_oauth2(
    Query(query): Query<AuthRequest>,
    State(state): State<AppState>,
) -> Result<Response, InternalError> {
    debug!("Coming back from OAuth2 provider");
    let provider_name =
        match complete_oauth2_login(state.database_connection.clone(), &query.state).await {
            Ok(provider) => provider,
            Err(err) => {
                debug!("Failed to validate CSRF token from oauth2 provider: {err}");
                return Ok(StatusCode::UNAUTHORIZED.into_response());
            }
        };

    // 4. We use that code to request an authorization token from oauth2 provider.
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|err| InternalError::new(format!("Failed to build http client: {err}")))?;

    let provider = auth_provider(&state, &provider_name)?;
    let redirect_uri = RedirectUrl::new(provider.redirect_uri.clone()).map_err(|err| {
        InternalError::new(format!("Bad redirect_uri for {provider_name}: {err}"))
    })?;
    let token_uri = TokenUrl::new(provider.token_uri.clone())
        .map_err(|err| InternalError::new(format!("Bad token_uri for {provider_name}: {err}")))?;
    let client = BasicClient::new(ClientId::new(provider.client_id.clone()))
        .set_client_secret(ClientSecret::new(provider.client_secret.clone()))
        .set_redirect_uri(redirect_uri)
        .set_token_uri(token_uri);
    let token = match client
        .exchange_code(AuthorizationCode::new(query.code.clone()))
        .request_async(&http_client)
        .await
    {
        Ok(token) => token,
        Err(err) => {
            debug!("Failed to get token from {provider_name}: {err}");
            // Old or bogus requests to this endpoint end up here.
            return Ok(StatusCode::UNAUTHORIZED.into_response());
        }
    };

    debug!("Code authenticated");

    // 5. We use the token to get the identity of the user from oauth2 provider.
    let user_data: Map<String, Value> = http_client
        .get(&provider.user_uri)
        .header(USER_AGENT, "weatherdash/0.1.0")
        .bearer_auth(token.access_token().secret())
        .send()
        .await
        .map_err(|err| {
            InternalError::new(format!("Failed to fetch user from {provider_name}: {err}"))
        })?
        .json::<Map<String, Value>>()
        .await
        .map_err(|err| {
            InternalError::new(format!(
                "Failed to deserialize user from {provider_name}: {err}"
            ))
        })?;

    let user_id = match user_data.get("id").or_else(|| user_data.get("sub")) {
        Some(Value::Number(user_id)) => user_id.to_string(),
        Some(Value::String(user_id)) => user_id.clone(),
        None => {
            return Err(InternalError::new(format!(
                "No id field in user object returned from {}",
                &provider.user_uri
            )));
        }
        _ => {
            return Err(InternalError::new(format!(
                "Id field in user object returned from {} had unexpected type",
                &provider.user_uri
            )));
        }
    };

    let user = match User::fetch_with_external_id(
        state.database_connection.clone(),
        &provider_name,
        &user_id,
    )
    .await?
    {
        Some(user) => user,
        None => {
            debug!("Create new user");
            let Some(username) = user_data
                .get(&provider.display_name_field)
                .and_then(|username| username.as_str())
            else {
                return Err(InternalError::new(format!(
                    "No {} field in user object returned from {}",
                    &provider.display_name_field, &provider.user_uri
                )));
            };
            User::create_from_external(
                state.database_connection.clone(),
                username.to_string(),
                provider_name.clone(),
                &user_id,
            )
            .await?
        }
    };

    let session = Session::create(state.database_connection.clone(), &user).await?;
    info!("{} logged in with {provider_name}", user.name);

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(&session.token)?);
    Ok((headers, Redirect::to("/")).into_response())
}
