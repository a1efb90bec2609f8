use askama::Template;
use axum::{
    Extension,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::InternalError;
use crate::models::session::Session;
use crate::models::user::User;
use crate::routes::dashboard::{UnitQuery, render_dashboard};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    name: String,
    content: String,
}

#[derive(Template)]
#[template(path = "login_prompt.html")]
struct LoginPromptTemplate;

/// Shows the dashboard to logged in users and a login prompt to everyone
/// else.
pub async fn get_index(
    Extension(session): Extension<Option<Session>>,
    State(state): State<AppState>,
    Query(query): Query<UnitQuery>,
) -> Result<Response, InternalError> {
    let Some(session) = session else {
        let content = LoginPromptTemplate.render()?;
        return Ok(Html(render_main(None, content)?).into_response());
    };
    let content = render_dashboard(&state, &session, query.unit).await?;
    Ok(Html(render_main(Some(&session.user), content)?).into_response())
}

pub fn render_main(user: Option<&User>, content: String) -> Result<String, InternalError> {
    let page = IndexTemplate {
        name: match user {
            Some(User { name, provider, .. }) => format!("{} ({})", name, provider),
            None => String::new(),
        },
        content,
    }
    .render()?;
    Ok(page)
}
