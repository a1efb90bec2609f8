use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

#[derive(Debug)]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: String) -> InternalError {
        InternalError { message }
    }
}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<askama::Error> for InternalError {
    fn from(err: askama::Error) -> Self {
        InternalError::new(format!("Failed to render template: {err}"))
    }
}

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        // Logged here so that handlers can just use `?`.
        error!(
            "Error encountered while processing request: {}",
            self.message
        );
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
