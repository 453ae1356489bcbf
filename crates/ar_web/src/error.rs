use ar_core::{Error, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by the handlers. Store failures name the subsystem but
/// keep the backend's own message out of the response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Contention(_) => StatusCode::CONFLICT,
            Error::ConsistencyGap { .. } => StatusCode::BAD_GATEWAY,
            Error::Store { source: StoreError::Unavailable(_), .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            Error::Store { origin, source: StoreError::Unavailable(_) } => format!("{} store unavailable", origin),
            Error::Store { origin, .. } => format!("{} store request failed", origin),
            Error::ConsistencyGap { id, .. } => format!("Article {} was saved but is not indexed yet", id),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self.0);
        }

        let mut body = json!({
            "error": self.message(),
            "kind": self.0.kind(),
        });
        if let Some(origin) = self.0.origin() {
            body["origin"] = json!(origin);
        }
        match &self.0 {
            Error::ConsistencyGap { id, .. } | Error::NotFound(id) | Error::Contention(id) => {
                body["article_id"] = json!(id);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
