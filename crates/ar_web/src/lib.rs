use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/v1/article", post(handlers::add_article))
        .route("/api/v1/articles", get(handlers::list_articles))
        .route("/api/v1/article/:article_id", put(handlers::update_article))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use ar_core::{Article, Error, Result};
    pub use crate::{create_app, AppState};
}
