use ar_sync::ArticleCoordinator;
use std::sync::Arc;

pub struct AppState {
    pub coordinator: Arc<ArticleCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<ArticleCoordinator>) -> Self {
        Self { coordinator }
    }
}
