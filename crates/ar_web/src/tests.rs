use ar_core::{Article, ArticleId, ArticlePage, IndexStore, ListQuery, StoreError, StoreResult};
use ar_storage::{MemoryIndexStore, MemoryLockStore, MemoryRecordStore};
use ar_sync::{ArticleCoordinator, CoordinatorConfig};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{create_app, AppState};

struct DownIndexStore;

#[async_trait]
impl IndexStore for DownIndexStore {
    async fn upsert(&self, _article: &Article) -> StoreResult<()> {
        Err(StoreError::Unavailable("index article: index unreachable".to_string()))
    }

    async fn update(&self, _article: &Article) -> StoreResult<()> {
        Err(StoreError::Unavailable("update indexed article: index unreachable".to_string()))
    }

    async fn search(&self, _query: &ListQuery) -> StoreResult<ArticlePage> {
        Err(StoreError::Unavailable("search articles: index unreachable".to_string()))
    }

    async fn get(&self, _id: ArticleId) -> StoreResult<Option<Article>> {
        Ok(None)
    }
}

/// Accepts documents but fails every patch with a query error.
struct PatchFailingIndexStore(MemoryIndexStore);

#[async_trait]
impl IndexStore for PatchFailingIndexStore {
    async fn upsert(&self, article: &Article) -> StoreResult<()> {
        self.0.upsert(article).await
    }

    async fn update(&self, _article: &Article) -> StoreResult<()> {
        Err(StoreError::Query("update indexed article: version conflict".to_string()))
    }

    async fn search(&self, query: &ListQuery) -> StoreResult<ArticlePage> {
        self.0.search(query).await
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        self.0.get(id).await
    }
}

fn app_with(index: Arc<dyn IndexStore>, locks: MemoryLockStore) -> Router {
    let coordinator = ArticleCoordinator::new(
        Arc::new(MemoryRecordStore::new()),
        index,
        Arc::new(locks),
        CoordinatorConfig::default(),
    );
    create_app(AppState::new(Arc::new(coordinator)))
}

fn app() -> Router {
    app_with(Arc::new(MemoryIndexStore::new()), MemoryLockStore::new())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_add_then_list() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/article",
        Some(json!({"title": "Hello", "picture": "p.png", "content": "x".repeat(300)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["article_id"], 1);
    assert_eq!(body["message"], "Article added successfully.");

    let (status, body) = send(&app, "GET", "/api/v1/articles?page=1&page_size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["page_data"]["total"], 1);
    assert_eq!(body["data"]["page_data"]["total_page"], 1);
    assert_eq!(body["data"]["list"][0]["title"], "Hello");
    assert_eq!(body["data"]["list"][0]["summary"].as_str().unwrap().len(), 200);
    assert!(body["data"]["list"][0].get("content").is_none());
}

#[tokio::test]
async fn test_list_validation() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/articles?page=1&page_size=2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(&app, "GET", "/api/v1/articles?page=1&page_size=10&sort=title", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_statuses() {
    let locks = MemoryLockStore::new();
    let app = app_with(Arc::new(MemoryIndexStore::new()), locks.clone());
    send(&app, "POST", "/api/v1/article", Some(json!({"title": "t", "content": "body"}))).await;

    let (status, body) = send(&app, "PUT", "/api/v1/article/1", Some(json!({"title": "new", "content": "b"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["article_id"], 1);

    let (status, body) = send(&app, "PUT", "/api/v1/article/9", Some(json!({"title": "new"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, "PUT", "/api/v1/article/abc", Some(json!({"title": "new"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "PUT", "/api/v1/article/1", Some(json!({"title": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    use ar_core::LockStore;
    locks.set_if_absent("lock:1", "locked", std::time::Duration::from_secs(60)).await.unwrap();
    let (status, body) = send(&app, "PUT", "/api/v1/article/1", Some(json!({"title": "again"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "contention");
    assert_eq!(body["article_id"], 1);
}

#[tokio::test]
async fn test_index_outage_statuses() {
    let app = app_with(Arc::new(DownIndexStore), MemoryLockStore::new());

    let (status, body) = send(&app, "POST", "/api/v1/article", Some(json!({"title": "t", "content": "body"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "consistency_gap");
    assert_eq!(body["origin"], "index");
    assert_eq!(body["article_id"], 1);

    let (status, body) = send(&app, "GET", "/api/v1/articles?page=1&page_size=10", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "index store unavailable");
    assert_eq!(body["origin"], "index");

    let (status, body) = send(&app, "PUT", "/api/v1/article/1", Some(json!({"title": "n"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["origin"], "index");
}

#[tokio::test]
async fn test_index_query_failure_is_internal_error() {
    let app = app_with(Arc::new(PatchFailingIndexStore(MemoryIndexStore::new())), MemoryLockStore::new());

    let (status, _) = send(&app, "POST", "/api/v1/article", Some(json!({"title": "t", "content": "body"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "PUT", "/api/v1/article/1", Some(json!({"title": "n"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "store");
    assert_eq!(body["origin"], "index");
    assert_eq!(body["error"], "index store request failed");
}
