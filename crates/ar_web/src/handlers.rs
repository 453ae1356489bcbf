use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::dto::{
    parse_article_id, ApiResponse, ArticleAddRequest, ArticleIdData, ArticleListData, ArticleListRequest,
    ArticleUpdateRequest,
};
use crate::{ApiError, AppState};

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

pub async fn add_article(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ArticleAddRequest>,
) -> ApiResult<ArticleIdData> {
    let article_id = state.coordinator.add_article(req.into()).await?;
    Ok(Json(ApiResponse {
        data: ArticleIdData { article_id },
        message: "Article added successfully.",
    }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ArticleListRequest>,
) -> ApiResult<ArticleListData> {
    let query = req.validate()?;
    let page = state.coordinator.list_articles(&query).await?;
    Ok(Json(ApiResponse {
        data: page.into(),
        message: "Articles fetched successfully",
    }))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<String>,
    Json(req): Json<ArticleUpdateRequest>,
) -> ApiResult<ArticleIdData> {
    let article_id = parse_article_id(&article_id)?;
    let update = req.validate()?;
    info!("✏️ Updating article {}", article_id);
    state.coordinator.update_article(article_id, update).await?;
    Ok(Json(ApiResponse {
        data: ArticleIdData { article_id },
        message: "Article updated successfully.",
    }))
}
