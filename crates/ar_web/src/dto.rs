use ar_core::{
    Article, ArticleId, ArticlePage, ArticleUpdate, Error, ListQuery, NewArticle, Result, SortField,
    SortOrder,
};
use serde::{Deserialize, Serialize};

const MIN_PAGE_SIZE: u32 = 5;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ArticleAddRequest {
    pub title: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub content: String,
}

impl From<ArticleAddRequest> for NewArticle {
    fn from(req: ArticleAddRequest) -> Self {
        Self {
            title: req.title,
            picture: req.picture,
            content: req.content,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArticleUpdateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub content: String,
}

impl ArticleUpdateRequest {
    pub fn validate(self) -> Result<ArticleUpdate> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title is required".to_string()));
        }
        Ok(ArticleUpdate {
            title: self.title,
            picture: self.picture,
            content: self.content,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleListRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ArticleListRequest {
    pub fn validate(self) -> Result<ListQuery> {
        let page = self
            .page
            .ok_or_else(|| Error::Validation("page is required".to_string()))?;
        if page < 1 {
            return Err(Error::Validation("page must be at least 1".to_string()));
        }

        let page_size = self
            .page_size
            .ok_or_else(|| Error::Validation("page_size is required".to_string()))?;
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::Validation(format!(
                "page_size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }

        let sort_field: SortField = self.sort.as_deref().unwrap_or_default().parse()?;
        let sort_order: SortOrder = self.order.as_deref().unwrap_or_default().parse()?;
        Ok(ListQuery::new(page, page_size).with_sort(sort_field, sort_order))
    }
}

pub fn parse_article_id(raw: &str) -> Result<ArticleId> {
    match raw.parse::<ArticleId>() {
        Ok(id) if id.is_assigned() => Ok(id),
        _ => Err(Error::Validation("Invalid article ID".to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ArticleIdData {
    pub article_id: ArticleId,
}

#[derive(Debug, Serialize)]
pub struct PageData {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_page: u64,
}

#[derive(Debug, Serialize)]
pub struct ArticleListData {
    pub page_data: PageData,
    pub list: Vec<Article>,
}

impl From<ArticlePage> for ArticleListData {
    fn from(page: ArticlePage) -> Self {
        Self {
            page_data: PageData {
                total: page.total,
                page: page.page,
                page_size: page.page_size,
                total_page: page.total_pages,
            },
            list: page.items,
        }
    }
}
