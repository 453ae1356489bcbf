use ar_core::{
    Article, ArticleId, ArticlePage, IndexStore, ListQuery, StoreError, StoreOrigin, StoreResult,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;
use crate::{BackendConfig, StorageBackend};

const DEFAULT_INDEX: &str = "article";

#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub index: String,
    pub timeout: Duration,
}

impl ElasticsearchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            index: DEFAULT_INDEX.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_env() -> Self {
        let url = env::var("ES_HOST").unwrap_or_else(|_| "http://localhost:9200".to_string());
        let mut config = Self::new(url);
        if let Ok(index) = env::var("ES_INDEX") {
            config.index = index;
        }
        config
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }
}

impl BackendConfig for ElasticsearchConfig {
    fn get_url(&self) -> String {
        self.url.clone()
    }

    fn get_namespace(&self) -> String {
        self.index.clone()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: Total,
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Total {
    value: u64,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Article,
}

#[derive(Deserialize)]
struct GetResponse {
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Article>,
}

/// Search body for one list page, with an exact hit count.
pub(crate) fn search_body(query: &ListQuery) -> Value {
    json!({
        "from": query.offset(),
        "size": query.page_size,
        "sort": [
            { (query.sort_field.as_str()): { "order": query.sort_order.as_str() } }
        ],
        "track_total_hits": true,
    })
}

/// Partial document carrying only the mutable fields.
pub(crate) fn update_body(article: &Article) -> Value {
    json!({
        "doc": {
            "title": article.title,
            "picture": article.picture,
            "summary": article.summary,
            "updated_at": article.updated_at,
        }
    })
}

pub(crate) fn parse_search_response(query: &ListQuery, body: &[u8]) -> StoreResult<ArticlePage> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    let items = response.hits.hits.into_iter().map(|hit| hit.source).collect();
    Ok(ArticlePage::new(items, response.hits.total.value, query))
}

/// Turn an error response into a store error. The index replies with
/// `{"error": {"type": ..., "reason": ...}}` or, for some endpoints, a bare string.
pub(crate) fn parse_error(status: StatusCode, body: &[u8]) -> StoreError {
    let reason = match serde_json::from_slice::<Value>(body) {
        Ok(value) => match &value["error"] {
            Value::Object(error) => format!(
                "{}: {}",
                error.get("type").and_then(Value::as_str).unwrap_or("unknown"),
                error.get("reason").and_then(Value::as_str).unwrap_or("no reason given"),
            ),
            Value::String(error) => error.clone(),
            _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
        },
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    StoreError::Rejected {
        status: status.as_u16(),
        reason,
    }
}

fn map_reqwest(context: &'static str) -> impl FnOnce(reqwest::Error) -> StoreError {
    move |e| {
        if e.is_connect() || e.is_timeout() {
            StoreError::Unavailable(format!("{}: index unreachable", context))
        } else {
            StoreError::Query(format!("{}: {}", context, e.without_url()))
        }
    }
}

pub struct ElasticsearchIndexStore {
    client: Client,
    base_url: String,
    index: String,
}

#[async_trait]
impl StorageBackend for ElasticsearchIndexStore {
    type Config = ElasticsearchConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Index;

    fn get_error_message() -> &'static str {
        "Elasticsearch should be reachable at ES_HOST"
    }

    async fn connect(config: &ElasticsearchConfig) -> StoreResult<Self> {
        let store = Self::new(config)?;
        store.ping().await?;
        Ok(store)
    }
}

impl ElasticsearchIndexStore {
    pub fn new(config: &ElasticsearchConfig) -> StoreResult<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid index url: {}", e)))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(map_reqwest("build index client"))?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            index: config.index.clone(),
        })
    }

    pub async fn ping(&self) -> StoreResult<()> {
        let response = self.client.get(&self.base_url).send().await.map_err(map_reqwest("ping index"))?;
        Self::check(response).await.map(|_| ())
    }

    fn doc_url(&self, endpoint: &str, id: ArticleId) -> String {
        format!("{}/{}/{}/{}", self.base_url, self.index, endpoint, id)
    }

    async fn check(response: Response) -> StoreResult<Vec<u8>> {
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest("read index response"))?;
        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(parse_error(status, &body))
        }
    }
}

#[async_trait]
impl IndexStore for ElasticsearchIndexStore {
    async fn upsert(&self, article: &Article) -> StoreResult<()> {
        let response = self
            .client
            .put(self.doc_url("_doc", article.id))
            .query(&[("refresh", "true")])
            .json(article)
            .send()
            .await
            .map_err(map_reqwest("index article"))?;
        Self::check(response).await?;
        debug!("Indexed article {}", article.id);
        Ok(())
    }

    async fn update(&self, article: &Article) -> StoreResult<()> {
        let response = self
            .client
            .post(self.doc_url("_update", article.id))
            .query(&[("refresh", "true")])
            .json(&update_body(article))
            .send()
            .await
            .map_err(map_reqwest("update indexed article"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::Missing(format!("index document {}", article.id)));
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn search(&self, query: &ListQuery) -> StoreResult<ArticlePage> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index))
            .json(&search_body(query))
            .send()
            .await
            .map_err(map_reqwest("search articles"))?;
        let body = Self::check(response).await?;
        parse_search_response(query, &body)
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        let response = self
            .client
            .get(self.doc_url("_doc", id))
            .send()
            .await
            .map_err(map_reqwest("get indexed article"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::check(response).await?;
        let doc: GetResponse = serde_json::from_slice(&body)?;
        Ok(if doc.found { doc.source } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_core::{SortField, SortOrder};

    #[test]
    fn test_search_body_paginates_with_exact_total() {
        let query = ListQuery::new(2, 10);
        let body = search_body(&query);
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 10);
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(body["sort"][0]["created_at"]["order"], "desc");

        let by_id = search_body(&ListQuery::new(1, 5).with_sort(SortField::Id, SortOrder::Asc));
        assert_eq!(by_id["from"], 0);
        assert_eq!(by_id["sort"][0]["id"]["order"], "asc");
    }

    #[test]
    fn test_update_body_excludes_immutable_fields() {
        let article = Article::new("t", "p", "s").with_id(ArticleId(4));
        let body = update_body(&article);
        assert_eq!(body["doc"]["title"], "t");
        assert!(body["doc"].get("created_at").is_none());
        assert!(body["doc"].get("id").is_none());
    }

    #[test]
    fn test_parse_search_response() {
        let article = Article::new("hello", "", "world").with_id(ArticleId(11));
        let body = json!({
            "hits": {
                "total": { "value": 25, "relation": "eq" },
                "hits": [ { "_id": "11", "_source": article } ]
            }
        });
        let query = ListQuery::new(2, 10);
        let page = parse_search_response(&query, body.to_string().as_bytes()).unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].id, ArticleId(11));
    }

    #[test]
    fn test_parse_error_reads_type_and_reason() {
        let body = br#"{"error":{"type":"index_not_found_exception","reason":"no such index [article]"},"status":404}"#;
        match parse_error(StatusCode::NOT_FOUND, body) {
            StoreError::Rejected { status, reason } => {
                assert_eq!(status, 404);
                assert!(reason.starts_with("index_not_found_exception"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match parse_error(StatusCode::BAD_GATEWAY, b"<html>") {
            StoreError::Rejected { reason, .. } => assert_eq!(reason, "Bad Gateway"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = ElasticsearchIndexStore::new(&ElasticsearchConfig::new("not a url"));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_doc_url() {
        let store = ElasticsearchIndexStore::new(&ElasticsearchConfig::new("http://es:9200/")).unwrap();
        assert_eq!(store.doc_url("_update", ArticleId(3)), "http://es:9200/article/_update/3");
    }
}
