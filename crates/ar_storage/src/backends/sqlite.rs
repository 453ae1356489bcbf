use ar_core::{Article, ArticleContent, ArticleId, RecordStore, StoreError, StoreOrigin, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use crate::{BackendConfig, StorageBackend};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS article (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        picture TEXT NOT NULL DEFAULT '',
        summary TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_content (
        article_id INTEGER PRIMARY KEY REFERENCES article(id) ON DELETE CASCADE,
        content TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
        }
    }

    pub fn from_env() -> Self {
        let path = env::var("DB_PATH").unwrap_or_else(|_| "articles.db".to_string());
        Self::new(path)
    }

    /// Accepts a bare path or a `sqlite:` url.
    pub fn with_url(mut self, url: &str) -> Self {
        let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")).unwrap_or(url);
        self.path = PathBuf::from(path);
        self
    }
}

impl BackendConfig for SqliteConfig {
    fn get_url(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn get_namespace(&self) -> String {
        "article".to_string()
    }
}

fn map_sqlx(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{}: database connection failed", context))
        }
        other => StoreError::Query(format!("{}: {}", context, other)),
    }
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("Failed to parse date: {}", e)))
}

fn row_to_record(row: &SqliteRow) -> StoreResult<(Article, ArticleContent)> {
    let id = ArticleId(row.try_get::<i64, _>("id").map_err(map_sqlx("read article"))? as u64);
    let created_at: String = row.try_get("created_at").map_err(map_sqlx("read article"))?;
    let updated_at: String = row.try_get("updated_at").map_err(map_sqlx("read article"))?;

    let article = Article {
        id,
        title: row.try_get("title").map_err(map_sqlx("read article"))?,
        picture: row.try_get("picture").map_err(map_sqlx("read article"))?,
        summary: row.try_get("summary").map_err(map_sqlx("read article"))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    };
    let content = ArticleContent::new(id, row.try_get::<String, _>("content").map_err(map_sqlx("read article"))?);
    Ok((article, content))
}

pub struct SQLiteRecordStore {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteRecordStore {
    type Config = SqliteConfig;

    const ORIGIN: StoreOrigin = StoreOrigin::Relational;

    fn get_error_message() -> &'static str {
        "SQLite database should be writable at the configured DB_PATH"
    }

    async fn connect(config: &SqliteConfig) -> StoreResult<Self> {
        Self::new_with_config(config).await
    }
}

impl SQLiteRecordStore {
    pub async fn new_with_path(db_path: &PathBuf) -> StoreResult<Self> {
        Self::new_with_config(&SqliteConfig::new(db_path.clone())).await
    }

    pub async fn new_with_config(config: &SqliteConfig) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("Failed to create database directory: {}", e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(map_sqlx("open database"))?;

        // Run migrations
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            debug!("Running migration {}", i);
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(map_sqlx("run migration"))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: config.path.clone(),
        })
    }

    pub fn get_db_path(&self) -> &PathBuf {
        &self.db_path
    }
}

#[async_trait]
impl RecordStore for SQLiteRecordStore {
    async fn create(&self, article: &Article, content: &ArticleContent) -> StoreResult<ArticleId> {
        // Dropping the transaction before commit rolls it back
        let mut tx = self.pool.begin().await.map_err(map_sqlx("begin transaction"))?;

        let result = sqlx::query(
            r#"
            INSERT INTO article (title, picture, summary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.picture)
        .bind(&article.summary)
        .bind(article.created_at.to_rfc3339())
        .bind(article.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("insert article"))?;

        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO article_content (article_id, content) VALUES (?, ?)")
            .bind(id)
            .bind(&content.content)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("insert article content"))?;

        tx.commit().await.map_err(map_sqlx("commit article"))?;
        Ok(ArticleId(id as u64))
    }

    async fn exists(&self, id: ArticleId) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article WHERE id = ?")
            .bind(id.get() as i64)
            .fetch_one(&*self.pool)
            .await
            .map_err(map_sqlx("check article"))?;
        Ok(count > 0)
    }

    async fn update(&self, article: &Article, content: &ArticleContent) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx("begin transaction"))?;

        let updated = sqlx::query(
            r#"
            UPDATE article
            SET title = ?, picture = ?, summary = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.picture)
        .bind(&article.summary)
        .bind(article.updated_at.to_rfc3339())
        .bind(article.id.get() as i64)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx("update article"))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("article row {}", article.id)));
        }

        let updated = sqlx::query("UPDATE article_content SET content = ? WHERE article_id = ?")
            .bind(&content.content)
            .bind(content.article_id.get() as i64)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx("update article content"))?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("article content row {}", content.article_id)));
        }

        tx.commit().await.map_err(map_sqlx("commit article"))?;
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> StoreResult<Option<(Article, ArticleContent)>> {
        let row = sqlx::query(
            r#"
            SELECT a.id, a.title, a.picture, a.summary, a.created_at, a.updated_at, c.content
            FROM article a
            JOIN article_content c ON c.article_id = a.id
            WHERE a.id = ?
            "#,
        )
        .bind(id.get() as i64)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx("get article"))?;

        row.as_ref().map(row_to_record).transpose()
    }
}
