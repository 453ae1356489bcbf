pub mod error;
pub mod models;
pub mod storage;
pub mod summary;
pub mod types;

pub use error::{Error, StoreError, StoreOrigin};
pub use models::{Article, ArticleContent, ArticleId};
pub use storage::{IndexStore, LockStore, RecordStore, StoreResult};
pub use summary::{generate_summary, MAX_SUMMARY_LENGTH};
pub use types::{ArticlePage, ArticleUpdate, ListQuery, NewArticle, SortField, SortOrder};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{
        Article, ArticleContent, ArticleId, ArticlePage, ArticleUpdate, Error, IndexStore,
        ListQuery, LockStore, NewArticle, RecordStore, Result, SortField, SortOrder, StoreError,
        StoreOrigin, StoreResult,
    };
}
