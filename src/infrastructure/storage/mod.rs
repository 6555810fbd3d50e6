use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::errors::AppError;

pub mod document;

pub use document::DocumentRepository;

/// A resource that can be stored in a collection and addressed by an opaque id.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn with_id(self, id: String) -> Self;
}

/// The capability set the services depend on. Absence is reported as
/// `None`/`false` so callers decide how to surface it.
#[async_trait]
pub trait Repository<T: Document>: Send + Sync {
    /// Persists a new item and returns it with its assigned id.
    async fn insert(&self, item: T) -> Result<T, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError>;
    async fn update(&self, id: &str, item: T) -> Result<Option<T>, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

pub type SharedRepository<T> = Arc<dyn Repository<T>>;

#[async_trait]
impl<T: Document, R: Repository<T> + ?Sized> Repository<T> for Arc<R> {
    async fn insert(&self, item: T) -> Result<T, AppError> {
        (**self).insert(item).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        (**self).find_by_id(id).await
    }

    async fn update(&self, id: &str, item: T) -> Result<Option<T>, AppError> {
        (**self).update(id, item).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        (**self).delete(id).await
    }
}
