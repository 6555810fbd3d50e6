use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::AppError;
use crate::infrastructure::database::collection::ID_FIELD;
use crate::infrastructure::database::{Collection, Database, StorageError};
use crate::infrastructure::storage::{Document, Repository};

const MODEL_ID_FIELD: &str = "id";

/// Repository over one collection of the document database.
/// The model's `id` is stored as the document's `_id`.
pub struct DocumentRepository<T> {
    collection: Collection,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> DocumentRepository<T> {
    pub fn new(database: &Database) -> Self {
        DocumentRepository {
            collection: database.collection(T::COLLECTION),
            _marker: PhantomData,
        }
    }
}

fn to_document<T: Document>(item: &T) -> Result<Value, StorageError> {
    let mut value = serde_json::to_value(item)?;
    let object = value.as_object_mut().ok_or_else(|| {
        StorageError::MalformedDocument(format!("{} must encode as an object", T::COLLECTION))
    })?;
    if let Some(Value::String(id)) = object.remove(MODEL_ID_FIELD) {
        if !id.is_empty() {
            object.insert(ID_FIELD.to_string(), Value::String(id));
        }
    }
    Ok(value)
}

fn from_document<T: Document>(mut value: Value) -> Result<T, StorageError> {
    let object = value.as_object_mut().ok_or_else(|| {
        StorageError::MalformedDocument(format!("{} entry is not an object", T::COLLECTION))
    })?;
    if let Some(id) = object.remove(ID_FIELD) {
        object.insert(MODEL_ID_FIELD.to_string(), id);
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl<T: Document> Repository<T> for DocumentRepository<T> {
    async fn insert(&self, item: T) -> Result<T, AppError> {
        // Identity is assigned here, never taken from the caller.
        if !item.id().is_empty() {
            return Err(AppError::persistence(format!(
                "refusing to insert into {} an item that already has id {}",
                T::COLLECTION,
                item.id()
            )));
        }
        let document = to_document(&item)?;
        let id = self.collection.insert_one(document).await?;
        Ok(item.with_id(id))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        match self.collection.find_one(id).await? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, item: T) -> Result<Option<T>, AppError> {
        let item = item.with_id(id.to_string());
        let document = to_document(&item)?;
        if self.collection.replace_one(id, document).await? {
            Ok(Some(item))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.collection.delete_one(id).await?)
    }
}
