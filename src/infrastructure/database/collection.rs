use std::sync::Arc;

use mongodb::bson::Document;
use serde_json::Value;
use uuid::Uuid;

use crate::infrastructure::database::{Engine, StorageError, mongo};

pub const ID_FIELD: &str = "_id";

#[derive(Clone)]
enum Backing {
    Memory(Arc<Engine>),
    Mongo(mongodb::Collection<Document>),
}

#[derive(Clone)]
pub struct Collection {
    namespace: String,
    backing: Backing,
}

/// Gives `document` a fresh `_id` when it carries none, and returns the `_id`.
fn assign_id(document: &mut Value) -> Result<String, StorageError> {
    let object = document
        .as_object_mut()
        .ok_or_else(|| StorageError::MalformedDocument("expected a JSON object".to_string()))?;
    match object.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            let id = Uuid::new_v4().to_string();
            object.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            Ok(id)
        }
        Some(other) => Err(StorageError::MalformedDocument(format!(
            "`{}` must be a string, got {}",
            ID_FIELD, other
        ))),
    }
}

fn set_id(document: &mut Value, id: &str) -> Result<(), StorageError> {
    document
        .as_object_mut()
        .ok_or_else(|| StorageError::MalformedDocument("expected a JSON object".to_string()))?
        .insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    Ok(())
}

impl Collection {
    pub(crate) fn in_memory(namespace: String, engine: Arc<Engine>) -> Self {
        Collection {
            namespace,
            backing: Backing::Memory(engine),
        }
    }

    pub(crate) fn mongo(namespace: String, collection: mongodb::Collection<Document>) -> Self {
        Collection {
            namespace,
            backing: Backing::Mongo(collection),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stores `document`, assigning a fresh `_id` when it carries none. Returns the `_id`.
    pub async fn insert_one(&self, mut document: Value) -> Result<String, StorageError> {
        match &self.backing {
            Backing::Memory(engine) => {
                engine.ensure_open()?;
                let id = assign_id(&mut document)?;
                let mut namespaces = engine.namespaces.write().await;
                let documents = namespaces.entry(self.namespace.clone()).or_default();
                if documents.contains_key(&id) {
                    return Err(StorageError::DuplicateKey(id, self.namespace.clone()));
                }
                documents.insert(id.clone(), document);
                Ok(id)
            }
            Backing::Mongo(collection) => {
                let id = assign_id(&mut document)?;
                match collection.insert_one(mongo::to_bson(&document)?).await {
                    Ok(_) => Ok(id),
                    Err(err) if mongo::is_duplicate_key(&err) => {
                        Err(StorageError::DuplicateKey(id, self.namespace.clone()))
                    }
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    pub async fn find_one(&self, id: &str) -> Result<Option<Value>, StorageError> {
        match &self.backing {
            Backing::Memory(engine) => {
                engine.ensure_open()?;
                let namespaces = engine.namespaces.read().await;
                Ok(namespaces
                    .get(&self.namespace)
                    .and_then(|documents| documents.get(id))
                    .cloned())
            }
            Backing::Mongo(collection) => collection
                .find_one(mongo::id_filter(id))
                .await?
                .map(mongo::from_bson)
                .transpose(),
        }
    }

    /// Replaces the document stored under `id`. Returns false when nothing was there.
    pub async fn replace_one(&self, id: &str, mut document: Value) -> Result<bool, StorageError> {
        set_id(&mut document, id)?;
        match &self.backing {
            Backing::Memory(engine) => {
                engine.ensure_open()?;
                let mut namespaces = engine.namespaces.write().await;
                match namespaces
                    .get_mut(&self.namespace)
                    .and_then(|documents| documents.get_mut(id))
                {
                    Some(existing) => {
                        *existing = document;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            Backing::Mongo(collection) => {
                let result = collection
                    .replace_one(mongo::id_filter(id), mongo::to_bson(&document)?)
                    .await?;
                Ok(result.matched_count > 0)
            }
        }
    }

    pub async fn delete_one(&self, id: &str) -> Result<bool, StorageError> {
        match &self.backing {
            Backing::Memory(engine) => {
                engine.ensure_open()?;
                let mut namespaces = engine.namespaces.write().await;
                Ok(namespaces
                    .get_mut(&self.namespace)
                    .and_then(|documents| documents.remove(id))
                    .is_some())
            }
            Backing::Mongo(collection) => {
                let result = collection.delete_one(mongo::id_filter(id)).await?;
                Ok(result.deleted_count > 0)
            }
        }
    }

    pub async fn count(&self) -> Result<usize, StorageError> {
        match &self.backing {
            Backing::Memory(engine) => {
                engine.ensure_open()?;
                let namespaces = engine.namespaces.read().await;
                Ok(namespaces.get(&self.namespace).map_or(0, |documents| documents.len()))
            }
            Backing::Mongo(collection) => {
                let count = collection.count_documents(mongodb::bson::doc! {}).await?;
                Ok(usize::try_from(count).unwrap_or(usize::MAX))
            }
        }
    }
}
