use mongodb::bson::{self, Document, doc};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use serde_json::Value;

use crate::infrastructure::database::StorageError;

const DUPLICATE_KEY: i32 = 11000;

pub(super) async fn ping(database: &mongodb::Database) -> Result<(), StorageError> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

pub(super) fn id_filter(id: &str) -> Document {
    doc! { "_id": id }
}

pub(super) fn to_bson(document: &Value) -> Result<Document, StorageError> {
    bson::to_document(document).map_err(|e| StorageError::Bson(e.to_string()))
}

pub(super) fn from_bson(document: Document) -> Result<Value, StorageError> {
    bson::from_document(document).map_err(|e| StorageError::Bson(e.to_string()))
}

pub(super) fn is_duplicate_key(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}
