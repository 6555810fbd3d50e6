//! Client for the document database that backs the persistence layer.
//!
//! The client follows the usual driver lifecycle: build it from config,
//! `connect` (which pings before handing out a handle), use `Database` and
//! `Collection` handles, then `disconnect`. `mongodb://` and `mongodb+srv://`
//! URIs go to a MongoDB deployment; `mem://` URIs select an in-process engine
//! with the same contract, used for local runs and tests.

pub mod collection;
mod mongo;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mongodb::options::ClientOptions;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::config::DatabaseConfig;
use crate::core::errors::AppError;

pub use collection::Collection;

pub const MEMORY_SCHEME: &str = "mem";
pub const MONGODB_SCHEMES: [&str; 2] = ["mongodb", "mongodb+srv"];

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid database uri `{0}`: {1}")]
    InvalidUri(String, String),

    #[error("unsupported database scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("timed out after {0:?} while {1}")]
    Timeout(Duration, &'static str),

    #[error("database client is not connected")]
    NotConnected,

    #[error("duplicate key `{0}` in `{1}`")]
    DuplicateKey(String, String),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("bson conversion failed: {0}")]
    Bson(String),

    #[error("mongodb: {0}")]
    Driver(#[from] mongodb::error::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Namespaced document maps shared by every handle derived from one client.
#[derive(Default)]
pub(crate) struct Engine {
    open: AtomicBool,
    namespaces: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl Engine {
    pub(crate) fn ensure_open(&self) -> Result<(), StorageError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::NotConnected)
        }
    }
}

enum Backend {
    Memory(Arc<Engine>),
    /// Filled by `connect`, emptied by `disconnect`.
    Mongo(Mutex<Option<mongodb::Client>>),
}

pub struct Client {
    uri: String,
    database_name: String,
    credential: Option<Credential>,
    explicit_credential: bool,
    connect_timeout: Duration,
    backend: Backend,
}

impl Client {
    /// Validates the URI and resolves credentials without contacting the store.
    pub fn new(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let invalid =
            |reason: &str| StorageError::InvalidUri(redact_uri(&config.uri), reason.to_string());
        let (scheme, _) = config
            .uri
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;

        let backend = match scheme {
            MEMORY_SCHEME => {
                Url::parse(&config.uri).map_err(|e| invalid(&e.to_string()))?;
                Backend::Memory(Arc::new(Engine::default()))
            }
            s if MONGODB_SCHEMES.contains(&s) => Backend::Mongo(Mutex::new(None)),
            other => return Err(StorageError::UnsupportedScheme(other.to_string())),
        };

        // Explicit credentials win over user-info embedded in the URI.
        let explicit = match (config.username.as_deref(), config.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credential {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => None,
        };
        let explicit_credential = explicit.is_some();
        let credential = explicit.or_else(|| {
            Url::parse(&config.uri)
                .ok()
                .filter(|url| !url.username().is_empty())
                .map(|url| Credential {
                    username: url.username().to_string(),
                    password: url.password().unwrap_or_default().to_string(),
                })
        });

        Ok(Client {
            uri: config.uri.clone(),
            database_name: config.name.clone(),
            credential,
            explicit_credential,
            connect_timeout: config.connect_timeout,
            backend,
        })
    }

    /// The URI with any user-info stripped, safe for logs.
    pub fn endpoint(&self) -> String {
        redact_uri(&self.uri)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Driver options for a MongoDB backend: the parsed URI, explicit
    /// credentials on top of it, and the connect timeout applied to both
    /// socket connect and server selection.
    pub(crate) async fn mongo_options(&self) -> Result<ClientOptions, StorageError> {
        let mut options = ClientOptions::parse(&self.uri).await?;
        if self.explicit_credential {
            if let Some(credential) = &self.credential {
                let driver_credential = options.credential.get_or_insert_with(Default::default);
                driver_credential.username = Some(credential.username.clone());
                driver_credential.password = Some(credential.password.clone());
            }
        }
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);
        Ok(options)
    }

    /// Opens the backend and verifies it answers a ping, bounded by the connect timeout.
    pub async fn connect(&self) -> Result<Database, StorageError> {
        tokio::time::timeout(self.connect_timeout, self.open())
            .await
            .map_err(|_| StorageError::Timeout(self.connect_timeout, "connecting"))?
    }

    async fn open(&self) -> Result<Database, StorageError> {
        match &self.backend {
            Backend::Memory(engine) => {
                engine.open.store(true, Ordering::SeqCst);
                engine.ensure_open()?;
                Ok(Database {
                    name: self.database_name.clone(),
                    store: Store::Memory(engine.clone()),
                })
            }
            Backend::Mongo(slot) => {
                let client = mongodb::Client::with_options(self.mongo_options().await?)?;
                let database = client.database(&self.database_name);
                mongo::ping(&database).await?;
                *slot.lock().await = Some(client);
                Ok(Database {
                    name: self.database_name.clone(),
                    store: Store::Mongo(database),
                })
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Memory(engine) => engine.ensure_open(),
            Backend::Mongo(slot) => {
                let client = slot.lock().await.clone().ok_or(StorageError::NotConnected)?;
                mongo::ping(&client.database(&self.database_name)).await
            }
        }
    }

    /// Safe to call before `connect` and more than once.
    pub async fn disconnect(&self) -> Result<(), StorageError> {
        tokio::time::timeout(self.connect_timeout, async {
            match &self.backend {
                Backend::Memory(engine) => engine.open.store(false, Ordering::SeqCst),
                Backend::Mongo(slot) => {
                    let client = slot.lock().await.take();
                    if let Some(client) = client {
                        client.shutdown().await;
                    }
                }
            }
        })
        .await
        .map_err(|_| StorageError::Timeout(self.connect_timeout, "disconnecting"))
    }
}

fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return "<unparseable uri>".to_string();
    };
    let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);
    format!("{}://{}{}", scheme, hosts, path)
}

#[derive(Clone)]
enum Store {
    Memory(Arc<Engine>),
    Mongo(mongodb::Database),
}

/// Handle to one named database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    name: String,
    store: Store,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> Collection {
        let namespace = format!("{}.{}", self.name, name);
        match &self.store {
            Store::Memory(engine) => Collection::in_memory(namespace, engine.clone()),
            Store::Mongo(database) => Collection::mongo(namespace, database.collection(name)),
        }
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        match &self.store {
            Store::Memory(engine) => engine.ensure_open(),
            Store::Mongo(database) => mongo::ping(database).await,
        }
    }
}
