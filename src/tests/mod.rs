mod handler_tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::AppState;
use crate::config::DatabaseConfig;
use crate::core::credentials::BcryptHasher;
use crate::core::errors::AppError;
use crate::core::models::{Account, User};
use crate::core::services::{AccountService, UserService};
use crate::infrastructure::database::{Client, Database};
use crate::infrastructure::storage::{Document, DocumentRepository, Repository, SharedRepository};

/// Lowest cost bcrypt accepts; keeps hashing fast in tests.
pub const TEST_BCRYPT_COST: u32 = 4;

pub async fn connect_test_database() -> (Client, Database) {
    let client = Client::new(&DatabaseConfig::default()).unwrap();
    let database = client.connect().await.unwrap();
    (client, database)
}

/// Delegates to a document repository and counts every call that reaches it.
pub struct CountingRepository<T: Document> {
    inner: DocumentRepository<T>,
    calls: AtomicUsize,
}

impl<T: Document> CountingRepository<T> {
    pub fn new(database: &Database) -> Self {
        CountingRepository {
            inner: DocumentRepository::new(database),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<T: Document> Repository<T> for CountingRepository<T> {
    async fn insert(&self, item: T) -> Result<T, AppError> {
        self.record();
        self.inner.insert(item).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.record();
        self.inner.find_by_id(id).await
    }

    async fn update(&self, id: &str, item: T) -> Result<Option<T>, AppError> {
        self.record();
        self.inner.update(id, item).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        self.record();
        self.inner.delete(id).await
    }
}

pub const STORE_FAILURE: &str = "connection reset by peer at 10.0.0.7:27017";

/// Every call fails the way a broken store connection would.
pub struct FailingRepository;

#[async_trait]
impl<T: Document> Repository<T> for FailingRepository {
    async fn insert(&self, _item: T) -> Result<T, AppError> {
        Err(AppError::persistence(STORE_FAILURE))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<T>, AppError> {
        Err(AppError::persistence(STORE_FAILURE))
    }

    async fn update(&self, _id: &str, _item: T) -> Result<Option<T>, AppError> {
        Err(AppError::persistence(STORE_FAILURE))
    }

    async fn delete(&self, _id: &str) -> Result<bool, AppError> {
        Err(AppError::persistence(STORE_FAILURE))
    }
}

/// Takes a minute to answer anything.
pub struct SlowRepository;

const SLOW_CALL: Duration = Duration::from_secs(60);

#[async_trait]
impl<T: Document> Repository<T> for SlowRepository {
    async fn insert(&self, item: T) -> Result<T, AppError> {
        tokio::time::sleep(SLOW_CALL).await;
        Ok(item.with_id("slow".to_string()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<T>, AppError> {
        tokio::time::sleep(SLOW_CALL).await;
        Ok(None)
    }

    async fn update(&self, _id: &str, _item: T) -> Result<Option<T>, AppError> {
        tokio::time::sleep(SLOW_CALL).await;
        Ok(None)
    }

    async fn delete(&self, _id: &str) -> Result<bool, AppError> {
        tokio::time::sleep(SLOW_CALL).await;
        Ok(false)
    }
}

pub async fn create_test_user_service() -> (
    UserService<Arc<CountingRepository<User>>>,
    Arc<CountingRepository<User>>,
) {
    let (_client, database) = connect_test_database().await;
    let repository = Arc::new(CountingRepository::new(&database));
    (UserService::new(repository.clone()), repository)
}

pub async fn create_test_account_service() -> AccountService<DocumentRepository<Account>> {
    let (_client, database) = connect_test_database().await;
    AccountService::new(
        DocumentRepository::new(&database),
        Arc::new(BcryptHasher::new(TEST_BCRYPT_COST)),
    )
}

pub fn test_state(database: Database, users: SharedRepository<User>) -> AppState {
    test_state_with_timeout(database, users, Duration::from_secs(5))
}

pub fn test_state_with_timeout(
    database: Database,
    users: SharedRepository<User>,
    request_timeout: Duration,
) -> AppState {
    let accounts: SharedRepository<Account> =
        Arc::new(DocumentRepository::<Account>::new(&database));
    AppState::with_repositories(
        database,
        users,
        accounts,
        Arc::new(BcryptHasher::new(TEST_BCRYPT_COST)),
        request_timeout,
    )
}
