pub mod handlers;
pub mod models;
pub mod openapi;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::{Method, header};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::context::RequestContext;
use crate::core::credentials::PasswordHasher;
use crate::core::models::{Account, User};
use crate::core::services::{AccountService, UserService};
use crate::infrastructure::database::Database;
use crate::infrastructure::storage::{DocumentRepository, SharedRepository};

/// Extra time the outer timeout layer allows past the per-request deadline,
/// so a slow store call ends as a structured 503 rather than a bare 408.
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

pub type Users = UserService<SharedRepository<User>>;
pub type Accounts = AccountService<SharedRepository<Account>>;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<Users>,
    pub accounts: Arc<Accounts>,
    pub database: Database,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires document-backed repositories for both resources.
    pub fn new(
        database: Database,
        hasher: Arc<dyn PasswordHasher>,
        request_timeout: Duration,
    ) -> Self {
        let users: SharedRepository<User> = Arc::new(DocumentRepository::<User>::new(&database));
        let accounts: SharedRepository<Account> =
            Arc::new(DocumentRepository::<Account>::new(&database));
        Self::with_repositories(database, users, accounts, hasher, request_timeout)
    }

    pub fn with_repositories(
        database: Database,
        users: SharedRepository<User>,
        accounts: SharedRepository<Account>,
        hasher: Arc<dyn PasswordHasher>,
        request_timeout: Duration,
    ) -> Self {
        AppState {
            users: Arc::new(UserService::new(users)),
            accounts: Arc::new(AccountService::new(accounts, hasher)),
            database,
            request_timeout,
        }
    }

    /// A fresh context whose deadline is the configured request timeout.
    pub fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

/// The full HTTP application: routes, OpenAPI docs and middleware.
pub fn app(state: AppState) -> Router {
    let backstop = state.request_timeout + TIMEOUT_GRACE;
    let docs =
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi());
    handlers::api_routes(state)
        .merge(docs)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(backstop))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}
