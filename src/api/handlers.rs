use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{info, warn};

use crate::api::AppState;
use crate::api::models::{AccountView, ApiError, ErrorResponse, HealthResponse, json_response};
use crate::core::models::{AccountDraft, AccountPatch, User, UserDraft, UserPatch};

/// Unsupported methods on these paths answer 405.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .route("/accounts", post(create_account))
        .route("/accounts/{id}", get(get_account).patch(update_account))
        .route("/accounts/{id}/deactivate", post(deactivate_account))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    match state.database.ping().await {
        Ok(()) => json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "ok".to_string(),
            },
        ),
        Err(err) => {
            warn!(error = %err, "health check failed");
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &HealthResponse {
                    status: "unavailable".to_string(),
                },
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = UserDraft,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid body or missing email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = payload?;
    let user = state.users.create(&state.context(), draft).await?;
    info!(user_id = %user.id, "user created");
    Ok(json_response(StatusCode::CREATED, &user))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "ID of the user to retrieve")
    ),
    responses(
        (status = 200, description = "User retrieved", body = User),
        (status = 400, description = "Missing id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = state.users.get(&state.context(), &id).await?;
    Ok(json_response(StatusCode::OK, &user))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "ID of the user to update")
    ),
    request_body = UserPatch,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid body or empty email", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = payload?;
    let user = state.users.update(&state.context(), &id, patch).await?;
    info!(user_id = %user.id, "user updated");
    Ok(json_response(StatusCode::OK, &user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "ID of the user to delete")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.users.delete(&state.context(), &id).await?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/accounts",
    request_body = AccountDraft,
    responses(
        (status = 201, description = "Account registered", body = AccountView),
        (status = 400, description = "Invalid body or missing credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<AccountDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = payload?;
    let account = state.accounts.register(&state.context(), draft).await?;
    info!(account_id = %account.id, "account registered");
    Ok(json_response(StatusCode::CREATED, &AccountView::from(account)))
}

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(
        ("id" = String, Path, description = "ID of the account to retrieve")
    ),
    responses(
        (status = 200, description = "Account retrieved", body = AccountView),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let account = state.accounts.get(&state.context(), &id).await?;
    Ok(json_response(StatusCode::OK, &AccountView::from(account)))
}

#[utoipa::path(
    patch,
    path = "/accounts/{id}",
    params(
        ("id" = String, Path, description = "ID of the account to update")
    ),
    request_body = AccountPatch,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Invalid body, empty email or password", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AccountPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = payload?;
    let account = state.accounts.update(&state.context(), &id, patch).await?;
    info!(account_id = %account.id, "account updated");
    Ok(json_response(StatusCode::OK, &AccountView::from(account)))
}

#[utoipa::path(
    post,
    path = "/accounts/{id}/deactivate",
    params(
        ("id" = String, Path, description = "ID of the account to deactivate")
    ),
    responses(
        (status = 200, description = "Account deactivated", body = AccountView),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn deactivate_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let account = state.accounts.deactivate(&state.context(), &id).await?;
    info!(account_id = %account.id, "account deactivated");
    Ok(json_response(StatusCode::OK, &AccountView::from(account)))
}
