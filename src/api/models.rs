use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::core::errors::AppError;
use crate::core::models::Account;

pub const INVALID_BODY: &str = "invalid request body";
pub const INTERNAL_ERROR: &str = "internal server error";
pub const REQUEST_CANCELLED: &str = "request cancelled";

const ENCODE_FAILURE_BODY: &str = r#"{"error":"internal server error"}"#;

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Wire shape of an account. Carries no credential material.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        AccountView {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            active: account.active,
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Serializes `body` completely before any status or header is produced,
/// so an encoding failure still surfaces as a clean 500.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "error encoding response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                ENCODE_FAILURE_BODY,
            )
                .into_response()
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Service(AppError),
    MalformedBody(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MalformedBody(detail) => {
                debug!(%detail, "rejected request body");
                (StatusCode::BAD_REQUEST, INVALID_BODY.to_string())
            }
            ApiError::Service(AppError::Validation(message)) => (StatusCode::BAD_REQUEST, message),
            ApiError::Service(AppError::NotFound(message)) => (StatusCode::NOT_FOUND, message),
            ApiError::Service(AppError::Persistence(detail)) => {
                error!(error = %detail, "persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
            ApiError::Service(AppError::Internal(detail)) => {
                error!(error = %detail, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
            ApiError::Service(AppError::Cancelled(reason)) => {
                warn!(reason, "request cancelled");
                (StatusCode::SERVICE_UNAVAILABLE, REQUEST_CANCELLED.to_string())
            }
        };
        json_response(status, &ErrorResponse { error: message })
    }
}
