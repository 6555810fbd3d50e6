use thiserror::Error;

pub const EMAIL_REQUIRED: &str = "email is required";
pub const ID_REQUIRED: &str = "id is required";
pub const PASSWORD_REQUIRED: &str = "password is required";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Caller input violates a precondition. The message is safe to show to API clients.
    #[error("{0}")]
    Validation(String),

    /// No resource exists at the given identifier.
    #[error("{0}")]
    NotFound(String),

    /// The storage collaborator failed. Never shown verbatim to clients.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A local step (such as credential hashing) failed. Never shown verbatim to clients.
    #[error("internal failure: {0}")]
    Internal(String),

    /// The request context was cancelled or its deadline passed mid-call.
    #[error("operation cancelled: {0}")]
    Cancelled(&'static str),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}
