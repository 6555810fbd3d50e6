use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::errors::AppError;
use crate::core::validation;
use crate::infrastructure::storage::Document;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Assigned by the store; empty until the user has been persisted.
    #[serde(default)]
    pub id: String,
    pub email: String,
    /// Always present on the wire, `null` when unset.
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds an unsaved user with both timestamps set to now.
    pub fn new(
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Self, AppError> {
        validation::require_email(&email)?;
        let now = Utc::now();
        Ok(User {
            id: String::new(),
            email,
            first_name,
            last_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies the present fields of `patch` and re-stamps `updated_at`.
    pub fn apply(mut self, patch: UserPatch) -> Self {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = Some(last_name);
        }
        self.touch();
        self
    }

    /// `updated_at` never drops below `created_at`, even if the wall clock steps back.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }
}

/// Caller-supplied user fields as decoded from the wire.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    /// Discarded on create.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Discarded on create.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Discarded on create.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserDraft {
    pub fn new(
        email: impl Into<String>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Self {
        UserDraft {
            email: email.into(),
            first_name: first_name.map(String::from),
            last_name: last_name.map(String::from),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}
