//! Pure business rules shared by every service operation.
//!
//! Nothing in here touches transport or storage, so each rule can be
//! exercised directly in tests.

use crate::core::errors::{AppError, EMAIL_REQUIRED, ID_REQUIRED, PASSWORD_REQUIRED};

/// A whitespace-only email counts as empty.
pub fn require_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::validation(EMAIL_REQUIRED));
    }
    Ok(())
}

pub fn require_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::validation(ID_REQUIRED));
    }
    Ok(())
}

pub fn require_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::validation(PASSWORD_REQUIRED));
    }
    Ok(())
}

/// Absent fields are left alone; a present email must still be non-empty.
pub fn check_email_change(email: Option<&str>) -> Result<(), AppError> {
    match email {
        Some(email) => require_email(email),
        None => Ok(()),
    }
}

pub fn check_password_change(password: Option<&str>) -> Result<(), AppError> {
    match password {
        Some(password) => require_password(password),
        None => Ok(()),
    }
}
