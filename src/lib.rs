pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;

pub use api::{AppState, app};
pub use config::AppConfig;
pub use crate::core::errors::AppError;
pub use crate::core::services::{AccountService, UserService};

#[cfg(test)]
mod tests;
