//! Bookshelf catalog server
//!
//! REST JSON API for a library catalog: book CRUD with per-title copy counts, and the
//! borrow/return engine that keeps those counts consistent with the loan audit trail.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
