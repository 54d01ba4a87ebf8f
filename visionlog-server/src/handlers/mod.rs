//! HTTP request handlers
//!
//! This module contains all the request handlers for the endpoints.

pub mod admin;
pub mod health;
pub mod home;
pub mod upload;

pub use crate::state::AppState;
pub use admin::{bigquery_console_handler, init_handler};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use home::{home_handler, IndexTemplate};
pub use upload::upload_handler;
