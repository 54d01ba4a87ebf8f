//! visionlog server library - HTTP surface of the Vision API demo
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod openapi;
pub mod routes;
pub mod state;

pub use auth::{
    AdminContext, ClientInfo, HeaderIdentityProvider, IdentityError, IdentityProvider,
    RequestContext, SessionUser,
};
pub use config::Config;
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::{AppSettings, AppState};
