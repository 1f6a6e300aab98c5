//! Article recommendation service
//!
//! Serves `GET /recommendations?user_id=..` from a latent-factor model and a
//! rating table derived from raw reading sessions. Both are loaded once at
//! startup from an artifact store and shared read-only by every request.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
