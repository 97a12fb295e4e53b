//! Blog JSON API backend.
//!
//! Users register, activate their account with an emailed token, log in for a
//! bearer token, then write posts, like them, and comment on them.

pub mod api;
pub mod auth;
pub mod concurrency;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mailer;
pub mod models;
pub mod observability;
pub mod security;
pub mod validator;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
