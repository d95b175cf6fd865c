//! HTTP surface: router, health check and session credentials

pub mod auth;
pub mod routes;

pub use routes::build_router;
