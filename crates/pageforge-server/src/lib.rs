//! `PageForge` HTTP server.
//!
//! Wires together the core library, storage backend, and HTTP routes into a
//! running Axum server: the login form, the admin page, and public serving
//! of generated pages and uploaded stylesheets.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod views;
