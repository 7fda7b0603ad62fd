//! HTTP route handlers for `PageForge`.
//!
//! Routes are organized by area:
//! - `login`: login form and credential check
//! - `logout`: session teardown
//! - `admin`: the admin page and its form actions (login required)
//! - `site`: public page and stylesheet serving

pub mod admin;
pub mod login;
pub mod logout;
pub mod site;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::middleware as axum_mw;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{require_login, session_middleware};
use crate::state::AppState;

/// Build the full application router, including middleware and headers.
pub fn router(state: Arc<AppState>) -> Router {
    // The login gate only wraps the admin routes.
    let admin_routes = admin::router()
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route_layer(axum_mw::from_fn(require_login));

    Router::new()
        .route("/", get(|| async { Redirect::to("/admin") }))
        .merge(login::router())
        .merge(logout::router())
        .merge(admin_routes)
        .merge(site::router())
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
