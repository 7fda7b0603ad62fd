//! Session middleware for `PageForge`.
//!
//! Resolves the session cookie against the session store and injects a
//! [`RequestContext`] into the request extensions for downstream handlers.
//! The admin routes additionally sit behind [`require_login`].

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use pageforge_core::session::Session;

use crate::state::AppState;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "pageforge_session";

/// Fallback when a request carries no usable `Host`.
const DEFAULT_HOST: &str = "localhost";

/// Per-request context injected into request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Host name the user store key is derived from.
    pub host: String,
    /// Session id presented by the client, live or not.
    pub presented_session_id: Option<String>,
    /// The live session, if the client is logged in.
    pub session: Option<Session>,
}

/// Middleware that resolves the session cookie and the request host.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let host = state
        .store_host
        .clone()
        .unwrap_or_else(|| request_host(&req));

    let presented_session_id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty());

    let session = match &presented_session_id {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    req.extensions_mut().insert(RequestContext {
        host,
        presented_session_id,
        session,
    });
    next.run(req).await
}

/// Middleware that sends anonymous requests to the login page.
pub async fn require_login(req: Request, next: Next) -> Response {
    let logged_in = req
        .extensions()
        .get::<RequestContext>()
        .is_some_and(|ctx| ctx.session.is_some());

    if logged_in {
        next.run(req).await
    } else {
        Redirect::to("/login").into_response()
    }
}

/// The session cookie for a freshly started session.
pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

/// A cookie that, once removed from the jar, clears the session cookie.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    session_cookie(String::new(), secure)
}

fn request_host(req: &Request) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()))
        .map(|h| h.trim().to_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_owned())
}
