//! `GET`/`POST /logout`: end the session and clear the cookie.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::middleware::{RequestContext, expired_session_cookie};
use crate::state::AppState;

/// Build the logout router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/logout", get(logout).post(logout))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Response {
    if let Some(id) = &ctx.presented_session_id {
        state.sessions.destroy(id).await;
    }
    let jar = jar.remove(expired_session_cookie(state.secure_cookies));
    (jar, Redirect::to("/login")).into_response()
}
