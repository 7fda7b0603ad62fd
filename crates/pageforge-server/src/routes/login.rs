//! Login form routes.
//!
//! `GET /login` shows the form (or skips to `/admin` when already logged in).
//! `POST /login` checks the credentials, starts a fresh session and sets the
//! session cookie.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tower::limit::ConcurrencyLimitLayer;
use tracing::{info, warn};

use crate::middleware::{RequestContext, session_cookie};
use crate::state::AppState;
use crate::views::{self, LoginView};

/// Concurrent credential checks allowed at once. Each one runs Argon2.
const LOGIN_CONCURRENCY: usize = 8;

const USERNAME_REQUIRED: &str = "Please enter username.";
const PASSWORD_REQUIRED: &str = "Please enter your password.";
const INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Build the login router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/login",
        get(login_form)
            .merge(post(login_submit).layer(ConcurrencyLimitLayer::new(LOGIN_CONCURRENCY))),
    )
}

/// Submitted login fields. Missing fields read as empty.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_form(Extension(ctx): Extension<RequestContext>) -> Response {
    if ctx.session.is_some() {
        return Redirect::to("/admin").into_response();
    }
    Html(views::login_page(&LoginView::default())).into_response()
}

async fn login_submit(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    let password = form.password.trim();

    let mut view = LoginView {
        username: username.to_owned(),
        ..LoginView::default()
    };
    if username.is_empty() {
        view.username_err = Some(USERNAME_REQUIRED.to_owned());
    }
    if password.is_empty() {
        view.password_err = Some(PASSWORD_REQUIRED.to_owned());
    }
    if view.username_err.is_some() || view.password_err.is_some() {
        return Html(views::login_page(&view)).into_response();
    }

    let Some(user) = state.users.authenticate(&ctx.host, username, password).await else {
        warn!(username, "login failed");
        view.login_err = Some(INVALID_CREDENTIALS.to_owned());
        return Html(views::login_page(&view)).into_response();
    };

    let session = state
        .sessions
        .login(ctx.presented_session_id.as_deref(), &user.username, user.role)
        .await;
    info!(username = %user.username, "login succeeded");

    let jar = jar.add(session_cookie(session.id, state.secure_cookies));
    (jar, Redirect::to("/admin")).into_response()
}
