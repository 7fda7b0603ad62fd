//! Admin page routes.
//!
//! `GET /admin` renders the admin page. `POST /admin` takes one multipart
//! form per action, checks the CSRF token, parses the form into an
//! [`AdminCommand`], runs it, and re-renders the page with the outcome.
//!
//! Both routes sit behind the login gate; the session is always present.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tracing::{error, info, warn};

use pageforge_core::command::{AdminCommand, FormFields, Upload};
use pageforge_core::error::{LayoutError, PageError, StylesheetError, UserStoreError};
use pageforge_core::layout::Layout;
use pageforge_core::session::Session;
use pageforge_core::users::Role;

use crate::middleware::RequestContext;
use crate::state::AppState;
use crate::views::{self, AdminView, Notice};

const CSRF_FIELD: &str = "csrf_token";
const CSRF_REJECTED: &str = "Your session has expired or the form is stale. Please try again.";
const NOT_PERMITTED: &str = "You are not allowed to do that.";

/// Build the admin router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/admin", get(admin_page).post(admin_action))
}

async fn admin_page(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let Some(session) = &ctx.session else {
        return Redirect::to("/login").into_response();
    };
    render(&state, session, &ctx.host, None, StatusCode::OK).await
}

async fn admin_action(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Response {
    let Some(session) = &ctx.session else {
        return Redirect::to("/login").into_response();
    };

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            let status = err.status();
            warn!(username = %session.username, status = %status, "unreadable admin form");
            return (status, Html(views::error_page(status, &err.body_text()))).into_response();
        }
    };

    if !session.verify_csrf(form.text(CSRF_FIELD).unwrap_or_default()) {
        warn!(username = %session.username, "admin action rejected: CSRF token mismatch");
        let notice = Notice::error(CSRF_REJECTED);
        return render(&state, session, &ctx.host, Some(notice), StatusCode::FORBIDDEN).await;
    }

    let command = match AdminCommand::parse(form) {
        Ok(command) => command,
        Err(e) => {
            info!(username = %session.username, error = %e, "admin form rejected");
            let notice = Notice::error(e.user_message());
            return render(&state, session, &ctx.host, Some(notice), StatusCode::OK).await;
        }
    };

    if !command.permitted_for(session.role) {
        warn!(
            username = %session.username,
            role = %session.role,
            action = command.name(),
            "admin action not permitted for role"
        );
        let notice = Notice::error(NOT_PERMITTED);
        return render(&state, session, &ctx.host, Some(notice), StatusCode::FORBIDDEN).await;
    }

    let notice = execute(&state, &ctx.host, session, command).await;
    render(&state, session, &ctx.host, Some(notice), StatusCode::OK).await
}

/// Run a validated command and describe the outcome.
async fn execute(state: &AppState, host: &str, session: &Session, command: AdminCommand) -> Notice {
    let action = command.name();
    let outcome = match command {
        AdminCommand::CreatePage { title, content, css } => state
            .pages
            .create(&title, &content, &css)
            .await
            .map(|page| Notice::Success {
                text: format!("Page created: {}", page.filename),
                link: Some((page.url(), "View page".to_owned())),
            })
            .map_err(Rejection::from),
        AdminCommand::DeletePage { filename } => state
            .pages
            .delete(&filename)
            .await
            .map(|name| Notice::success(format!("Page {name} deleted.")))
            .map_err(Rejection::from),
        AdminCommand::UploadCss { upload: Upload { filename, bytes } } => state
            .styles
            .upload(&filename, &bytes)
            .await
            .map(|name| Notice::success(format!("Stylesheet {name} uploaded.")))
            .map_err(Rejection::from),
        AdminCommand::UpdateTemplate { header, footer } => state
            .layout
            .update(&header, &footer)
            .await
            .map(|()| Notice::success("Header and footer saved."))
            .map_err(Rejection::from),
        AdminCommand::AddUser {
            username,
            password,
            role,
        } => state
            .users
            .add_user(host, &username, &password, role)
            .await
            .map(|()| Notice::success(format!("User {username} added.")))
            .map_err(Rejection::from),
    };

    match outcome {
        Ok(notice) => {
            info!(username = %session.username, action, "admin action completed");
            notice
        }
        Err(rejection) => {
            if rejection.internal {
                error!(username = %session.username, action, error = %rejection.detail, "admin action failed");
            } else {
                info!(username = %session.username, action, error = %rejection.detail, "admin action refused");
            }
            Notice::error(rejection.message)
        }
    }
}

/// A failed command: what to log and what to show.
struct Rejection {
    detail: String,
    message: String,
    internal: bool,
}

impl From<PageError> for Rejection {
    fn from(err: PageError) -> Self {
        Self {
            internal: matches!(err, PageError::Storage(_)),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

impl From<StylesheetError> for Rejection {
    fn from(err: StylesheetError) -> Self {
        Self {
            internal: matches!(err, StylesheetError::Storage(_)),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

impl From<LayoutError> for Rejection {
    fn from(err: LayoutError) -> Self {
        Self {
            internal: matches!(err, LayoutError::Storage(_)),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

impl From<UserStoreError> for Rejection {
    fn from(err: UserStoreError) -> Self {
        Self {
            internal: !matches!(err, UserStoreError::Duplicate { .. }),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

/// Collect every multipart field into a [`FormFields`].
async fn read_form(mut multipart: Multipart) -> Result<FormFields, axum::extract::multipart::MultipartError> {
    let mut form = FormFields::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if let Some(filename) = field.file_name().map(str::to_owned) {
            let bytes = field.bytes().await?;
            form.insert_file(
                name,
                Upload {
                    filename,
                    bytes: bytes.to_vec(),
                },
            );
        } else {
            let value = field.text().await?;
            form.insert_text(name, value);
        }
    }
    Ok(form)
}

/// Render the admin page with current listings.
async fn render(
    state: &AppState,
    session: &Session,
    host: &str,
    notice: Option<Notice>,
    status: StatusCode,
) -> Response {
    let pages = state.pages.list().await.unwrap_or_else(|e| {
        error!(error = %e, "failed to list pages");
        Vec::new()
    });
    let styles = state.styles.list().await.unwrap_or_else(|e| {
        error!(error = %e, "failed to list stylesheets");
        Vec::new()
    });
    let layout = state.layout.get().await.unwrap_or_else(|e| {
        error!(error = %e, "failed to read layout");
        Layout::default()
    });
    let users = if session.role == Role::Admin {
        let users = state.users.load(host).await;
        Some(users.into_iter().map(|(name, record)| (name, record.role)).collect())
    } else {
        None
    };

    let view = AdminView {
        username: session.username.clone(),
        role: session.role,
        csrf_token: session.csrf_token.clone(),
        notice,
        pages,
        styles,
        users,
        header: layout.header,
        footer: layout.footer,
    };
    (status, Html(views::admin_page(&view))).into_response()
}
