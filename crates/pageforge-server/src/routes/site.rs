//! Public site routes: generated pages and uploaded stylesheets.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the site router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pages/{file}", get(view_page))
        .route("/styles/{file}", get(stylesheet))
}

/// Serve a page with the current header and footer in place.
async fn view_page(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Html<String>, AppError> {
    let layout = state.layout.get().await?;
    state
        .pages
        .view(&file, &layout)
        .await?
        .map(Html)
        .ok_or(AppError::NotFound)
}

async fn stylesheet(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.styles.get(&file).await?.ok_or(AppError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], bytes).into_response())
}
