//! End-to-end tests for the `PageForge` HTTP surface.
//!
//! Each test builds the full router over an in-memory backend and drives it
//! with `tower::ServiceExt::oneshot`, carrying the session cookie by hand.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use pageforge_core::users::Role;
use pageforge_server::config::{ServerConfig, StorageBackendType};
use pageforge_server::routes;
use pageforge_server::state::AppState;
use pageforge_storage::{FileBackend, MemoryBackend, StorageBackend};

const HOST: &str = "cms.test";
const BOUNDARY: &str = "pageforge-test-boundary";

// ── Helpers ──────────────────────────────────────────────────────────

async fn app() -> (Router, Arc<AppState>) {
    app_over(Arc::new(MemoryBackend::new())).await
}

async fn app_over(storage: Arc<dyn StorageBackend>) -> (Router, Arc<AppState>) {
    let config = ServerConfig {
        storage_backend: StorageBackendType::Memory,
        secure_cookies: false,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(&storage, &config));
    state.bootstrap().await.unwrap();
    (routes::router(Arc::clone(&state)), state)
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(header::HOST, HOST);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn login_request(username: &str, password: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::HOST, HOST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

/// The `name=value` pair of the session cookie set by `resp`.
fn session_cookie(resp: &Response) -> String {
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("no Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().trim().to_owned()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let resp = send(app, login_request(username, password, None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin");
    session_cookie(&resp)
}

/// Fetch the admin page and pull the CSRF token out of its first form.
async fn csrf_token(app: &Router, cookie: &str) -> String {
    let html = body_text(send(app, get("/admin", Some(cookie))).await).await;
    let marker = "name=\"csrf_token\" value=\"";
    let start = html.find(marker).expect("no csrf field") + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_owned()
}

struct FilePart<'a> {
    field: &'a str,
    filename: &'a str,
    bytes: &'a [u8],
}

fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/css\r\n\r\n",
                file.field, file.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_admin(
    app: &Router,
    cookie: &str,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri("/admin")
        .header(header::HOST, HOST)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, file)))
        .unwrap();
    send(app, req).await
}

/// Log in as the default admin and return `(cookie, csrf)`.
async fn admin_session(app: &Router) -> (String, String) {
    let cookie = login(app, "admin", "password").await;
    let csrf = csrf_token(app, &cookie).await;
    (cookie, csrf)
}

async fn upload_css(app: &Router, cookie: &str, csrf: &str, filename: &str, css: &[u8]) -> String {
    let resp = post_admin(
        app,
        cookie,
        &[("csrf_token", csrf), ("upload_css", "1")],
        Some(FilePart {
            field: "css_file",
            filename,
            bytes: css,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_text(resp).await
}

async fn create_page(app: &Router, cookie: &str, csrf: &str, title: &str, css: &str) -> String {
    let resp = post_admin(
        app,
        cookie,
        &[
            ("csrf_token", csrf),
            ("title", title),
            ("content", "<p>Body text</p>"),
            ("css_choice", css),
            ("create_page", "1"),
        ],
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_text(resp).await
}

// ── Routing & login gate ─────────────────────────────────────────────

#[tokio::test]
async fn root_redirects_to_admin() {
    let (app, _) = app().await;
    let resp = send(&app, get("/", None)).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/admin");
}

#[tokio::test]
async fn anonymous_admin_redirects_to_login() {
    let (app, _) = app().await;
    let resp = send(&app, get("/admin", None)).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login");

    let resp = post_admin(&app, "pageforge_session=bogus", &[("create_page", "1")], None).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn security_headers_on_every_response() {
    let (app, _) = app().await;
    let resp = send(&app, get("/login", None)).await;
    let headers = resp.headers();
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}

// ── Login ────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_form_renders() {
    let (app, _) = app().await;
    let resp = send(&app, get("/login", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("name=\"username\""));
    assert!(html.contains("name=\"password\""));
}

#[tokio::test]
async fn login_reports_missing_fields() {
    let (app, _) = app().await;
    let resp = send(&app, login_request("", "", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let html = body_text(resp).await;
    assert!(html.contains("Please enter username."));
    assert!(html.contains("Please enter your password."));

    let html = body_text(send(&app, login_request("admin", "", None)).await).await;
    assert!(!html.contains("Please enter username."));
    assert!(html.contains("Please enter your password."));
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (app, _) = app().await;
    for (user, pass) in [("admin", "wrong"), ("nobody", "password")] {
        let resp = send(&app, login_request(user, pass, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(resp).await;
        assert!(html.contains("Invalid username or password."));
    }
}

#[tokio::test]
async fn login_issues_fresh_session_cookie() {
    let (app, state) = app().await;
    let resp = send(&app, login_request("admin", "password", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    assert!(raw.starts_with("pageforge_session="));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Strict"));

    let first = session_cookie(&resp);
    let first_id = first.trim_start_matches("pageforge_session=").to_owned();
    assert_eq!(state.sessions.len().await, 1);

    // Logging in again over the live session replaces it.
    let resp = send(&app, login_request("admin", "password", Some(&first))).await;
    let second = session_cookie(&resp);
    assert_ne!(first, second);
    assert_eq!(state.sessions.len().await, 1);
    assert!(state.sessions.get(&first_id).await.is_none());

    let resp = send(&app, get("/admin", Some(&first))).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn login_page_skips_to_admin_when_logged_in() {
    let (app, _) = app().await;
    let cookie = login(&app, "admin", "password").await;
    let resp = send(&app, get("/login", Some(&cookie))).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/admin");
}

#[tokio::test]
async fn logout_ends_session() {
    let (app, state) = app().await;
    let cookie = login(&app, "admin", "password").await;

    let resp = send(&app, get("/logout", Some(&cookie))).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login");
    assert!(state.sessions.is_empty().await);

    let resp = send(&app, get("/admin", Some(&cookie))).await;
    assert_eq!(location(&resp), "/login");
}

// ── Admin page ───────────────────────────────────────────────────────

#[tokio::test]
async fn admin_page_shows_user_and_forms() {
    let (app, _) = app().await;
    let cookie = login(&app, "admin", "password").await;
    let resp = send(&app, get("/admin", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("admin"));
    assert!(html.contains("name=\"create_page\""));
    assert!(html.contains("name=\"upload_css\""));
    assert!(html.contains("name=\"update_template\""));
    assert!(html.contains("name=\"add_user\""));
}

#[tokio::test]
async fn csrf_mismatch_is_forbidden() {
    let (app, state) = app().await;
    let (cookie, csrf) = admin_session(&app).await;
    upload_css(&app, &cookie, &csrf, "site.css", b"body{}").await;

    for token in [None, Some("not-the-token")] {
        let mut fields = vec![
            ("title", "Sneaky"),
            ("content", "<p>x</p>"),
            ("css_choice", "site.css"),
            ("create_page", "1"),
        ];
        if let Some(token) = token {
            fields.push(("csrf_token", token));
        }
        let resp = post_admin(&app, &cookie, &fields, None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
    assert!(state.pages.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn token_from_previous_session_is_rejected() {
    let (app, state) = app().await;
    let (old_cookie, old_csrf) = admin_session(&app).await;
    upload_css(&app, &old_cookie, &old_csrf, "site.css", b"body{}").await;

    // Logging in again over the same browser session replaces it.
    let resp = send(&app, login_request("admin", "password", Some(&old_cookie))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let new_cookie = session_cookie(&resp);
    let new_csrf = csrf_token(&app, &new_cookie).await;
    assert_ne!(old_csrf, new_csrf);

    let stale = [
        ("csrf_token", old_csrf.as_str()),
        ("title", "Stale"),
        ("content", "<p>x</p>"),
        ("css_choice", "site.css"),
        ("create_page", "1"),
    ];
    let resp = post_admin(&app, &new_cookie, &stale, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The old session is gone, so its cookie no longer gets past the gate.
    let resp = post_admin(&app, &old_cookie, &stale, None).await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login");

    assert!(state.pages.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_and_view_page() {
    let (app, _) = app().await;
    let (cookie, csrf) = admin_session(&app).await;

    let html = upload_css(&app, &cookie, &csrf, "site.css", b"body { color: red; }").await;
    assert!(html.contains("Stylesheet site.css uploaded."));

    let html = create_page(&app, &cookie, &csrf, "Hello World", "site.css").await;
    assert!(html.contains("Page created: helloworld.php"));
    assert!(html.contains("/pages/helloworld.php"));

    // Pages are public.
    let resp = send(&app, get("/pages/helloworld.php", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_text(resp).await;
    assert!(page.contains("<title>Hello World</title>"));
    assert!(page.contains("<p>Body text</p>"));
    assert!(page.contains("href=\"../styles/site.css\""));
    assert!(page.contains("<header>"));
    assert!(page.contains("<footer>"));
    assert!(!page.contains("<?php"));
}

#[tokio::test]
async fn create_page_refuses_duplicates_and_unknown_css() {
    let (app, state) = app().await;
    let (cookie, csrf) = admin_session(&app).await;
    upload_css(&app, &cookie, &csrf, "site.css", b"body{}").await;

    create_page(&app, &cookie, &csrf, "About", "site.css").await;
    let html = create_page(&app, &cookie, &csrf, "ABOUT!", "site.css").await;
    assert!(html.contains("A page named about.php already exists."));

    let html = create_page(&app, &cookie, &csrf, "Contact", "missing.css").await;
    assert!(html.contains("The selected stylesheet does not exist."));

    let html = create_page(&app, &cookie, &csrf, "Index", "site.css").await;
    assert!(html.contains("That page name is reserved."));

    assert_eq!(state.pages.list().await.unwrap(), vec!["about.php"]);
}

#[tokio::test]
async fn create_page_requires_every_field() {
    let (app, _) = app().await;
    let (cookie, csrf) = admin_session(&app).await;
    let resp = post_admin(
        &app,
        &cookie,
        &[("csrf_token", csrf.as_str()), ("title", "   "), ("create_page", "1")],
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Please enter a title."));
}

#[tokio::test]
async fn delete_page_and_guard_sentinel() {
    let (app, state) = app().await;
    let (cookie, csrf) = admin_session(&app).await;
    upload_css(&app, &cookie, &csrf, "site.css", b"body{}").await;
    create_page(&app, &cookie, &csrf, "Gone", "site.css").await;

    let delete = |name: &'static str| {
        let app = app.clone();
        let cookie = cookie.clone();
        let csrf = csrf.clone();
        async move {
            let resp = post_admin(
                &app,
                &cookie,
                &[("csrf_token", csrf.as_str()), ("delete_page", name)],
                None,
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            body_text(resp).await
        }
    };

    assert!(delete("index.php").await.contains("That page name is reserved."));
    assert!(delete("../users.json").await.contains("Page not found."));
    assert!(delete("..").await.contains("Invalid page name."));
    assert!(delete("nothere.php").await.contains("Page not found."));
    assert!(delete("gone.php").await.contains("Page gone.php deleted."));

    assert!(state.pages.list().await.unwrap().is_empty());
    // The user store survived the traversal attempt.
    assert!(
        state
            .users
            .authenticate(HOST, "admin", "password")
            .await
            .is_some()
    );
    let resp = send(&app, get("/pages/gone.php", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stylesheet_upload_rules() {
    let (app, state) = app().await;
    let (cookie, csrf) = admin_session(&app).await;

    let html = upload_css(&app, &cookie, &csrf, "evil.js", b"alert(1)").await;
    assert!(html.contains("Only .css files can be uploaded."));

    let html = upload_css(&app, &cookie, &csrf, "empty.css", b"").await;
    assert!(html.contains("Please choose a CSS file to upload."));

    let html = upload_css(&app, &cookie, &csrf, "../../Site Theme.css", b"p{}").await;
    assert!(html.contains("Stylesheet SiteTheme.css uploaded."));

    let html = upload_css(&app, &cookie, &csrf, "SiteTheme.css", b"p{}").await;
    assert!(html.contains("A stylesheet named SiteTheme.css already exists."));

    assert_eq!(state.styles.list().await.unwrap(), vec!["SiteTheme.css"]);

    let resp = send(&app, get("/styles/SiteTheme.css", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
    assert_eq!(body_text(resp).await, "p{}");
}

#[tokio::test]
async fn template_update_applies_to_pages() {
    let (app, _) = app().await;
    let (cookie, csrf) = admin_session(&app).await;
    upload_css(&app, &cookie, &csrf, "site.css", b"body{}").await;
    create_page(&app, &cookie, &csrf, "News", "site.css").await;

    let resp = post_admin(
        &app,
        &cookie,
        &[
            ("csrf_token", csrf.as_str()),
            ("header", "<div id=\"top\">TOP</div>"),
            ("footer", "<div id=\"bottom\">BOTTOM</div>"),
            ("update_template", "1"),
        ],
        None,
    )
    .await;
    assert!(body_text(resp).await.contains("Header and footer saved."));

    let page = body_text(send(&app, get("/pages/news.php", None)).await).await;
    assert!(page.contains("<div id=\"top\">TOP</div>"));
    assert!(page.contains("<div id=\"bottom\">BOTTOM</div>"));

    let resp = post_admin(
        &app,
        &cookie,
        &[
            ("csrf_token", csrf.as_str()),
            ("header", "<p>x</p>"),
            ("footer", "  "),
            ("update_template", "1"),
        ],
        None,
    )
    .await;
    assert!(body_text(resp).await.contains("Header and footer cannot be empty."));
}

#[tokio::test]
async fn admin_adds_users_and_editors_cannot() {
    let (app, state) = app().await;
    let (cookie, csrf) = admin_session(&app).await;

    let add = [
        ("csrf_token", csrf.as_str()),
        ("username", "alice"),
        ("password", "s3cret"),
        ("role", "editor"),
        ("add_user", "1"),
    ];
    let html = body_text(post_admin(&app, &cookie, &add, None).await).await;
    assert!(html.contains("User alice added."));
    let html = body_text(post_admin(&app, &cookie, &add, None).await).await;
    assert!(html.contains("That username is already taken."));

    let users = state.users.load(HOST).await;
    assert_eq!(users["alice"].role, Role::Editor);

    let editor_cookie = login(&app, "alice", "s3cret").await;
    let editor_csrf = csrf_token(&app, &editor_cookie).await;
    let editor_html = body_text(send(&app, get("/admin", Some(&editor_cookie))).await).await;
    assert!(!editor_html.contains("name=\"add_user\""));

    let resp = post_admin(
        &app,
        &editor_cookie,
        &[
            ("csrf_token", editor_csrf.as_str()),
            ("username", "mallory"),
            ("password", "pw"),
            ("add_user", "1"),
        ],
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(body_text(resp).await.contains("You are not allowed to do that."));
    assert!(!state.users.load(HOST).await.contains_key("mallory"));
}

// ── Public site ──────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_and_sentinel_pages_are_not_found() {
    let (app, _) = app().await;
    for uri in ["/pages/nothing.php", "/pages/index.php", "/styles/none.css"] {
        let resp = send(&app, get(uri, None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn file_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = Arc::new(FileBackend::open(dir.path()).unwrap());
        let (app, _) = app_over(storage).await;
        let (cookie, csrf) = admin_session(&app).await;
        upload_css(&app, &cookie, &csrf, "site.css", b"body{}").await;
        create_page(&app, &cookie, &csrf, "Kept", "site.css").await;
        let add = [
            ("csrf_token", csrf.as_str()),
            ("username", "bob"),
            ("password", "hunter2"),
            ("role", "admin"),
            ("add_user", "1"),
        ];
        post_admin(&app, &cookie, &add, None).await;
    }

    assert!(dir.path().join("pages/kept.php").is_file());
    assert!(dir.path().join("pages/index.php").is_file());
    let raw = std::fs::read(dir.path().join("users.json")).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("bob"));

    let storage = Arc::new(FileBackend::open(dir.path()).unwrap());
    let (app, state) = app_over(storage).await;
    let cookie = login(&app, "bob", "hunter2").await;
    let resp = send(&app, get("/pages/kept.php", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.pages.list().await.unwrap(), vec!["kept.php"]);
}
