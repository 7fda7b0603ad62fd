//! HTML views for the login form, the admin page, and error pages.
//!
//! Templates are plain constants with `{{NAME}}` placeholders. Values are
//! substituted in a single pass, so text inserted for one placeholder is
//! never scanned for another. Callers escape values; [`fill`] does not.

use std::fmt::Write as _;

use axum::http::StatusCode;

use pageforge_core::render::html_escape;
use pageforge_core::users::Role;

/// Replace every `{{NAME}}` in `template` with its value from `vars`.
///
/// Unknown placeholders are dropped.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if let Some((_, value)) = vars.iter().find(|(key, _)| *key == name) {
            out.push_str(value);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

// ── Login ────────────────────────────────────────────────────────────

/// What the login form shows.
#[derive(Debug, Default, Clone)]
pub struct LoginView {
    /// Username to echo back into the form.
    pub username: String,
    pub username_err: Option<String>,
    pub password_err: Option<String>,
    pub login_err: Option<String>,
}

/// Render the login page.
pub fn login_page(view: &LoginView) -> String {
    let login_err = view
        .login_err
        .as_deref()
        .map(|e| format!("<div class=\"error\">{}</div>", html_escape(e)))
        .unwrap_or_default();
    let field_err = |err: Option<&str>| {
        err.map(|e| format!("<div class=\"invalid-feedback\">{}</div>", html_escape(e)))
            .unwrap_or_default()
    };
    let invalid = |has_err: bool| if has_err { "is-invalid" } else { "" };
    let username = html_escape(&view.username);
    let username_err = field_err(view.username_err.as_deref());
    let password_err = field_err(view.password_err.as_deref());

    fill(
        LOGIN_HTML,
        &[
            ("LOGIN_ERROR", login_err.as_str()),
            ("USERNAME", username.as_str()),
            ("USERNAME_CLASS", invalid(view.username_err.is_some())),
            ("USERNAME_ERROR", username_err.as_str()),
            ("PASSWORD_CLASS", invalid(view.password_err.is_some())),
            ("PASSWORD_ERROR", password_err.as_str()),
        ],
    )
}

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Login - PageForge</title>
    <style>
        body { font-family: Arial, sans-serif; background-color: #f5f5f5; margin: 0; padding: 0; display: flex; justify-content: center; align-items: center; height: 100vh; }
        .login-container { background-color: #fff; padding: 2rem; border-radius: 5px; box-shadow: 0 0 10px rgba(0,0,0,0.1); width: 100%; max-width: 400px; }
        h2 { margin-top: 0; color: #333; text-align: center; }
        .form-group { margin-bottom: 1rem; }
        label { display: block; margin-bottom: 0.5rem; font-weight: bold; }
        input[type="text"], input[type="password"] { width: 100%; padding: 0.5rem; font-size: 1rem; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }
        input.is-invalid { border-color: #dc3545; }
        .btn { background-color: #4CAF50; color: white; padding: 0.75rem 1rem; border: none; border-radius: 4px; cursor: pointer; font-size: 1rem; width: 100%; }
        .btn:hover { background-color: #45a049; }
        .error { color: #dc3545; margin-bottom: 1rem; text-align: center; }
        .invalid-feedback { color: #dc3545; font-size: 0.875rem; margin-top: 0.25rem; }
    </style>
</head>
<body>
    <div class="login-container">
        <h2>Login</h2>
        {{LOGIN_ERROR}}
        <form action="/login" method="post">
            <div class="form-group">
                <label for="username">Username</label>
                <input type="text" name="username" id="username" class="{{USERNAME_CLASS}}" value="{{USERNAME}}">
                {{USERNAME_ERROR}}
            </div>
            <div class="form-group">
                <label for="password">Password</label>
                <input type="password" name="password" id="password" class="{{PASSWORD_CLASS}}">
                {{PASSWORD_ERROR}}
            </div>
            <div class="form-group">
                <input type="submit" class="btn" value="Login">
            </div>
        </form>
    </div>
</body>
</html>
"#;

// ── Admin ────────────────────────────────────────────────────────────

/// Outcome banner shown above the admin forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success {
        text: String,
        /// Optional `(href, label)` link after the text.
        link: Option<(String, String)>,
    },
    Error(String),
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success {
            text: text.into(),
            link: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }

    fn render(&self) -> String {
        match self {
            Self::Success { text, link } => {
                let mut html = format!("<div class=\"notice success\">{}", html_escape(text));
                if let Some((href, label)) = link {
                    let _ = write!(
                        html,
                        " <a href=\"{}\">{}</a>",
                        html_escape(href),
                        html_escape(label)
                    );
                }
                html.push_str("</div>");
                html
            }
            Self::Error(text) => format!("<div class=\"notice error\">{}</div>", html_escape(text)),
        }
    }
}

/// Everything the admin page displays.
#[derive(Debug, Clone)]
pub struct AdminView {
    pub username: String,
    pub role: Role,
    pub csrf_token: String,
    pub notice: Option<Notice>,
    pub pages: Vec<String>,
    pub styles: Vec<String>,
    /// `(username, role)` pairs; `None` hides the user section.
    pub users: Option<Vec<(String, Role)>>,
    pub header: String,
    pub footer: String,
}

/// Render the admin page.
pub fn admin_page(view: &AdminView) -> String {
    let csrf = html_escape(&view.csrf_token);
    let notice = view.notice.as_ref().map(Notice::render).unwrap_or_default();

    let css_options = options(&view.styles, "No stylesheets uploaded yet");
    let page_options = options(&view.pages, "No pages yet");
    let page_list = if view.pages.is_empty() {
        "<p class=\"muted\">No pages yet.</p>".to_owned()
    } else {
        let mut list = String::from("<ul>");
        for page in &view.pages {
            let page = html_escape(page);
            let _ = write!(list, "<li><a href=\"/pages/{page}\">{page}</a></li>");
        }
        list.push_str("</ul>");
        list
    };

    let users_section = view
        .users
        .as_deref()
        .map(|users| {
            let mut rows = String::new();
            for (name, role) in users {
                let _ = write!(
                    rows,
                    "<tr><td>{}</td><td>{}</td></tr>",
                    html_escape(name),
                    role.as_str()
                );
            }
            fill(
                USERS_SECTION_HTML,
                &[("CSRF", csrf.as_str()), ("USER_ROWS", rows.as_str())],
            )
        })
        .unwrap_or_default();

    let username = html_escape(&view.username);
    let header = html_escape(&view.header);
    let footer = html_escape(&view.footer);

    fill(
        ADMIN_HTML,
        &[
            ("USERNAME", username.as_str()),
            ("ROLE", view.role.as_str()),
            ("NOTICE", notice.as_str()),
            ("CSRF", csrf.as_str()),
            ("CSS_OPTIONS", css_options.as_str()),
            ("PAGE_OPTIONS", page_options.as_str()),
            ("PAGE_LIST", page_list.as_str()),
            ("HEADER", header.as_str()),
            ("FOOTER", footer.as_str()),
            ("USERS_SECTION", users_section.as_str()),
        ],
    )
}

fn options(names: &[String], empty_label: &str) -> String {
    if names.is_empty() {
        return format!("<option value=\"\" disabled selected>{}</option>", html_escape(empty_label));
    }
    let mut html = String::new();
    for name in names {
        let name = html_escape(name);
        let _ = write!(html, "<option value=\"{name}\">{name}</option>");
    }
    html
}

const ADMIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin - PageForge</title>
    <style>
        body { font-family: Arial, sans-serif; background-color: #f5f5f5; margin: 0; color: #333; }
        .topbar { display: flex; justify-content: space-between; align-items: center; background: #fff; padding: 1rem 2rem; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
        .topbar form { margin: 0; }
        main { max-width: 860px; margin: 2rem auto; padding: 0 1rem; }
        section { background: #fff; padding: 1.5rem 2rem; border-radius: 5px; box-shadow: 0 0 10px rgba(0,0,0,0.1); margin-bottom: 1.5rem; }
        h2 { margin-top: 0; }
        label { display: block; margin: 0.75rem 0 0.25rem; font-weight: bold; }
        input[type="text"], input[type="password"], textarea, select { width: 100%; padding: 0.5rem; font-size: 1rem; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }
        textarea { min-height: 8rem; font-family: monospace; }
        .btn { background-color: #4CAF50; color: white; padding: 0.6rem 1.2rem; border: none; border-radius: 4px; cursor: pointer; font-size: 1rem; margin-top: 1rem; }
        .btn:hover { background-color: #45a049; }
        .btn-danger { background-color: #dc3545; }
        .btn-danger:hover { background-color: #c82333; }
        .btn-link { background: none; border: none; color: #4CAF50; cursor: pointer; font-size: 1rem; }
        .notice { padding: 0.75rem 1rem; border-radius: 4px; margin-bottom: 1.5rem; }
        .notice.success { background: #e8f5e9; color: #2e7d32; }
        .notice.error { background: #fdecea; color: #dc3545; }
        .muted { color: #888; }
        table { width: 100%; border-collapse: collapse; }
        td, th { text-align: left; padding: 0.4rem; border-bottom: 1px solid #eee; }
    </style>
</head>
<body>
<div class="topbar">
    <strong>PageForge</strong>
    <span>Logged in as {{USERNAME}} ({{ROLE}})</span>
    <form action="/logout" method="post"><button type="submit" class="btn-link">Logout</button></form>
</div>
<main>
{{NOTICE}}
<section>
    <h2>Create a New Page</h2>
    <form action="/admin" method="post" enctype="multipart/form-data">
        <input type="hidden" name="csrf_token" value="{{CSRF}}">
        <label for="title">Title</label>
        <input type="text" name="title" id="title" required>
        <label for="content">Content</label>
        <textarea name="content" id="content" required></textarea>
        <label for="css_choice">Stylesheet</label>
        <select name="css_choice" id="css_choice">{{CSS_OPTIONS}}</select>
        <button type="submit" name="create_page" value="1" class="btn">Create Page</button>
    </form>
</section>
<section>
    <h2>Pages</h2>
    {{PAGE_LIST}}
    <form action="/admin" method="post" enctype="multipart/form-data">
        <input type="hidden" name="csrf_token" value="{{CSRF}}">
        <label for="delete_page">Delete a page</label>
        <select name="delete_page" id="delete_page">{{PAGE_OPTIONS}}</select>
        <button type="submit" class="btn btn-danger">Delete Page</button>
    </form>
</section>
<section>
    <h2>Upload New CSS</h2>
    <form action="/admin" method="post" enctype="multipart/form-data">
        <input type="hidden" name="csrf_token" value="{{CSRF}}">
        <input type="file" name="css_file" accept=".css,text/css">
        <button type="submit" name="upload_css" value="1" class="btn">Upload</button>
    </form>
</section>
<section>
    <h2>Header and Footer</h2>
    <form action="/admin" method="post" enctype="multipart/form-data">
        <input type="hidden" name="csrf_token" value="{{CSRF}}">
        <label for="header">Header</label>
        <textarea name="header" id="header">{{HEADER}}</textarea>
        <label for="footer">Footer</label>
        <textarea name="footer" id="footer">{{FOOTER}}</textarea>
        <button type="submit" name="update_template" value="1" class="btn">Save Templates</button>
    </form>
</section>
{{USERS_SECTION}}
</main>
</body>
</html>
"#;

const USERS_SECTION_HTML: &str = r#"<section>
    <h2>Users</h2>
    <table><tr><th>Username</th><th>Role</th></tr>{{USER_ROWS}}</table>
    <form action="/admin" method="post" enctype="multipart/form-data">
        <input type="hidden" name="csrf_token" value="{{CSRF}}">
        <label for="new_username">Username</label>
        <input type="text" name="username" id="new_username" required>
        <label for="new_password">Password</label>
        <input type="password" name="password" id="new_password" required>
        <label for="role">Role</label>
        <select name="role" id="role"><option value="editor">editor</option><option value="admin">admin</option></select>
        <button type="submit" name="add_user" value="1" class="btn">Add User</button>
    </form>
</section>"#;

// ── Errors ───────────────────────────────────────────────────────────

/// Render a minimal error page.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let message = html_escape(message);
    fill(
        ERROR_HTML,
        &[("STATUS", status.as_str()), ("MESSAGE", message.as_str())],
    )
}

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{{STATUS}} - PageForge</title>
<style>body { font-family: Arial, sans-serif; background-color: #f5f5f5; text-align: center; padding-top: 15vh; color: #333; }</style>
</head>
<body><h1>{{STATUS}}</h1><p>{{MESSAGE}}</p><p><a href="/admin">Back to admin</a></p></body>
</html>
"#;
