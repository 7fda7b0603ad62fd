//! Page file rendering.
//!
//! A generated page is stored as a small PHP-style document that pulls in the
//! shared header and footer through include directives. When a page is served
//! the directives are replaced with the current header and footer, so editing
//! the layout updates every page at once.

/// Include directive for the shared header, as written into page files.
pub const HEADER_DIRECTIVE: &str = "<?php include __DIR__ . '/../includes/header.php'; ?>";

/// Include directive for the shared footer, as written into page files.
pub const FOOTER_DIRECTIVE: &str = "<?php include __DIR__ . '/../includes/footer.php'; ?>";

/// Escape text for use in HTML element content and quoted attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Derive a page file name from its title.
///
/// The title is ASCII-lowercased, everything outside `[a-z0-9]` is dropped and
/// `.php` is appended. Returns `None` when nothing is left of the stem.
#[must_use]
pub fn page_filename(title: &str) -> Option<String> {
    let stem: String = title
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    if stem.is_empty() {
        None
    } else {
        Some(format!("{stem}.php"))
    }
}

/// Produce the stored page document.
///
/// `title` and `css` are escaped. `content` is an HTML fragment written by an
/// authenticated operator and goes in verbatim.
#[must_use]
pub fn render_page_file(title: &str, content: &str, css: &str) -> String {
    let title = html_escape(title);
    let css = html_escape(css);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <link rel="stylesheet" href="../styles/{css}">
</head>
<body>
{HEADER_DIRECTIVE}
<h1>{title}</h1>
{content}
{FOOTER_DIRECTIVE}
</body>
</html>
"#
    )
}

/// Replace the include directives in a stored page with `header` and `footer`.
///
/// Anything else in the file is left untouched.
#[must_use]
pub fn expand_includes(file: &str, header: &str, footer: &str) -> String {
    file.replace(HEADER_DIRECTIVE, header)
        .replace(FOOTER_DIRECTIVE, footer)
}
