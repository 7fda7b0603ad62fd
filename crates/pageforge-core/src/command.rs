//! Admin form commands.
//!
//! The admin page posts one multipart form per action. The action is chosen
//! by which submit field is present; the first match wins, in this order:
//!
//! | field             | command                          |
//! |-------------------|----------------------------------|
//! | `create_page`     | [`AdminCommand::CreatePage`]     |
//! | `delete_page`     | [`AdminCommand::DeletePage`]     |
//! | `upload_css`      | [`AdminCommand::UploadCss`]      |
//! | `update_template` | [`AdminCommand::UpdateTemplate`] |
//! | `add_user`        | [`AdminCommand::AddUser`]        |
//!
//! Parsing only checks the shape of the submission. Rules that need storage
//! (duplicates, existence) are enforced by the stores.

use std::collections::HashMap;
use std::fmt;

use crate::error::CommandError;
use crate::users::Role;

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 64;

/// An uploaded file from a multipart form.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The decoded fields of a submitted form.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a text field. A repeated name keeps the last value.
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.insert(name.into(), value.into());
    }

    /// Record a file field. A repeated name keeps the last file.
    pub fn insert_file(&mut self, name: impl Into<String>, upload: Upload) {
        self.files.insert(name.into(), upload);
    }

    /// A text field's raw value.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Whether a field of either kind was submitted.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.text.contains_key(name) || self.files.contains_key(name)
    }

    /// Take a file field out of the form.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    fn required(&self, name: &'static str) -> Result<&str, CommandError> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CommandError::MissingField { field: name })
    }
}

/// One validated admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    CreatePage {
        title: String,
        content: String,
        css: String,
    },
    DeletePage {
        filename: String,
    },
    UploadCss {
        upload: Upload,
    },
    UpdateTemplate {
        header: String,
        footer: String,
    },
    AddUser {
        username: String,
        password: String,
        role: Role,
    },
}

impl AdminCommand {
    /// Turn a submitted form into a command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownAction`] if no action field is present,
    /// or the first field-level problem of the chosen action.
    pub fn parse(mut form: FormFields) -> Result<Self, CommandError> {
        if form.has("create_page") {
            parse_create_page(&form)
        } else if form.has("delete_page") {
            parse_delete_page(&form)
        } else if form.has("upload_css") {
            parse_upload_css(&mut form)
        } else if form.has("update_template") {
            parse_update_template(&form)
        } else if form.has("add_user") {
            parse_add_user(&form)
        } else {
            Err(CommandError::UnknownAction)
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatePage { .. } => "create_page",
            Self::DeletePage { .. } => "delete_page",
            Self::UploadCss { .. } => "upload_css",
            Self::UpdateTemplate { .. } => "update_template",
            Self::AddUser { .. } => "add_user",
        }
    }

    /// Whether a session with `role` may run this command.
    ///
    /// User management is reserved for admins.
    #[must_use]
    pub fn permitted_for(&self, role: Role) -> bool {
        match self {
            Self::AddUser { .. } => role == Role::Admin,
            _ => true,
        }
    }
}

fn parse_create_page(form: &FormFields) -> Result<AdminCommand, CommandError> {
    let title = form.required("title")?;
    let content = form.required("content")?;
    let css = form.required("css_choice")?;
    Ok(AdminCommand::CreatePage {
        title: title.to_owned(),
        content: content.to_owned(),
        css: css.to_owned(),
    })
}

fn parse_delete_page(form: &FormFields) -> Result<AdminCommand, CommandError> {
    let filename = form.required("delete_page")?;
    Ok(AdminCommand::DeletePage {
        filename: filename.to_owned(),
    })
}

fn parse_upload_css(form: &mut FormFields) -> Result<AdminCommand, CommandError> {
    let upload = form
        .take_file("css_file")
        .filter(|upload| !upload.filename.trim().is_empty())
        .ok_or(CommandError::MissingField { field: "css_file" })?;
    Ok(AdminCommand::UploadCss { upload })
}

fn parse_update_template(form: &FormFields) -> Result<AdminCommand, CommandError> {
    let header = form.required("header")?;
    let footer = form.required("footer")?;
    Ok(AdminCommand::UpdateTemplate {
        header: header.to_owned(),
        footer: footer.to_owned(),
    })
}

fn parse_add_user(form: &FormFields) -> Result<AdminCommand, CommandError> {
    let username = form.required("username")?;
    validate_username(username)?;
    let password = form.required("password")?;
    let role = match form.text("role").map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::Editor,
        Some(raw) => raw.parse().map_err(|_| CommandError::InvalidField {
            field: "role",
            reason: "Please choose a valid role.".to_owned(),
        })?,
    };
    Ok(AdminCommand::AddUser {
        username: username.to_owned(),
        password: password.to_owned(),
        role,
    })
}

/// Usernames are 1 to 64 characters of `[A-Za-z0-9_.-]`.
///
/// # Errors
///
/// Returns [`CommandError::InvalidField`] for anything else.
pub fn validate_username(username: &str) -> Result<(), CommandError> {
    let ok = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(CommandError::InvalidField {
            field: "username",
            reason: format!(
                "Usernames must be 1 to {MAX_USERNAME_LEN} letters, digits, dots, dashes or underscores."
            ),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> FormFields {
        let mut form = FormFields::new();
        for (name, value) in fields {
            form.insert_text(*name, *value);
        }
        form
    }

    #[test]
    fn create_page_trims_and_validates() {
        let cmd = AdminCommand::parse(form(&[
            ("create_page", ""),
            ("title", "  About  "),
            ("content", "<p>x</p>\n"),
            ("css_choice", "site.css"),
        ]))
        .unwrap();
        assert_eq!(
            cmd,
            AdminCommand::CreatePage {
                title: "About".to_owned(),
                content: "<p>x</p>".to_owned(),
                css: "site.css".to_owned(),
            }
        );
    }

    #[test]
    fn create_page_reports_first_missing_field() {
        let err = AdminCommand::parse(form(&[("create_page", ""), ("title", "  ")])).unwrap_err();
        assert_eq!(err, CommandError::MissingField { field: "title" });
        assert_eq!(err.user_message(), "Please enter a title.");

        let err = AdminCommand::parse(form(&[
            ("create_page", ""),
            ("title", "About"),
            ("content", "x"),
        ]))
        .unwrap_err();
        assert_eq!(err, CommandError::MissingField { field: "css_choice" });
    }

    #[test]
    fn delete_page_takes_value_of_action_field() {
        let cmd = AdminCommand::parse(form(&[("delete_page", "about.php")])).unwrap();
        assert_eq!(
            cmd,
            AdminCommand::DeletePage {
                filename: "about.php".to_owned()
            }
        );
        let err = AdminCommand::parse(form(&[("delete_page", "")])).unwrap_err();
        assert_eq!(err, CommandError::MissingField { field: "delete_page" });
    }

    #[test]
    fn upload_requires_file() {
        let err = AdminCommand::parse(form(&[("upload_css", "")])).unwrap_err();
        assert_eq!(err, CommandError::MissingField { field: "css_file" });

        let mut with_file = form(&[("upload_css", "")]);
        with_file.insert_file(
            "css_file",
            Upload {
                filename: "site.css".to_owned(),
                bytes: b"body{}".to_vec(),
            },
        );
        let cmd = AdminCommand::parse(with_file).unwrap();
        assert!(matches!(cmd, AdminCommand::UploadCss { ref upload } if upload.filename == "site.css"));
    }

    #[test]
    fn update_template_requires_both() {
        let err = AdminCommand::parse(form(&[
            ("update_template", ""),
            ("header", "<h>"),
            ("footer", " "),
        ]))
        .unwrap_err();
        assert_eq!(err.user_message(), "Header and footer cannot be empty.");
    }

    #[test]
    fn add_user_defaults_to_editor() {
        let cmd = AdminCommand::parse(form(&[
            ("add_user", ""),
            ("username", "alice"),
            ("password", "pw"),
        ]))
        .unwrap();
        assert!(matches!(cmd, AdminCommand::AddUser { role: Role::Editor, .. }));
        assert!(!cmd.permitted_for(Role::Editor));
        assert!(cmd.permitted_for(Role::Admin));
    }

    #[test]
    fn add_user_rejects_bad_role_and_username() {
        let err = AdminCommand::parse(form(&[
            ("add_user", ""),
            ("username", "alice"),
            ("password", "pw"),
            ("role", "root"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidField { field: "role", .. }));

        let err = AdminCommand::parse(form(&[
            ("add_user", ""),
            ("username", "al ice"),
            ("password", "pw"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidField { field: "username", .. }));
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("a").is_ok());
        assert!(validate_username("first.last-2_x").is_ok());
        assert!(validate_username(&"a".repeat(64)).is_ok());
        assert!(validate_username(&"a".repeat(65)).is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("<script>").is_err());
        assert!(validate_username("ünï").is_err());
    }

    #[test]
    fn first_action_wins() {
        let cmd = AdminCommand::parse(form(&[
            ("delete_page", "about.php"),
            ("create_page", ""),
            ("title", "T"),
            ("content", "C"),
            ("css_choice", "s.css"),
        ]))
        .unwrap();
        assert_eq!(cmd.name(), "create_page");
    }

    #[test]
    fn no_action_is_unknown() {
        let err = AdminCommand::parse(form(&[("title", "x")])).unwrap_err();
        assert_eq!(err, CommandError::UnknownAction);
    }

    #[test]
    fn non_admin_commands_are_open_to_editors() {
        let cmd = AdminCommand::parse(form(&[("delete_page", "a.php")])).unwrap();
        assert!(cmd.permitted_for(Role::Editor));
    }
}
