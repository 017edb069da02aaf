//! Form extraction and client-side validation
//!
//! Every form follows the same shape: read the named fields, check all of
//! them, and either hand back a freshly built value or every field error at
//! once. Nothing here talks to the backend, so an invalid form never costs a
//! round-trip.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{AppConfig, UserCredentials};

// Field names, shared with the views that pre-fill them
pub const FIELD_URL: &str = "url";
pub const FIELD_DB_NAME: &str = "db-name";
pub const FIELD_USERNAME: &str = "username";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_REMEMBER: &str = "remember";

/// Submitted form fields by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value with surrounding whitespace removed; missing reads as empty
    pub fn text(&self, name: &str) -> &str {
        self.get(name).map(str::trim).unwrap_or("")
    }

    /// Checkbox semantics: absent or unchecked is false
    pub fn checked(&self, name: &str) -> bool {
        matches!(
            self.text(name).to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A constraint message attached to one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field errors of one submission, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message reported for `field`
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(value)` when nothing was reported
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .expect("email pattern is valid")
});

/// Shape check for `local@domain.tld`; deliverability is the backend's job.
pub fn is_email(value: &str) -> bool {
    if value.len() > 254 {
        return false;
    }
    match value.rsplit_once('@') {
        Some((local, _)) if local.len() > 64 => false,
        Some((local, _)) if local.starts_with('.') || local.ends_with('.') => false,
        Some((local, _)) if local.contains("..") => false,
        Some(_) => EMAIL_REGEX.is_match(value),
        None => false,
    }
}

fn require(errors: &mut ValidationErrors, data: &FormData, field: &str, message: &str) -> String {
    let value = data.text(field);
    if value.is_empty() {
        errors.add(field, message);
    }
    value.to_string()
}

/// Database connection form: `url`, `db-name`, `username`, `password`
pub fn validate_config_form(data: &FormData) -> Result<AppConfig, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let db_url = require(&mut errors, data, FIELD_URL, "invalid url");
    let db_name = require(&mut errors, data, FIELD_DB_NAME, "invalid database name");
    let db_username = require(&mut errors, data, FIELD_USERNAME, "invalid username");
    // Passwords are taken verbatim, only emptiness is checked
    let db_password = data.get(FIELD_PASSWORD).unwrap_or("").to_string();
    if db_password.is_empty() {
        errors.add(FIELD_PASSWORD, "invalid password");
    }

    errors.into_result(|| AppConfig {
        db_url,
        db_username,
        db_password,
        db_name,
    })
}

/// Validated login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSubmission {
    pub credentials: UserCredentials,
    pub remember: bool,
}

/// Login form: `email`, `password`, `remember`
pub fn validate_login_form(data: &FormData) -> Result<LoginSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = data.text(FIELD_EMAIL).to_string();
    if !is_email(&email) {
        errors.add(FIELD_EMAIL, "invalid email");
    }
    let password = data.get(FIELD_PASSWORD).unwrap_or("").to_string();
    if password.is_empty() {
        errors.add(FIELD_PASSWORD, "invalid password");
    }
    let remember = data.checked(FIELD_REMEMBER);

    errors.into_result(|| LoginSubmission {
        credentials: UserCredentials { email, password },
        remember,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_form() -> FormData {
        FormData::new()
            .with(FIELD_URL, "localhost:5432")
            .with(FIELD_DB_NAME, "syredb")
            .with(FIELD_USERNAME, "syre")
            .with(FIELD_PASSWORD, "secret")
    }

    // ========================================================================
    // Email shape
    // ========================================================================

    #[test]
    fn test_is_email_accepts_common_addresses() {
        for ok in [
            "a@b.co",
            "first.last@example.com",
            "user+tag@sub.domain.org",
            "x_y-z@host-name.io",
        ] {
            assert!(is_email(ok), "{} should be accepted", ok);
        }
    }

    #[test]
    fn test_is_email_rejects_malformed() {
        for bad in [
            "",
            "not-an-email",
            "@example.com",
            "user@",
            "user@localhost",
            "user@@example.com",
            "user@exa mple.com",
            ".user@example.com",
            "us..er@example.com",
            "user@-example.com",
        ] {
            assert!(!is_email(bad), "{} should be rejected", bad);
        }
    }

    // ========================================================================
    // Config form
    // ========================================================================

    #[test]
    fn test_config_form_valid() {
        let config = validate_config_form(&config_form()).unwrap();
        assert_eq!(config, AppConfig::new("localhost:5432", "syre", "secret", "syredb"));
        assert!(config.is_usable());
    }

    #[test]
    fn test_config_form_collects_all_errors() {
        let errors = validate_config_form(&FormData::new()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.for_field(FIELD_URL), Some("invalid url"));
        assert_eq!(errors.for_field(FIELD_DB_NAME), Some("invalid database name"));
        assert_eq!(errors.for_field(FIELD_USERNAME), Some("invalid username"));
        assert_eq!(errors.for_field(FIELD_PASSWORD), Some("invalid password"));
    }

    #[test]
    fn test_config_form_whitespace_only_is_empty() {
        let form = config_form().with(FIELD_URL, "   ");
        let errors = validate_config_form(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].field, FIELD_URL);
    }

    #[test]
    fn test_config_form_keeps_password_verbatim() {
        let form = config_form().with(FIELD_PASSWORD, " padded ");
        assert_eq!(validate_config_form(&form).unwrap().db_password, " padded ");
    }

    // ========================================================================
    // Login form
    // ========================================================================

    #[test]
    fn test_login_form_valid() {
        let form = FormData::new()
            .with(FIELD_EMAIL, "alice@example.com")
            .with(FIELD_PASSWORD, "pw")
            .with(FIELD_REMEMBER, "on");
        let submission = validate_login_form(&form).unwrap();
        assert_eq!(submission.credentials.email, "alice@example.com");
        assert_eq!(submission.credentials.password, "pw");
        assert!(submission.remember);
    }

    #[test]
    fn test_login_form_remember_defaults_off() {
        let form = FormData::new()
            .with(FIELD_EMAIL, "alice@example.com")
            .with(FIELD_PASSWORD, "pw");
        assert!(!validate_login_form(&form).unwrap().remember);
    }

    #[test]
    fn test_login_form_rejects_bad_email_and_empty_password() {
        let form = FormData::new().with(FIELD_EMAIL, "not-an-email");
        let errors = validate_login_form(&form).unwrap_err();
        assert_eq!(errors.for_field(FIELD_EMAIL), Some("invalid email"));
        assert_eq!(errors.for_field(FIELD_PASSWORD), Some("invalid password"));
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.add(FIELD_URL, "invalid url");
        errors.add(FIELD_EMAIL, "invalid email");
        assert_eq!(errors.to_string(), "url: invalid url, email: invalid email");
    }

    #[test]
    fn test_form_data_from_iter() {
        let form: FormData = [("email", "a@b.co"), ("remember", "TRUE")].into_iter().collect();
        assert_eq!(form.get("email"), Some("a@b.co"));
        assert!(form.checked("remember"));
        assert!(!form.checked("missing"));
    }
}
