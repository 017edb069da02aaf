//! Render model for the bootstrap pipeline
//!
//! Front-ends turn a [`View`] into pixels or terminal lines; they never
//! inspect stage internals themselves.

use std::fmt;

use serde::Serialize;

use super::stage::StageId;
use crate::backend::{BackendError, ErrorKind};
use crate::forms::ValidationErrors;
use crate::models::{AppConfig, User};

pub const CONFIG_ERROR_HEADING: &str = "Could not load app config.";
pub const DATABASE_SETUP_HEADING: &str = "Database configuration";
pub const SET_UP_HEADING: &str = "Set up your database connection";
pub const UPDATE_HEADING: &str =
    "Could not connect to the database. Update your connection settings.";
pub const LOGIN_HEADING: &str = "Log in";
pub const SESSION_ERROR_HEADING: &str = "Something went wrong while restoring your session.";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// How a failed connection is presented
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionFraming {
    /// Nothing has been configured yet
    SetUp,
    /// A configuration exists but did not work; carries the raw error text
    Update { message: String },
}

impl ConnectionFraming {
    /// Two-way branch on the exact `FILE_NOT_FOUND` identifier
    pub fn classify(err: &BackendError) -> Self {
        match err.kind() {
            ErrorKind::FileNotFound => ConnectionFraming::SetUp,
            _ => ConnectionFraming::Update {
                message: err.message().to_string(),
            },
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            ConnectionFraming::SetUp => SET_UP_HEADING,
            ConnectionFraming::Update { .. } => UPDATE_HEADING,
        }
    }
}

/// Database form, pre-filled from the current config
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFormView {
    pub url: String,
    pub db_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub errors: ValidationErrors,
    pub message: Option<String>,
}

impl ConfigFormView {
    pub fn prefilled(config: &AppConfig) -> Self {
        Self {
            url: config.db_url.clone(),
            db_name: config.db_name.clone(),
            username: config.db_username.clone(),
            password: config.db_password.clone(),
            errors: ValidationErrors::new(),
            message: None,
        }
    }
}

impl fmt::Debug for ConfigFormView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFormView")
            .field("url", &self.url)
            .field("db_name", &self.db_name)
            .field("username", &self.username)
            .field("password", &"****")
            .field("errors", &self.errors)
            .field("message", &self.message)
            .finish()
    }
}

/// Login form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginFormView {
    pub email: String,
    pub remember: bool,
    pub errors: ValidationErrors,
    pub message: Option<String>,
}

/// What the user should be looking at right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Pipeline not mounted
    Unmounted,
    /// A stage fetch is outstanding
    Loading { stage: StageId, label: String },
    /// Stage 1 failed; only a remount retries
    ConfigError { message: String },
    /// Config is incomplete; no connection was attempted
    DatabaseSetup { form: ConfigFormView },
    /// Connecting failed
    ConnectionError {
        framing: ConnectionFraming,
        form: ConfigFormView,
    },
    /// No authenticated user yet
    Login { form: LoginFormView },
    /// Restoring the session failed
    SessionError { message: String, form: LoginFormView },
    /// All stages satisfied; render the application
    Ready {
        user: User,
        database: String,
        /// Owners and admins get the user management screens
        can_manage_users: bool,
        notice: Option<String>,
    },
}

impl View {
    pub fn heading(&self) -> &str {
        match self {
            View::Unmounted => "",
            View::Loading { label, .. } => label,
            View::ConfigError { .. } => CONFIG_ERROR_HEADING,
            View::DatabaseSetup { .. } => DATABASE_SETUP_HEADING,
            View::ConnectionError { framing, .. } => framing.heading(),
            View::Login { .. } => LOGIN_HEADING,
            View::SessionError { .. } => SESSION_ERROR_HEADING,
            View::Ready { .. } => "Dashboard",
        }
    }

    /// True when the pipeline is waiting on the user rather than a fetch
    pub fn needs_input(&self) -> bool {
        matches!(
            self,
            View::DatabaseSetup { .. }
                | View::ConnectionError { .. }
                | View::Login { .. }
                | View::SessionError { .. }
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, View::Ready { .. })
    }
}
