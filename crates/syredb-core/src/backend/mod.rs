//! Backend collaborator interface
//!
//! The client never talks to the database or the credential store itself.
//! Everything goes through [`AppBackend`], whose implementations live outside
//! this crate (the desktop shell) or are scripted for tests and demos.
//!
//! # Error contract
//!
//! Two failure channels exist and must not be confused:
//!
//! - `Err(BackendError)`: the call itself failed (transport, server, missing
//!   config file). The raw message is shown to the user.
//! - `Ok(user)` with `user.id == NIL_USER_ID`: a valid answer meaning "no
//!   session" or "invalid credentials". Callers branch on the value.

pub mod scripted;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AppConfig, User, UserCredentials};

pub use scripted::{Account, BackendCall, Reply, Scenario, ScriptedBackend, ScriptedResponses};

/// No configuration has been persisted yet
pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

/// The backend has no signed-in user for this request
pub const USER_NOT_AUTHENTICATED: &str = "USER_NOT_AUTHENTICATED";

/// Error returned by a backend call, carrying the backend's message verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
#[serde(transparent)]
pub struct BackendError {
    message: String,
}

/// Classification of a [`BackendError`] by exact identifier match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    NotAuthenticated,
    Other,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn file_not_found() -> Self {
        Self::new(FILE_NOT_FOUND)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// No fuzzy matching: `"FILE_NOT_FOUND: config.toml"` is `Other`.
    pub fn kind(&self) -> ErrorKind {
        match self.message.as_str() {
            FILE_NOT_FOUND => ErrorKind::FileNotFound,
            USER_NOT_AUTHENTICATED => ErrorKind::NotAuthenticated,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        self.kind() == ErrorKind::FileNotFound
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Operations exposed by the backend, used for call logs and scripting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendOp {
    GetConfig,
    SaveConfig,
    ConnectToDatabase,
    LoadUserFromSession,
    AuthenticateAndGetUser,
    Logout,
}

impl BackendOp {
    pub const ALL: [BackendOp; 6] = [
        BackendOp::GetConfig,
        BackendOp::SaveConfig,
        BackendOp::ConnectToDatabase,
        BackendOp::LoadUserFromSession,
        BackendOp::AuthenticateAndGetUser,
        BackendOp::Logout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendOp::GetConfig => "get_config",
            BackendOp::SaveConfig => "save_config",
            BackendOp::ConnectToDatabase => "connect_to_database",
            BackendOp::LoadUserFromSession => "load_user_from_session",
            BackendOp::AuthenticateAndGetUser => "authenticate_and_get_user",
            BackendOp::Logout => "logout",
        }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote "App" service the client bootstraps against
#[async_trait]
pub trait AppBackend: Send + Sync {
    /// Load the persisted configuration.
    ///
    /// Fails with [`FILE_NOT_FOUND`] when nothing has been saved yet.
    async fn get_config(&self) -> Result<AppConfig, BackendError>;

    /// Persist a configuration. Subsequent connects use it.
    async fn save_config(&self, config: AppConfig) -> Result<(), BackendError>;

    /// Connect using the last saved configuration
    async fn connect_to_database(&self) -> Result<(), BackendError>;

    /// Restore a remembered session; a nil user means there is none
    async fn load_user_from_session(&self) -> Result<User, BackendError>;

    /// Check credentials; a nil user means they were rejected
    async fn authenticate_and_get_user(
        &self,
        credentials: UserCredentials,
        remember: bool,
    ) -> Result<User, BackendError>;

    /// Forget the remembered session
    async fn logout(&self) -> Result<(), BackendError>;
}
