//! Scripted backend
//!
//! An in-process [`AppBackend`] driven by canned replies. Used by the test
//! suites and by the CLI to walk the bootstrap pipeline without a desktop
//! shell or a database.
//!
//! Each operation first consumes its queue of scripted replies. Once a queue
//! is empty the backend falls back to a small stateful model of the real
//! service: saved config, remembered session and an account table.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::{AppBackend, BackendError, BackendOp};
use crate::error::Result;
use crate::models::{AppConfig, User, UserCredentials};

/// A canned reply: `{"ok": value}` or `{"err": "message"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply<T> {
    Ok(T),
    Err(BackendError),
}

impl<T> Reply<T> {
    pub fn into_result(self) -> std::result::Result<T, BackendError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Err(err) => Err(err),
        }
    }
}

impl<T> From<std::result::Result<T, BackendError>> for Reply<T> {
    fn from(result: std::result::Result<T, BackendError>) -> Self {
        match result {
            Ok(value) => Reply::Ok(value),
            Err(err) => Reply::Err(err),
        }
    }
}

/// Known login for the fallback authentication model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
    pub user: User,
}

/// Per-operation reply queues, consumed front to back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedResponses {
    pub get_config: VecDeque<Reply<AppConfig>>,
    pub save_config: VecDeque<Reply<()>>,
    pub connect_to_database: VecDeque<Reply<()>>,
    pub load_user_from_session: VecDeque<Reply<User>>,
    pub authenticate_and_get_user: VecDeque<Reply<User>>,
    pub logout: VecDeque<Reply<()>>,
}

impl ScriptedResponses {
    /// Number of queued replies per operation
    pub fn queued(&self, op: BackendOp) -> usize {
        match op {
            BackendOp::GetConfig => self.get_config.len(),
            BackendOp::SaveConfig => self.save_config.len(),
            BackendOp::ConnectToDatabase => self.connect_to_database.len(),
            BackendOp::LoadUserFromSession => self.load_user_from_session.len(),
            BackendOp::AuthenticateAndGetUser => self.authenticate_and_get_user.len(),
            BackendOp::Logout => self.logout.len(),
        }
    }
}

/// Serialized description of a backend, loaded by the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Config already persisted before the client starts
    pub saved_config: Option<AppConfig>,
    /// User restored by `load_user_from_session`
    pub session_user: Option<User>,
    pub accounts: Vec<Account>,
    pub responses: ScriptedResponses,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Example used by `syredb scenario template`
    pub fn template() -> Self {
        let owner = User {
            id: uuid::Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001),
            email: "owner@example.com".to_string(),
            name: "Owner".to_string(),
            role: crate::models::UserRole::Owner,
            account_status: crate::models::AccountStatus::Active,
        };

        let mut responses = ScriptedResponses::default();
        responses
            .connect_to_database
            .push_back(Reply::Err(BackendError::new("connection refused")));

        Self {
            saved_config: Some(AppConfig::new(
                "localhost:5432",
                "syre",
                "change-me",
                "syredb",
            )),
            session_user: None,
            accounts: vec![Account {
                email: owner.email.clone(),
                password: "change-me".to_string(),
                user: owner,
            }],
            responses,
        }
    }
}

/// A call received by the scripted backend, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetConfig,
    SaveConfig(AppConfig),
    ConnectToDatabase,
    LoadUserFromSession,
    AuthenticateAndGetUser { email: String, remember: bool },
    Logout,
}

impl BackendCall {
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::GetConfig => BackendOp::GetConfig,
            BackendCall::SaveConfig(_) => BackendOp::SaveConfig,
            BackendCall::ConnectToDatabase => BackendOp::ConnectToDatabase,
            BackendCall::LoadUserFromSession => BackendOp::LoadUserFromSession,
            BackendCall::AuthenticateAndGetUser { .. } => BackendOp::AuthenticateAndGetUser,
            BackendCall::Logout => BackendOp::Logout,
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    saved_config: Option<AppConfig>,
    session_user: Option<User>,
    accounts: Vec<Account>,
    responses: ScriptedResponses,
    calls: Vec<BackendCall>,
}

/// In-process backend answering from a script
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<ScriptState>,
    holds: Mutex<HashMap<BackendOp, Arc<Semaphore>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                saved_config: scenario.saved_config,
                session_user: scenario.session_user,
                accounts: scenario.accounts,
                responses: scenario.responses,
                calls: Vec::new(),
            }),
            holds: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_saved_config(self, config: AppConfig) -> Self {
        self.state().saved_config = Some(config);
        self
    }

    pub fn with_session_user(self, user: User) -> Self {
        self.state().session_user = Some(user);
        self
    }

    pub fn with_account(self, email: &str, password: &str, user: User) -> Self {
        self.state().accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
            user,
        });
        self
    }

    pub fn push_get_config(&self, reply: impl Into<Reply<AppConfig>>) -> &Self {
        self.state().responses.get_config.push_back(reply.into());
        self
    }

    pub fn push_save_config(&self, reply: impl Into<Reply<()>>) -> &Self {
        self.state().responses.save_config.push_back(reply.into());
        self
    }

    pub fn push_connect(&self, reply: impl Into<Reply<()>>) -> &Self {
        self.state()
            .responses
            .connect_to_database
            .push_back(reply.into());
        self
    }

    pub fn push_load_session(&self, reply: impl Into<Reply<User>>) -> &Self {
        self.state()
            .responses
            .load_user_from_session
            .push_back(reply.into());
        self
    }

    pub fn push_authenticate(&self, reply: impl Into<Reply<User>>) -> &Self {
        self.state()
            .responses
            .authenticate_and_get_user
            .push_back(reply.into());
        self
    }

    pub fn push_logout(&self, reply: impl Into<Reply<()>>) -> &Self {
        self.state().responses.logout.push_back(reply.into());
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: BackendOp) -> usize {
        self.state().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn saved_config(&self) -> Option<AppConfig> {
        self.state().saved_config.clone()
    }

    pub fn session_user(&self) -> Option<User> {
        self.state().session_user.clone()
    }

    /// Park every future call to `op` until [`step`](Self::step) or
    /// [`release`](Self::release). Calls are still logged on arrival.
    pub fn hold(&self, op: BackendOp) {
        self.holds().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let one parked call to `op` through
    pub fn step(&self, op: BackendOp) {
        if let Some(gate) = self.holds().get(&op) {
            gate.add_permits(1);
        }
    }

    /// Stop parking calls to `op` and let the parked ones through
    pub fn release(&self, op: BackendOp) {
        if let Some(gate) = self.holds().remove(&op) {
            gate.close();
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn holds(&self) -> MutexGuard<'_, HashMap<BackendOp, Arc<Semaphore>>> {
        self.holds.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn arrive(&self, call: BackendCall) {
        let op = call.op();
        log::debug!("scripted backend: {}", op);
        self.state().calls.push(call);

        let gate = self.holds().get(&op).cloned();
        if let Some(gate) = gate {
            // A closed gate means the hold was released
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl AppBackend for ScriptedBackend {
    async fn get_config(&self) -> std::result::Result<AppConfig, BackendError> {
        self.arrive(BackendCall::GetConfig).await;

        let mut state = self.state();
        if let Some(reply) = state.responses.get_config.pop_front() {
            return reply.into_result();
        }
        state
            .saved_config
            .clone()
            .ok_or_else(BackendError::file_not_found)
    }

    async fn save_config(&self, config: AppConfig) -> std::result::Result<(), BackendError> {
        self.arrive(BackendCall::SaveConfig(config.clone())).await;

        let mut state = self.state();
        let queued = state.responses.save_config.pop_front();
        let result = match queued {
            Some(reply) => reply.into_result(),
            None => Ok(()),
        };
        if result.is_ok() {
            state.saved_config = Some(config);
        }
        result
    }

    async fn connect_to_database(&self) -> std::result::Result<(), BackendError> {
        self.arrive(BackendCall::ConnectToDatabase).await;

        let mut state = self.state();
        if let Some(reply) = state.responses.connect_to_database.pop_front() {
            return reply.into_result();
        }
        match &state.saved_config {
            None => Err(BackendError::file_not_found()),
            Some(config) if config.db_username.is_empty() => Err("invalid username".into()),
            Some(config) if config.db_url.is_empty() => Err("invalid url".into()),
            Some(config) if config.db_name.is_empty() => Err("invalid database name".into()),
            Some(_) => Ok(()),
        }
    }

    async fn load_user_from_session(&self) -> std::result::Result<User, BackendError> {
        self.arrive(BackendCall::LoadUserFromSession).await;

        let mut state = self.state();
        if let Some(reply) = state.responses.load_user_from_session.pop_front() {
            return reply.into_result();
        }
        Ok(state.session_user.clone().unwrap_or_default())
    }

    async fn authenticate_and_get_user(
        &self,
        credentials: UserCredentials,
        remember: bool,
    ) -> std::result::Result<User, BackendError> {
        self.arrive(BackendCall::AuthenticateAndGetUser {
            email: credentials.email.clone(),
            remember,
        })
        .await;

        let mut state = self.state();
        let queued = state.responses.authenticate_and_get_user.pop_front();
        let result = match queued {
            Some(reply) => reply.into_result(),
            None => Ok(state
                .accounts
                .iter()
                .find(|a| a.email == credentials.email && a.password == credentials.password)
                .map(|a| a.user.clone())
                .unwrap_or_default()),
        };

        if let Ok(user) = &result {
            if user.is_authenticated() {
                state.session_user = remember.then(|| user.clone());
            }
        }
        result
    }

    async fn logout(&self) -> std::result::Result<(), BackendError> {
        self.arrive(BackendCall::Logout).await;

        let mut state = self.state();
        let queued = state.responses.logout.pop_front();
        let result = match queued {
            Some(reply) => reply.into_result(),
            None => Ok(()),
        };
        if result.is_ok() {
            state.session_user = None;
        }
        result
    }
}
