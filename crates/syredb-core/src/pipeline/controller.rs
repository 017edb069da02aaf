//! Bootstrap pipeline controller
//!
//! Drives the three gated stages and turns their state into a [`View`].
//! Backend calls run as spawned tasks; their results come back over a
//! channel tagged with the stage generation that launched them, and are
//! applied by [`BootstrapPipeline::next_event`]. A result whose stage was
//! reset, unmounted or superseded in the meantime is dropped.
//!
//! Must be used from within a tokio runtime.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::stage::{StageId, StageSlot, StageState};
use super::view::{ConfigFormView, ConnectionFraming, LoginFormView, View, INVALID_CREDENTIALS};
use crate::backend::{AppBackend, BackendError, ErrorKind};
use crate::error::{Error, Result};
use crate::forms::{validate_config_form, validate_login_form, FormData, ValidationErrors};
use crate::models::{AppConfig, User};
use crate::state::{Action, Store, UnknownActionPolicy};

/// Construction options
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Config the store starts with, before the backend is asked
    pub initial_config: AppConfig,
    pub unknown_action_policy: UnknownActionPolicy,
}

impl PipelineOptions {
    pub fn build_store(&self) -> Store {
        Store::with_config(self.initial_config.clone()).with_policy(self.unknown_action_policy)
    }
}

#[derive(Debug)]
enum Outcome {
    ConfigLoaded(std::result::Result<AppConfig, BackendError>),
    ConfigSaved {
        config: AppConfig,
        result: std::result::Result<(), BackendError>,
    },
    Connected(std::result::Result<(), BackendError>),
    SessionLoaded(std::result::Result<User, BackendError>),
    Authenticated(std::result::Result<User, BackendError>),
    LoggedOut {
        user: User,
        result: std::result::Result<(), BackendError>,
    },
}

#[derive(Debug)]
struct Completion {
    stage: StageId,
    generation: u64,
    outcome: Outcome,
}

/// Errors and messages shown alongside a form
#[derive(Debug, Default)]
struct FormFeedback {
    errors: ValidationErrors,
    message: Option<String>,
}

impl FormFeedback {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Sequential Load Config → Connect Database → Resolve Session pipeline
pub struct BootstrapPipeline<B: AppBackend + 'static> {
    backend: Arc<B>,
    store: Store,
    mounted: bool,
    config: StageSlot<AppConfig>,
    connection: StageSlot<()>,
    session: StageSlot<User>,
    config_form: FormFeedback,
    login_form: FormFeedback,
    login_email: String,
    login_remember: bool,
    notice: Option<String>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<B: AppBackend + 'static> BootstrapPipeline<B> {
    pub fn new(backend: Arc<B>, store: Store) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            store,
            mounted: false,
            config: StageSlot::new(),
            connection: StageSlot::new(),
            session: StageSlot::new(),
            config_form: FormFeedback::default(),
            login_form: FormFeedback::default(),
            login_email: String::new(),
            login_remember: false,
            notice: None,
            tx,
            rx,
        }
    }

    pub fn with_options(backend: Arc<B>, options: &PipelineOptions) -> Self {
        Self::new(backend, options.build_store())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config_stage(&self) -> &StageState<AppConfig> {
        self.config.state()
    }

    pub fn connection_stage(&self) -> &StageState<()> {
        self.connection.state()
    }

    pub fn session_stage(&self) -> &StageState<User> {
        self.session.state()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether any stage has a fetch outstanding
    pub fn is_loading(&self) -> bool {
        self.config.state().is_loading()
            || self.connection.state().is_loading()
            || self.session.state().is_loading()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Mount the pipeline and ask the backend for its config.
    ///
    /// Calling it again while mounted does nothing: the config is fetched
    /// once per mount.
    pub fn start(&mut self) {
        if self.mounted {
            log::debug!("pipeline already mounted");
            return;
        }
        self.mounted = true;
        log::info!("bootstrap: loading configuration");
        self.launch(StageId::Config, "Loading", |backend| async move {
            Outcome::ConfigLoaded(backend.get_config().await)
        });
    }

    /// Abandon every stage. Late results are discarded.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.config.reset();
        self.connection.reset();
        self.session.reset();
        self.config_form.clear();
        self.login_form.clear();
        self.notice = None;
    }

    /// Restart from stage 1; the only retry for a failed config load
    pub fn remount(&mut self) {
        self.unmount();
        self.start();
    }

    /// Discard `stage` and every later stage, then re-enter `stage` if the
    /// stage before it is satisfied.
    pub fn reset(&mut self, stage: StageId) {
        log::info!("bootstrap: resetting from {} stage", stage);
        if stage <= StageId::Session {
            self.session.reset();
            self.login_form.clear();
        }
        if stage <= StageId::Connection {
            self.connection.reset();
            self.config_form.clear();
        }
        if stage == StageId::Config {
            self.remount();
            return;
        }
        if !self.mounted {
            return;
        }
        match stage {
            StageId::Connection if self.config.state().is_ready() => self.enter_connection(),
            StageId::Session if self.connection.state().is_ready() => self.enter_session(),
            _ => {}
        }
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Wait for one fetch to settle and apply it.
    ///
    /// Returns `false` without waiting when nothing is outstanding.
    pub async fn next_event(&mut self) -> bool {
        if !self.is_loading() {
            return false;
        }
        match self.rx.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no stage is loading, then render
    pub async fn settle(&mut self) -> View {
        while self.next_event().await {}
        self.view()
    }

    fn launch<F, Fut>(&mut self, stage: StageId, label: &'static str, fetch: F)
    where
        F: FnOnce(Arc<B>) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let generation = match stage {
            StageId::Config => self.config.begin(label),
            StageId::Connection => self.connection.begin(label),
            StageId::Session => self.session.begin(label),
        };

        let fetch = fetch(Arc::clone(&self.backend));
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let outcome = fetch.await;
            // Receiver only goes away with the pipeline itself
            let _ = tx.send(Completion {
                stage,
                generation,
                outcome,
            });
        });

        let handle = task.abort_handle();
        match stage {
            StageId::Config => self.config.attach(handle),
            StageId::Connection => self.connection.attach(handle),
            StageId::Session => self.session.attach(handle),
        }
    }

    fn apply(&mut self, completion: Completion) {
        let Completion {
            stage,
            generation,
            outcome,
        } = completion;

        let current = match stage {
            StageId::Config => self.config.accepts(generation),
            StageId::Connection => self.connection.accepts(generation),
            StageId::Session => self.session.accepts(generation),
        };
        if !current {
            log::debug!("discarding stale {} result (generation {})", stage, generation);
            return;
        }

        match outcome {
            Outcome::ConfigLoaded(result) => self.on_config_loaded(result),
            Outcome::ConfigSaved { config, result } => self.on_config_saved(config, result),
            Outcome::Connected(result) => self.on_connected(result),
            Outcome::SessionLoaded(result) => self.on_session_loaded(result),
            Outcome::Authenticated(result) => self.on_authenticated(result),
            Outcome::LoggedOut { user, result } => self.on_logged_out(user, result),
        }
    }

    // ========================================================================
    // Stage 1: configuration
    // ========================================================================

    fn on_config_loaded(&mut self, result: std::result::Result<AppConfig, BackendError>) {
        match result {
            Ok(config) => {
                log::info!("bootstrap: configuration loaded");
                self.store.dispatch(Action::SetConfig(config.clone()));
                self.config.finish(StageState::Ready(config));
                self.enter_connection();
            }
            Err(err) if err.is_file_not_found() => {
                log::info!("bootstrap: no saved configuration");
                let config = (*self.store.get_state().config).clone();
                self.config.finish(StageState::Ready(config));
                self.enter_connection();
            }
            Err(err) => {
                log::error!("bootstrap: could not load configuration: {}", err);
                self.config.finish(StageState::Failed(err));
            }
        }
    }

    // ========================================================================
    // Stage 2: database connection
    // ========================================================================

    fn enter_connection(&mut self) {
        let config = self.store.get_state().config.clone();
        if !config.is_usable() {
            log::info!("bootstrap: configuration incomplete, waiting for input");
            self.connection.finish(StageState::Idle);
            return;
        }
        log::info!("bootstrap: connecting to database");
        self.launch(StageId::Connection, "Connecting to database", |backend| async move {
            Outcome::Connected(backend.connect_to_database().await)
        });
    }

    fn on_connected(&mut self, result: std::result::Result<(), BackendError>) {
        match result {
            Ok(()) => {
                log::info!("bootstrap: database connected");
                self.config_form.clear();
                self.connection.finish(StageState::Ready(()));
                self.enter_session();
            }
            Err(err) => {
                log::warn!("bootstrap: database connection failed: {}", err);
                self.connection.finish(StageState::Failed(err));
            }
        }
    }

    fn on_config_saved(
        &mut self,
        config: AppConfig,
        result: std::result::Result<(), BackendError>,
    ) {
        match result {
            Ok(()) => {
                log::info!("bootstrap: configuration saved");
                self.store.dispatch(Action::SetConfig(config));
                self.connection.finish(StageState::Idle);
                self.enter_connection();
            }
            Err(err) => {
                // Not a connection failure: back to the plain form
                log::warn!("bootstrap: could not save configuration: {}", err);
                self.config_form.message = Some(err.message().to_string());
                self.connection.finish(StageState::Idle);
            }
        }
    }

    fn awaiting_config(&self) -> bool {
        self.config.state().is_ready()
            && matches!(
                self.connection.state(),
                StageState::Idle | StageState::Failed(_)
            )
    }

    /// Validate the database form and, if it passes, save it and reconnect.
    ///
    /// Field errors are kept for the view and returned; the backend is not
    /// called for an invalid form.
    pub fn submit_config_form(&mut self, data: &FormData) -> Result<()> {
        if !self.awaiting_config() {
            return Err(Error::pipeline("no configuration form is shown"));
        }
        self.config_form.clear();

        let config = match validate_config_form(data) {
            Ok(config) => config,
            Err(errors) => {
                log::debug!("configuration form rejected: {}", errors);
                self.config_form.errors = errors.clone();
                return Err(errors.into());
            }
        };

        log::info!("bootstrap: saving configuration");
        self.launch(StageId::Connection, "Saving configuration", |backend| async move {
            let result = backend.save_config(config.clone()).await;
            Outcome::ConfigSaved { config, result }
        });
        Ok(())
    }

    /// Try the connection again with the current config
    pub fn retry_connection(&mut self) -> Result<()> {
        if !(self.config.state().is_ready() && self.connection.state().is_failed()) {
            return Err(Error::pipeline("connection has not failed"));
        }
        self.config_form.clear();
        self.enter_connection();
        Ok(())
    }

    // ========================================================================
    // Stage 3: session
    // ========================================================================

    fn enter_session(&mut self) {
        log::info!("bootstrap: restoring session");
        self.launch(StageId::Session, "Loading session", |backend| async move {
            Outcome::SessionLoaded(backend.load_user_from_session().await)
        });
    }

    fn on_session_loaded(&mut self, result: std::result::Result<User, BackendError>) {
        match result {
            Ok(user) if user.is_authenticated() => {
                log::info!("bootstrap: session restored");
                self.sign_in(user);
            }
            Ok(_) => {
                log::info!("bootstrap: no saved session, waiting for login");
                self.session.finish(StageState::Idle);
            }
            Err(err) if err.kind() == ErrorKind::NotAuthenticated => {
                log::info!("bootstrap: session expired, waiting for login");
                self.session.finish(StageState::Idle);
            }
            Err(err) => {
                log::warn!("bootstrap: could not restore session: {}", err);
                self.session.finish(StageState::Failed(err));
            }
        }
    }

    fn on_authenticated(&mut self, result: std::result::Result<User, BackendError>) {
        match result {
            Ok(user) if user.is_authenticated() => {
                log::info!("bootstrap: signed in");
                self.sign_in(user);
            }
            Ok(_) => {
                log::info!("bootstrap: credentials rejected");
                self.login_form.message = Some(INVALID_CREDENTIALS.to_string());
                self.session.finish(StageState::Idle);
            }
            Err(err) => {
                log::warn!("bootstrap: authentication failed: {}", err);
                self.login_form.message = Some(err.message().to_string());
                self.session.finish(StageState::Idle);
            }
        }
    }

    fn sign_in(&mut self, user: User) {
        self.login_form.clear();
        self.notice = None;
        self.store.dispatch(Action::SetUser(user.clone()));
        self.session.finish(StageState::Ready(user));
    }

    fn awaiting_login(&self) -> bool {
        if !self.connection.state().is_ready() {
            return false;
        }
        match self.session.state() {
            StageState::Idle | StageState::Failed(_) => true,
            StageState::Ready(_) => !self.store.get_state().user.is_authenticated(),
            StageState::Loading => false,
        }
    }

    /// Validate the login form and, if it passes, authenticate
    pub fn submit_login_form(&mut self, data: &FormData) -> Result<()> {
        if !self.awaiting_login() {
            return Err(Error::pipeline("no login form is shown"));
        }
        self.login_form.clear();
        self.login_email = data.text(crate::forms::FIELD_EMAIL).to_string();
        self.login_remember = data.checked(crate::forms::FIELD_REMEMBER);

        let submission = match validate_login_form(data) {
            Ok(submission) => submission,
            Err(errors) => {
                log::debug!("login form rejected: {}", errors);
                self.login_form.errors = errors.clone();
                return Err(errors.into());
            }
        };

        log::info!("bootstrap: signing in");
        self.launch(StageId::Session, "Signing in", |backend| async move {
            Outcome::Authenticated(
                backend
                    .authenticate_and_get_user(submission.credentials, submission.remember)
                    .await,
            )
        });
        Ok(())
    }

    /// Reload the remembered session after a failure
    pub fn retry_session(&mut self) -> Result<()> {
        if !(self.connection.state().is_ready() && self.session.state().is_failed()) {
            return Err(Error::pipeline("session has not failed"));
        }
        self.login_form.clear();
        self.enter_session();
        Ok(())
    }

    /// Log out through the backend, then clear the user
    pub fn sign_out(&mut self) -> Result<()> {
        let user = match self.session.state().ready() {
            Some(user) => user.clone(),
            None => return Err(Error::pipeline("nobody is signed in")),
        };
        self.notice = None;
        log::info!("signing out");
        self.launch(StageId::Session, "Signing out", |backend| async move {
            let result = backend.logout().await;
            Outcome::LoggedOut { user, result }
        });
        Ok(())
    }

    fn on_logged_out(&mut self, user: User, result: std::result::Result<(), BackendError>) {
        match result {
            Ok(()) => {
                log::info!("signed out");
                self.store.dispatch(Action::SignOut);
                self.session.finish(StageState::Idle);
            }
            Err(err) if err.kind() == ErrorKind::NotAuthenticated => {
                log::info!("session already ended on the backend");
                self.store.dispatch(Action::SignOut);
                self.session.finish(StageState::Idle);
            }
            Err(err) => {
                log::error!("could not sign out: {}", err);
                self.notice = Some(err.message().to_string());
                self.session.finish(StageState::Ready(user));
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn config_form_view(&self) -> ConfigFormView {
        let mut form = ConfigFormView::prefilled(&self.store.get_state().config);
        form.errors = self.config_form.errors.clone();
        form.message = self.config_form.message.clone();
        form
    }

    fn login_form_view(&self) -> LoginFormView {
        LoginFormView {
            email: self.login_email.clone(),
            remember: self.login_remember,
            errors: self.login_form.errors.clone(),
            message: self.login_form.message.clone(),
        }
    }

    fn loading(stage: StageId, label: &str) -> View {
        View::Loading {
            stage,
            label: label.to_string(),
        }
    }

    /// Current render model. Each stage gates the next.
    pub fn view(&self) -> View {
        if !self.mounted {
            return View::Unmounted;
        }

        match self.config.state() {
            StageState::Idle => return Self::loading(StageId::Config, "Loading"),
            StageState::Loading => return Self::loading(StageId::Config, self.config.label()),
            StageState::Failed(err) => {
                return View::ConfigError {
                    message: err.message().to_string(),
                }
            }
            StageState::Ready(_) => {}
        }

        match self.connection.state() {
            StageState::Idle => {
                return View::DatabaseSetup {
                    form: self.config_form_view(),
                }
            }
            StageState::Loading => {
                return Self::loading(StageId::Connection, self.connection.label())
            }
            StageState::Failed(err) => {
                return View::ConnectionError {
                    framing: ConnectionFraming::classify(err),
                    form: self.config_form_view(),
                };
            }
            StageState::Ready(()) => {}
        }

        match self.session.state() {
            StageState::Idle => View::Login {
                form: self.login_form_view(),
            },
            StageState::Loading => Self::loading(StageId::Session, self.session.label()),
            StageState::Failed(err) => View::SessionError {
                message: err.message().to_string(),
                form: self.login_form_view(),
            },
            StageState::Ready(_) => {
                let state = self.store.get_state();
                // The store is the authority; a nil user always goes to login
                if !state.user.is_authenticated() {
                    return View::Login {
                        form: self.login_form_view(),
                    };
                }
                View::Ready {
                    can_manage_users: state.user.role.is_admin_or_owner(),
                    user: (*state.user).clone(),
                    database: state.config.db_name.clone(),
                    notice: self.notice.clone(),
                }
            }
        }
    }
}
