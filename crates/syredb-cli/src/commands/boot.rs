//! Boot command
//!
//! Runs the bootstrap pipeline against a scripted backend, rendering each
//! view and prompting for form input along the way.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

use syredb_core::forms::{
    FIELD_DB_NAME, FIELD_EMAIL, FIELD_PASSWORD, FIELD_REMEMBER, FIELD_URL, FIELD_USERNAME,
};
use syredb_core::pipeline::view::{ConfigFormView, LoginFormView, CONFIG_ERROR_HEADING};
use syredb_core::pipeline::ConnectionFraming;
use syredb_core::{
    BootstrapPipeline, Error, FormData, PipelineOptions, Scenario, ScriptedBackend, View,
};

use super::{expand_path, Context};
use crate::output::{
    print_error, print_heading, print_info, print_json, print_success, print_warning,
    OutputFormat,
};

type Pipeline = BootstrapPipeline<ScriptedBackend>;

#[derive(Args)]
pub struct BootArgs {
    /// Scenario file describing the backend (see `syredb scenario template`)
    #[arg(long, short)]
    pub scenario: String,

    /// Stop at the first view that needs input instead of prompting
    #[arg(long)]
    pub no_input: bool,

    /// Sign out again once the dashboard is reached
    #[arg(long)]
    pub sign_out: bool,
}

pub async fn execute(ctx: &Context, args: BootArgs) -> Result<()> {
    let path = expand_path(&args.scenario);
    let scenario = Scenario::from_file(&path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    log::debug!("loaded scenario from {}", path.display());

    let backend = Arc::new(ScriptedBackend::from_scenario(scenario));
    let mut pipeline = BootstrapPipeline::with_options(backend, &PipelineOptions::default());
    pipeline.start();

    let theme = ColorfulTheme::default();
    let mut signed_out = false;

    let view = loop {
        let view = pipeline.settle().await;
        if ctx.format == OutputFormat::Table {
            render(&view, ctx.quiet);
        }

        if let View::ConfigError { message } = &view {
            if ctx.format == OutputFormat::Json {
                print_json(&view)?;
            }
            bail!("{} {}", CONFIG_ERROR_HEADING, message);
        }

        if view.is_ready() {
            if args.sign_out && !signed_out {
                signed_out = true;
                pipeline.sign_out()?;
                continue;
            }
            break view;
        }

        if !view.needs_input() || args.no_input {
            break view;
        }

        respond(&mut pipeline, &view, &theme)?;
    };

    if ctx.format == OutputFormat::Json {
        print_json(&view)?;
    }
    Ok(())
}

// ============================================================================
// Input
// ============================================================================

fn respond(pipeline: &mut Pipeline, view: &View, theme: &ColorfulTheme) -> Result<()> {
    match view {
        View::DatabaseSetup { form } => submit_config(pipeline, form, theme),
        View::ConnectionError { form, .. } => {
            let choice = Select::with_theme(theme)
                .with_prompt("What next?")
                .items(&["Retry connection", "Edit connection settings"])
                .default(0)
                .interact()?;
            match choice {
                0 => Ok(pipeline.retry_connection()?),
                _ => submit_config(pipeline, form, theme),
            }
        }
        View::Login { form } => submit_login(pipeline, form, theme),
        View::SessionError { form, .. } => {
            let choice = Select::with_theme(theme)
                .with_prompt("What next?")
                .items(&["Retry", "Log in"])
                .default(0)
                .interact()?;
            match choice {
                0 => Ok(pipeline.retry_session()?),
                _ => submit_login(pipeline, form, theme),
            }
        }
        _ => Ok(()),
    }
}

fn submit_config(pipeline: &mut Pipeline, form: &ConfigFormView, theme: &ColorfulTheme) -> Result<()> {
    let url: String = Input::with_theme(theme)
        .with_prompt("Database URL")
        .with_initial_text(form.url.clone())
        .allow_empty(true)
        .interact_text()?;
    let db_name: String = Input::with_theme(theme)
        .with_prompt("Database name")
        .with_initial_text(form.db_name.clone())
        .allow_empty(true)
        .interact_text()?;
    let username: String = Input::with_theme(theme)
        .with_prompt("Username")
        .with_initial_text(form.username.clone())
        .allow_empty(true)
        .interact_text()?;
    let mut password = Password::with_theme(theme)
        .with_prompt("Password (empty keeps the current one)")
        .allow_empty_password(true)
        .interact()?;
    if password.is_empty() {
        password = form.password.clone();
    }

    let data = FormData::new()
        .with(FIELD_URL, url)
        .with(FIELD_DB_NAME, db_name)
        .with(FIELD_USERNAME, username)
        .with(FIELD_PASSWORD, password);
    accept_invalid(pipeline.submit_config_form(&data))
}

fn submit_login(pipeline: &mut Pipeline, form: &LoginFormView, theme: &ColorfulTheme) -> Result<()> {
    let email: String = Input::with_theme(theme)
        .with_prompt("Email")
        .with_initial_text(form.email.clone())
        .allow_empty(true)
        .interact_text()?;
    let password = Password::with_theme(theme)
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;
    let remember = Confirm::with_theme(theme)
        .with_prompt("Remember me?")
        .default(form.remember)
        .interact()?;

    let data = FormData::new()
        .with(FIELD_EMAIL, email)
        .with(FIELD_PASSWORD, password)
        .with(FIELD_REMEMBER, if remember { "on" } else { "" });
    accept_invalid(pipeline.submit_login_form(&data))
}

/// Field errors are rendered with the next view
fn accept_invalid(result: syredb_core::Result<()>) -> Result<()> {
    match result {
        Ok(()) | Err(Error::Validation(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(view: &View, quiet: bool) {
    match view {
        View::Unmounted | View::ConfigError { .. } => {}
        View::Loading { label, .. } => print_info(&format!("{}...", label), quiet),
        View::DatabaseSetup { form } => {
            print_heading(view.heading(), quiet);
            render_config_form(form, quiet);
        }
        View::ConnectionError { framing, form } => {
            print_heading(framing.heading(), quiet);
            if let ConnectionFraming::Update { message } = framing {
                print_error(message);
            }
            render_config_form(form, quiet);
        }
        View::Login { form } => {
            print_heading(view.heading(), quiet);
            render_login_form(form, quiet);
        }
        View::SessionError { message, form } => {
            print_heading(view.heading(), quiet);
            print_error(message);
            render_login_form(form, quiet);
        }
        View::Ready {
            user,
            database,
            can_manage_users,
            notice,
        } => {
            print_success(&format!("Signed in as {} ({})", user.email, user.role), quiet);
            print_info(&format!("Database: {}", database), quiet);
            if *can_manage_users {
                print_info("User management: available", quiet);
            }
            if let Some(notice) = notice {
                print_warning(notice);
            }
        }
    }
}

fn render_config_form(form: &ConfigFormView, quiet: bool) {
    let password = if form.password.is_empty() { "" } else { "********" };
    let fields = [
        ("URL", FIELD_URL, form.url.as_str()),
        ("Database", FIELD_DB_NAME, form.db_name.as_str()),
        ("Username", FIELD_USERNAME, form.username.as_str()),
        ("Password", FIELD_PASSWORD, password),
    ];
    for (label, field, value) in fields {
        print_info(&format!("  {:<10} {}", label, value), quiet);
        if let Some(error) = form.errors.for_field(field) {
            print_error(&format!("  {:<10} {}", "", error));
        }
    }
    if let Some(message) = &form.message {
        print_error(message);
    }
}

fn render_login_form(form: &LoginFormView, quiet: bool) {
    if !form.email.is_empty() {
        print_info(&format!("  {:<10} {}", "Email", form.email), quiet);
    }
    for error in form.errors.errors() {
        print_error(&format!("  {}: {}", error.field, error.message));
    }
    if let Some(message) = &form.message {
        print_error(message);
    }
}
