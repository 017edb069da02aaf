//! Scenario commands
//!
//! Write and inspect the JSON files that script the backend for `boot`.

use std::collections::VecDeque;

use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use syredb_core::backend::{Reply, ScriptedResponses};
use syredb_core::{BackendOp, Scenario};

use super::{expand_path, Context};
use crate::output::{print_info, print_json, print_output, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum ScenarioAction {
    /// Print an example scenario
    Template,

    /// Parse a scenario file and list its scripted replies
    Check {
        /// Scenario file
        file: String,
    },
}

/// Reply queue row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ReplyRow {
    #[tabled(rename = "Operation")]
    pub operation: String,
    #[tabled(rename = "Queued")]
    pub queued: usize,
    #[tabled(rename = "Replies")]
    pub replies: String,
}

pub async fn execute(ctx: &Context, action: ScenarioAction) -> Result<()> {
    match action {
        ScenarioAction::Template => print_json(&Scenario::template()),
        ScenarioAction::Check { file } => check(ctx, &file),
    }
}

fn check(ctx: &Context, file: &str) -> Result<()> {
    let path = expand_path(file);
    let scenario = Scenario::from_file(&path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;

    let rows = reply_rows(&scenario.responses);
    if ctx.format == OutputFormat::Json {
        return print_output(&rows, ctx.format);
    }

    print_success(&format!("{} is a valid scenario", path.display()), ctx.quiet);
    let saved = match &scenario.saved_config {
        Some(config) if config.is_usable() => format!("{} / {}", config.db_url, config.db_name),
        Some(_) => "incomplete".to_string(),
        None => "none".to_string(),
    };
    print_info(&format!("Saved config:  {}", saved), ctx.quiet);
    let session = scenario
        .session_user
        .as_ref()
        .filter(|u| u.is_authenticated())
        .map(|u| u.email.clone())
        .unwrap_or_else(|| "none".to_string());
    print_info(&format!("Session user:  {}", session), ctx.quiet);
    print_info(&format!("Accounts:      {}", scenario.accounts.len()), ctx.quiet);

    if !ctx.quiet {
        print_output(&rows, ctx.format)?;
    }
    Ok(())
}

fn reply_rows(responses: &ScriptedResponses) -> Vec<ReplyRow> {
    BackendOp::ALL
        .iter()
        .map(|&op| {
            let replies = match op {
                BackendOp::GetConfig => summarize(&responses.get_config),
                BackendOp::SaveConfig => summarize(&responses.save_config),
                BackendOp::ConnectToDatabase => summarize(&responses.connect_to_database),
                BackendOp::LoadUserFromSession => summarize(&responses.load_user_from_session),
                BackendOp::AuthenticateAndGetUser => {
                    summarize(&responses.authenticate_and_get_user)
                }
                BackendOp::Logout => summarize(&responses.logout),
            };
            ReplyRow {
                operation: op.to_string(),
                queued: responses.queued(op),
                replies,
            }
        })
        .collect()
}

fn summarize<T>(replies: &VecDeque<Reply<T>>) -> String {
    if replies.is_empty() {
        return "-".to_string();
    }
    replies
        .iter()
        .map(|reply| match reply {
            Reply::Ok(_) => "ok".to_string(),
            Reply::Err(err) => format!("err: {}", err.message()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
