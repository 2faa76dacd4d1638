//! # todopro
//!
//! Command-line client for the `TodoPro` API: wires settings, logging, the
//! persisted session and the task store, then runs one command.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use todopro_auth::{SessionManager, SessionStorage};
use todopro_core::{ApiClient, ReqwestApiClient};
use todopro_settings::TodoproSettings;
use todopro_tasks::{TaskId, TaskStore};

/// `TodoPro` command-line client.
#[derive(Parser, Debug)]
#[command(name = "todopro", version, about = "TodoPro command-line client")]
struct Cli {
    /// API base URL (overrides settings).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file (overrides settings).
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the API is reachable.
    Health,

    /// Log in and persist the session.
    Login {
        /// Account email.
        email: String,
        /// Account password.
        #[arg(long, env = "TODOPRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in.
    Register {
        /// Account email.
        email: String,
        /// Given name.
        #[arg(long)]
        first_name: String,
        /// Family name.
        #[arg(long)]
        last_name: String,
        /// Account password.
        #[arg(long, env = "TODOPRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// Manage tasks.
    #[command(subcommand)]
    Tasks(TaskCommand),
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List all tasks.
    List,

    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Optional description.
        #[arg(long)]
        description: Option<String>,
    },

    /// Toggle a task's completion.
    Done {
        /// Task identifier.
        id: TaskId,
    },

    /// Delete a task.
    Rm {
        /// Task identifier.
        id: TaskId,
    },

    /// Change a task's title or description.
    Edit {
        /// Task identifier.
        id: TaskId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
    },
}

/// Shared services for one command invocation.
pub(crate) struct App {
    pub(crate) client: Arc<dyn ApiClient>,
    pub(crate) session: SessionManager,
    pub(crate) tasks: TaskStore,
}

impl App {
    fn build(settings: &TodoproSettings) -> Self {
        let storage = SessionStorage::file(settings.auth.session_path());
        let http = ReqwestApiClient::with_options(
            settings.api.base_url.clone(),
            Duration::from_millis(settings.api.timeout_ms),
            &settings.api.user_agent,
        )
        .with_bearer_source(Arc::new(storage.clone()));
        let client: Arc<dyn ApiClient> = Arc::new(http);

        let session = SessionManager::new(client.clone(), storage)
            .with_expiry_margin(settings.auth.expiry_margin_secs);
        let tasks = TaskStore::new(client.clone());

        Self {
            client,
            session,
            tasks,
        }
    }
}

fn log_level(settings: &TodoproSettings, verbose: u8) -> String {
    match verbose {
        0 => settings.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = todopro_settings::load_settings().context("Failed to load settings")?;
    if let Some(url) = cli.base_url {
        settings.api.base_url = url;
    }
    if let Some(path) = cli.session_file {
        settings.auth.session_file = Some(path.to_string_lossy().into_owned());
    }

    let level = log_level(&settings, cli.verbose);
    if settings.logging.json {
        todopro_core::logging::init_json_subscriber(&level);
    } else {
        todopro_core::logging::init_subscriber(&level);
    }
    tracing::debug!(base_url = %settings.api.base_url, "settings loaded");

    let app = App::build(&settings);
    let _ = app.session.load_persisted_session();

    match cli.command {
        Command::Health => commands::health(&app).await,
        Command::Login { email, password } => {
            let password = commands::require_password(password)?;
            commands::login(&app, &email, &password).await
        }
        Command::Register {
            email,
            first_name,
            last_name,
            password,
        } => {
            let password = commands::require_password(password)?;
            commands::register(&app, &email, &password, &first_name, &last_name).await
        }
        Command::Logout => {
            commands::logout(&app).await;
            Ok(())
        }
        Command::Whoami => commands::whoami(&app).await,
        Command::Tasks(cmd) => {
            commands::require_session(&app)?;
            match cmd {
                TaskCommand::List => commands::list_tasks(&app).await,
                TaskCommand::Add { title, description } => {
                    commands::add_task(&app, &title, description.as_deref()).await
                }
                TaskCommand::Done { id } => commands::toggle_task(&app, id).await,
                TaskCommand::Rm { id } => commands::remove_task(&app, id).await,
                TaskCommand::Edit {
                    id,
                    title,
                    description,
                } => commands::edit_task(&app, id, title, description).await,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
