//! Command handlers.
//!
//! Each handler prints its result to stdout; failures bubble up as
//! `anyhow` errors carrying the message the store or session recorded.

use anyhow::{Result, bail};
use serde_json::Value;
use todopro_tasks::{Task, TaskFields, TaskId};

use crate::App;

pub(crate) fn require_password(password: Option<String>) -> Result<String> {
    match password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => bail!("password required: pass --password or set TODOPRO_PASSWORD"),
    }
}

/// Task commands need a session whose token outlives the expiry margin.
pub(crate) fn require_session(app: &App) -> Result<()> {
    if !app.session.is_authenticated() {
        bail!("not logged in: run `todopro login <email>` first");
    }
    if app.session.usable_token().is_none() {
        bail!("session is about to expire: run `todopro login <email>` again");
    }
    Ok(())
}

pub(crate) async fn health(app: &App) -> Result<()> {
    let body = app.client.get("/health").await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

pub(crate) async fn login(app: &App, email: &str, password: &str) -> Result<()> {
    let user = app.session.login(email, password).await?;
    println!("Logged in as {}", user.display_name());
    Ok(())
}

pub(crate) async fn register(
    app: &App,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    let user = app
        .session
        .register(email, password, first_name, last_name)
        .await?;
    println!("Registered and logged in as {}", user.display_name());
    Ok(())
}

pub(crate) async fn logout(app: &App) {
    let was_authenticated = app.session.is_authenticated();
    app.session.logout().await;
    if was_authenticated {
        println!("Logged out");
    } else {
        println!("No active session");
    }
}

pub(crate) async fn whoami(app: &App) -> Result<()> {
    let Some(local) = app.session.user() else {
        println!("Not logged in");
        return Ok(());
    };
    // The server's view wins when reachable.
    let user = app.session.current_user().await.unwrap_or(local);
    println!("{}", user.display_name());
    if let Some(email) = user.field("email") {
        println!("  email: {email}");
    }
    Ok(())
}

pub(crate) async fn list_tasks(app: &App) -> Result<()> {
    let tasks = app.tasks.fetch_all().await?;
    if tasks.is_empty() {
        println!("No tasks");
    }
    for task in &tasks {
        println!("{}", format_task(task));
    }
    Ok(())
}

pub(crate) async fn add_task(app: &App, title: &str, description: Option<&str>) -> Result<()> {
    let fields = task_fields(Some(title), description);
    let task = app.tasks.create(&fields).await?;
    println!("{}", format_task(&task));
    Ok(())
}

pub(crate) async fn toggle_task(app: &App, id: TaskId) -> Result<()> {
    // Toggling needs the current record to flip from.
    let _ = app.tasks.fetch_all().await?;
    let task = app.tasks.toggle_completion(id).await?;
    println!("{}", format_task(&task));
    Ok(())
}

pub(crate) async fn remove_task(app: &App, id: TaskId) -> Result<()> {
    app.tasks.delete(id).await?;
    println!("Deleted task {id}");
    Ok(())
}

pub(crate) async fn edit_task(
    app: &App,
    id: TaskId,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        bail!("nothing to change: pass --title and/or --description");
    }
    let _ = app.tasks.fetch_all().await?;
    let Some(current) = app.tasks.get(id) else {
        bail!("Task not found: {id}");
    };

    let mut fields = current.to_fields();
    fields.extend(task_fields(title.as_deref(), description.as_deref()));
    let task = app.tasks.update(id, &fields).await?;
    println!("{}", format_task(&task));
    Ok(())
}

fn task_fields(title: Option<&str>, description: Option<&str>) -> TaskFields {
    let mut fields = TaskFields::new();
    if let Some(title) = title {
        let _ = fields.insert("title".into(), Value::String(title.into()));
    }
    if let Some(description) = description {
        let _ = fields.insert("description".into(), Value::String(description.into()));
    }
    fields
}

/// One-line listing: `[x] 3  Title - description`.
fn format_task(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{mark}] {:<3} {}", task.id, task.title());
    if let Some(desc) = task.attribute_str("description").filter(|d| !d.is_empty()) {
        line.push_str(" - ");
        line.push_str(desc);
    }
    line
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
