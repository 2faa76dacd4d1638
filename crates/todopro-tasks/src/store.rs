//! Task store with optimistic completion toggling.
//!
//! Holds the task list a front end renders plus its loading/error
//! indicators. Key rules:
//!
//! - **Pessimistic CRUD**: create, update and delete touch the local list
//!   only after the server confirms, so identifiers are never invented.
//! - **Optimistic toggle**: the completion flag flips locally before the
//!   request goes out; on failure the whole list is re-fetched.
//! - **No lock across awaits**: state mutations are synchronous. Requests
//!   that overlap apply their results in response order (last write wins);
//!   conflicting calls on the same task are the caller's to sequence.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use todopro_core::ApiClient;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::types::{Task, TaskFields, TaskId, TaskSnapshot};

/// Collection path.
const TASKS_PATH: &str = "/tasks";

/// Error text when listing fails without a server detail.
pub const FETCH_FALLBACK: &str = "Failed to fetch tasks";
/// Error text when creation fails without a server detail.
pub const CREATE_FALLBACK: &str = "Failed to create task";
/// Error text when an update fails without a server detail.
pub const UPDATE_FALLBACK: &str = "Failed to update task";
/// Error text when deletion fails without a server detail.
pub const DELETE_FALLBACK: &str = "Failed to delete task";
/// Error text when a toggle fails without a server detail.
pub const TOGGLE_FALLBACK: &str = "Failed to toggle task completion";

fn task_path(id: TaskId) -> String {
    format!("{TASKS_PATH}/{id}")
}

#[derive(Default)]
struct State {
    snapshot: TaskSnapshot,
    in_flight: usize,
}

/// Task list synchronized with the remote `/tasks` collection.
pub struct TaskStore {
    client: Arc<dyn ApiClient>,
    state: Mutex<State>,
    changes: watch::Sender<TaskSnapshot>,
}

impl TaskStore {
    /// Create an empty store. Call [`Self::fetch_all`] to populate it.
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        let (changes, _) = watch::channel(TaskSnapshot::default());
        Self {
            client,
            state: Mutex::new(State::default()),
            changes,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    /// Copy of the current state.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.changes.subscribe()
    }

    /// Current task list.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().snapshot.tasks.clone()
    }

    /// A task from the local list.
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.state
            .lock()
            .snapshot
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Whether any request is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().snapshot.loading
    }

    /// Message of the most recent failure.
    pub fn error(&self) -> Option<String> {
        self.state.lock().snapshot.error.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the local list with the server's collection.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_all(&self) -> Result<Vec<Task>, TaskError> {
        self.begin();
        let result = self
            .request::<Vec<Task>>(self.client.get(TASKS_PATH).await, FETCH_FALLBACK);

        match result {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks fetched");
                let list = tasks.clone();
                self.finish(move |s| s.tasks = list);
                Ok(tasks)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Create a task; the server's record (with its identifier) is appended,
    /// or replaces an entry that already carries that identifier.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, fields: &TaskFields) -> Result<Task, TaskError> {
        self.begin();
        let body = Value::Object(fields.clone());
        let result = self.request::<Task>(self.client.post(TASKS_PATH, body).await, CREATE_FALLBACK);

        match result {
            Ok(task) => {
                debug!(id = task.id, "task created");
                let created = task.clone();
                // An overlapping fetch may already have listed the new record.
                self.finish(move |s| match s.tasks.iter_mut().find(|t| t.id == created.id) {
                    Some(slot) => *slot = created,
                    None => s.tasks.push(created),
                });
                Ok(task)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Replace a task with `fields`; the server's record replaces the local one.
    #[tracing::instrument(skip_all, fields(id = id))]
    pub async fn update(&self, id: TaskId, fields: &TaskFields) -> Result<Task, TaskError> {
        self.put(id, fields, UPDATE_FALLBACK).await
    }

    /// Delete a task on the server, then locally.
    #[tracing::instrument(skip_all, fields(id = id))]
    pub async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        self.begin();
        match self.client.delete(&task_path(id)).await {
            Ok(_) => {
                debug!(id, "task deleted");
                self.finish(move |s| s.tasks.retain(|t| t.id != id));
                Ok(())
            }
            Err(source) => Err(self.fail(TaskError::api(source, DELETE_FALLBACK))),
        }
    }

    /// Flip a task's completion flag.
    ///
    /// The local flag flips before the request is sent. If the update fails
    /// the list is re-fetched from the server and the update's error is
    /// returned. An unknown identifier fails without any request.
    #[tracing::instrument(skip_all, fields(id = id))]
    pub async fn toggle_completion(&self, id: TaskId) -> Result<Task, TaskError> {
        let Some(current) = self.get(id) else {
            return Err(self.record_error(TaskError::NotFound(id)));
        };

        let completed = !current.completed;
        self.apply(|s| {
            if let Some(task) = s.tasks.iter_mut().find(|t| t.id == id) {
                task.completed = completed;
            }
        });

        let mut fields = current.to_fields();
        let _ = fields.insert("completed".to_string(), Value::Bool(completed));

        match self.put(id, &fields, TOGGLE_FALLBACK).await {
            Ok(task) => Ok(task),
            Err(err) => {
                warn!(id, "toggle failed, resyncing: {err}");
                if let Err(resync) = self.fetch_all().await {
                    warn!("resync after failed toggle also failed: {resync}");
                }
                Err(self.record_error(err))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    async fn put(&self, id: TaskId, fields: &TaskFields, fallback: &str) -> Result<Task, TaskError> {
        self.begin();
        let body = Value::Object(fields.clone());
        let result = self.request::<Task>(self.client.put(&task_path(id), body).await, fallback);

        match result {
            Ok(task) => {
                debug!(id, "task updated");
                let updated = task.clone();
                self.finish(move |s| {
                    if let Some(slot) = s.tasks.iter_mut().find(|t| t.id == id) {
                        *slot = updated;
                    }
                });
                Ok(task)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn request<T: DeserializeOwned>(
        &self,
        response: Result<Value, todopro_core::ApiError>,
        fallback: &str,
    ) -> Result<T, TaskError> {
        let value = response.map_err(|e| TaskError::api(e, fallback))?;
        serde_json::from_value(value).map_err(|source| TaskError::InvalidResponse {
            message: fallback.to_string(),
            source,
        })
    }

    /// Mark a request as started: loading on, error cleared.
    fn begin(&self) {
        self.update_state(|state| {
            state.in_flight += 1;
            state.snapshot.loading = true;
            state.snapshot.error = None;
        });
    }

    /// Apply a successful result and mark the request finished.
    fn finish(&self, f: impl FnOnce(&mut TaskSnapshot)) {
        self.update_state(|state| {
            f(&mut state.snapshot);
            end_request(state);
        });
    }

    /// Record a failed request and hand the error back.
    fn fail(&self, err: TaskError) -> TaskError {
        let message = err.to_string();
        self.update_state(|state| {
            state.snapshot.error = Some(message);
            end_request(state);
        });
        err
    }

    /// Set the error indicator without touching the in-flight count.
    fn record_error(&self, err: TaskError) -> TaskError {
        let message = err.to_string();
        self.apply(|s| s.error = Some(message));
        err
    }

    fn apply(&self, f: impl FnOnce(&mut TaskSnapshot)) {
        self.update_state(|state| f(&mut state.snapshot));
    }

    fn update_state(&self, f: impl FnOnce(&mut State)) {
        let snapshot = {
            let mut state = self.state.lock();
            f(&mut state);
            state.snapshot.clone()
        };
        let _ = self.changes.send_replace(snapshot);
    }
}

fn end_request(state: &mut State) {
    state.in_flight = state.in_flight.saturating_sub(1);
    state.snapshot.loading = state.in_flight > 0;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
