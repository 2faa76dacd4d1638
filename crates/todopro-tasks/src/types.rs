//! Task data types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned task identifier.
pub type TaskId = i64;

/// Task fields as sent to the API (everything except the identifier).
pub type TaskFields = Map<String, Value>;

/// A task record.
///
/// Only the identifier and completion flag are interpreted; every other
/// attribute (title, description, timestamps, owner, ...) is carried through
/// unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Remaining attributes.
    #[serde(flatten)]
    pub attributes: TaskFields,
}

impl Task {
    /// A string attribute, e.g. `title`.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Title, or empty if the record has none.
    pub fn title(&self) -> &str {
        self.attribute_str("title").unwrap_or_default()
    }

    /// Body for a full-replacement update: all attributes plus `completed`,
    /// without the identifier.
    pub fn to_fields(&self) -> TaskFields {
        let mut fields = self.attributes.clone();
        let _ = fields.insert("completed".to_string(), Value::Bool(self.completed));
        fields
    }
}

/// Observable state of a [`TaskStore`](crate::TaskStore).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskSnapshot {
    /// Current task list.
    pub tasks: Vec<Task>,
    /// A request is in flight.
    pub loading: bool,
    /// Message of the most recent failure, cleared when a request starts.
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
