//! # todopro-tasks
//!
//! Client-side task list for the `TodoPro` API.
//!
//! [`TaskStore`] mirrors the remote `/tasks` collection with loading and
//! error indicators. Create, update and delete are applied locally only after
//! the server confirms; completion toggles are applied immediately and
//! reconciled by a full re-fetch when the server rejects them.

#![deny(unsafe_code)]

pub mod errors;
pub mod store;
pub mod types;

pub use errors::TaskError;
pub use store::{
    CREATE_FALLBACK, DELETE_FALLBACK, FETCH_FALLBACK, TOGGLE_FALLBACK, TaskStore, UPDATE_FALLBACK,
};
pub use types::{Task, TaskFields, TaskId, TaskSnapshot};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let snapshot = TaskSnapshot::default();
        assert!(snapshot.tasks.is_empty());
        assert!(!snapshot.loading);
        assert_eq!(TaskError::NotFound(1).to_string(), "Task not found: 1");
    }
}
