//! # todopro-auth
//!
//! Client-side session management for the `TodoPro` API.
//!
//! - [`SessionManager`]: login, registration, logout, startup restore and the
//!   derived `is_authenticated` flag
//! - [`SessionStorage`]: token + user persistence with paired writes over a
//!   [`KeyValueStore`] ([`MemoryStore`] or [`FileStore`])
//! - [`token`]: offline decoding of the JWT `exp` claim
//!
//! The session state is an injected object rather than a global, so tests and
//! front ends can run several isolated sessions side by side.

#![deny(unsafe_code)]

pub mod errors;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use errors::{AuthError, StorageError, TokenError};
pub use session::SessionManager;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SessionStorage, TOKEN_KEY, USER_KEY};
pub use token::{TokenClaims, decode_claims, is_expired_at};
pub use types::{Session, User};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
