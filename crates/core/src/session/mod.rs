//! Per-user selection sessions.
//!
//! A search that returns results opens a session for the requesting user.
//! The user's next reply either picks one of the listed records by number or
//! cancels. Each session is single-use and a newer search replaces it.

mod config;
mod store;
mod types;

pub use config::SessionConfig;
pub use store::SessionStore;
pub use types::{Reply, SelectionSession, SessionState};
