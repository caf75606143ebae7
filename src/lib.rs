//! Core library surface for the SmartLibrary TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as the integration tests can reuse the same pieces:
//! the persistence layer, the domain models, and the interactive front-end.
pub mod db;
pub mod models;
pub mod ui;

/// Convenience re-exports for the persistence layer. `ensure_schema` and
/// `seed_default_users` are what `main.rs` calls at startup; `apply_schema`
/// lets tests provision in-memory databases identically.
pub use db::{apply_schema, ensure_schema, seed_default_users};

/// The primary domain types that other layers manipulate.
pub use models::{Author, Book, Club, Loan, Role, User};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
