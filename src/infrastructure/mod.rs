//! Infrastructure layer
//!
//! Implementations for external dependencies the core owns directly:
//! - Database (SQLite with sqlx)
//! - Logging bootstrap (tracing)
//!
//! Everything else (LLM backend, memory store, transports, audit sink)
//! is a collaborator behind the domain ports.

pub mod database;
pub mod logging;

pub use database::{DatabaseConnection, SqliteStore};
