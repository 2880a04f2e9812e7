//! bookshelf-rs: a book-catalog REST API with cover upload and per-user
//! read tracking.
//!
//! The server exposes a JSON API under `/v1/api`: signup/login with bearer
//! tokens, a searchable paginated catalog, genre listings, book creation
//! with cover-image upload to object storage, and per-user read/unread
//! marks.
//!
//! # Features
//!
//! - User accounts with argon2 password hashing and JWT bearer tokens
//! - Catalog search over title, author and genre with pagination
//! - Cover images stored locally or in an S3-compatible bucket
//! - Atomic per-(user, book) read/unread toggling
//! - Uniform `{statusCode, data, message}` response envelopes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and token handling.
pub mod auth;
/// Book catalog service.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// HTTP server.
pub mod server;
/// Read-status service.
pub mod status;
/// Cover image storage.
pub mod storage;
/// Request validation.
pub mod validate;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
