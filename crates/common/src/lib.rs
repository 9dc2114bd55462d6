//! Common utilities and shared types for pollbot.
//!
//! This crate provides the foundational components used across all
//! pollbot crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error taxonomy via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID row ids and short poll tokens via [`IdGenerator`]

pub mod config;
pub mod error;
pub mod id;

pub use config::{Config, DatabaseConfig, PollConfig};
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, POLL_ID_LEN};
