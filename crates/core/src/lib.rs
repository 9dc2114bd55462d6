//! Core business logic for pollbot.

pub mod services;

pub use services::*;
