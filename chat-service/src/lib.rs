//! Chat backend: anonymous sessions, persistent message history and
//! pluggable reply generation behind a small JSON API.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
