//! SQL Analytics Assistant Library
//!
//! Natural-language questions answered by an agent that plans and runs SQL
//! against a local SQLite file or a remote MySQL server.
//! The server binary is in `src/main.rs`.

pub mod agent;
pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod session;
/// Application state management
///
/// Shared configuration and the session registry.
pub mod state;

#[cfg(test)]
mod test_support;
