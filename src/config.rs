//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Per-session inputs (database backend, credentials,
//! API key) never come from here; they are supplied through the UI.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the bundled local database
pub const LOCAL_DB_FILE_NAME: &str = "student.db";

/// Default model used when a session does not pick one
pub const DEFAULT_MODEL_ID: &str = "llama-3.1-8b-instant";

/// Default base URL of the OpenAI-compatible chat completions API
pub const DEFAULT_MODEL_API_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Model client configuration
    pub model: ModelConfig,
    /// Agent configuration
    pub agent: AgentConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Maximum accepted question length in characters
    pub max_question_length: usize,
    /// Sessions with no activity for this long are dropped by the sweeper
    pub session_idle_timeout: Duration,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the bundled local SQLite database (opened read-only)
    pub local_db_path: PathBuf,
    /// How long a provisioned handle stays valid in the cache
    pub cache_ttl: Duration,
}

/// Model client configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier used when the session does not choose one
    pub default_model_id: String,
    /// Base URL of the chat completions API
    pub api_base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum reasoning iterations before the agent gives up
    pub max_iterations: usize,
    /// Row limit the agent is asked to respect in generated queries
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8501,
                host: "0.0.0.0".to_string(),
                max_question_length: 10_000,
                session_idle_timeout: Duration::from_secs(2 * 60 * 60),
            },
            database: DatabaseConfig {
                local_db_path: default_local_db_path(),
                cache_ttl: Duration::from_secs(2 * 60 * 60),
            },
            model: ModelConfig {
                default_model_id: DEFAULT_MODEL_ID.to_string(),
                api_base_url: DEFAULT_MODEL_API_BASE_URL.to_string(),
                timeout: Duration::from_secs(60),
            },
            agent: AgentConfig {
                max_iterations: 15,
                top_k: 10,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: parse_var("PORT").unwrap_or(defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
                max_question_length: parse_var("MAX_QUESTION_LENGTH")
                    .unwrap_or(defaults.server.max_question_length),
                session_idle_timeout: parse_var("SESSION_IDLE_TIMEOUT_SECS")
                    .filter(|secs: &u64| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.server.session_idle_timeout),
            },
            database: DatabaseConfig {
                local_db_path: env::var_os("LOCAL_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.database.local_db_path),
                cache_ttl: parse_var("DB_CACHE_TTL_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.database.cache_ttl),
            },
            model: ModelConfig {
                default_model_id: env::var("MODEL_ID").unwrap_or(defaults.model.default_model_id),
                api_base_url: env::var("MODEL_API_BASE_URL")
                    .unwrap_or(defaults.model.api_base_url),
                timeout: parse_var("MODEL_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.model.timeout),
            },
            agent: AgentConfig {
                max_iterations: parse_var("AGENT_MAX_ITERATIONS")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(defaults.agent.max_iterations),
                top_k: parse_var("AGENT_TOP_K")
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(defaults.agent.top_k),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// The bundled database lives next to the installed executable. Falls back to
/// the working directory when running from a build tree.
fn default_local_db_path() -> PathBuf {
    let beside_exe = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOCAL_DB_FILE_NAME)));

    match beside_exe {
        Some(path) if path.exists() => path,
        _ => PathBuf::from(LOCAL_DB_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.database.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.server.session_idle_timeout, Duration::from_secs(7200));
        assert_eq!(config.model.default_model_id, "llama-3.1-8b-instant");
        assert_eq!(config.agent.max_iterations, 15);
        assert!(config
            .database
            .local_db_path
            .ends_with(LOCAL_DB_FILE_NAME));
    }

    #[test]
    fn test_server_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9000;
        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }
}
