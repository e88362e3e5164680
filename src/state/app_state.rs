//! Application state
//!
//! Holds configuration, the shared connection provisioner, and live sessions

use crate::config::Config;
use crate::database::ConnectionProvisioner;
use crate::session::SessionManager;
use std::sync::Arc;

/// State shared by all handlers
pub struct AppState {
    /// Loaded configuration
    pub config: Config,
    /// Live chat sessions
    pub sessions: SessionManager,
}

impl AppState {
    /// Build state from configuration
    pub fn new(config: Config) -> Self {
        let provisioner = Arc::new(ConnectionProvisioner::new(
            config.database.local_db_path.clone(),
            config.database.cache_ttl,
        ));
        Self::with_provisioner(config, provisioner)
    }

    /// Build state around an existing provisioner
    pub fn with_provisioner(config: Config, provisioner: Arc<ConnectionProvisioner>) -> Self {
        let sessions = SessionManager::new(provisioner, &config);
        Self { config, sessions }
    }

    /// Shared connection provisioner
    pub fn provisioner(&self) -> &Arc<ConnectionProvisioner> {
        self.sessions.provisioner()
    }
}
