//! Session manager
//!
//! Owns every live chat session. A session binds a database target and one
//! model handle into an agent, plus the interaction loop holding its
//! transcript. Sessions nobody has touched for the idle timeout are swept.

use crate::agent::{ProvisionedAgent, QueryAgent, StepObserver};
use crate::config::{AgentConfig, Config, ModelConfig};
use crate::database::{
    BackendSelection, Clock, ConnectionProvisioner, DatabaseTarget, RemoteCredentials, SystemClock,
};
use crate::error::AppError;
use crate::llm::create_model_client;
use crate::session::interaction::{InteractionLoop, RenderedView, SubmitOutcome, TranscriptRenderer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error, info};

/// Sidebar settings a session is created from
#[derive(Clone, Deserialize)]
pub struct SessionSettings {
    /// Which database to talk to
    pub backend: BackendSelection,
    /// Required when `backend` is remote
    #[serde(default)]
    pub mysql: Option<RemoteCredentials>,
    /// Model provider API key
    #[serde(default)]
    pub api_key: String,
    /// Overrides the configured default model
    #[serde(default)]
    pub model: Option<String>,
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("backend", &self.backend)
            .field("mysql", &self.mysql)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Public description of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Session id
    pub session_id: String,
    /// Selected backend
    pub backend: BackendSelection,
    /// Human-readable database description
    pub database: String,
    /// Model answering questions
    pub model: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

/// One user's chat session
pub struct Session {
    info: SessionInfo,
    agent: Arc<dyn QueryAgent>,
    interaction: Arc<Mutex<InteractionLoop>>,
    last_active: std::sync::Mutex<Instant>,
}

impl Session {
    /// Wrap an agent in a fresh session
    pub fn new(info: SessionInfo, agent: Arc<dyn QueryAgent>) -> Self {
        Self {
            info,
            agent,
            interaction: Arc::new(Mutex::new(InteractionLoop::new())),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Session id
    pub fn id(&self) -> &str {
        &self.info.session_id
    }

    /// Public description
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Agent answering this session's questions
    pub fn agent(&self) -> Arc<dyn QueryAgent> {
        self.agent.clone()
    }

    /// Claim the interaction loop for one question
    ///
    /// Only one question may be in flight per session.
    ///
    /// # Errors
    /// * `AppError::SessionBusy` if a question is already being answered
    pub fn try_begin(&self) -> Result<OwnedMutexGuard<InteractionLoop>, AppError> {
        self.interaction.clone().try_lock_owned().map_err(|_| {
            AppError::SessionBusy(format!(
                "Session {} is still answering the previous question",
                self.info.session_id
            ))
        })
    }

    /// Submit a question and wait for the answer
    pub async fn ask(
        &self,
        input: &str,
        observer: &dyn StepObserver,
        renderer: &dyn TranscriptRenderer,
    ) -> Result<SubmitOutcome, AppError> {
        let mut interaction = self.try_begin()?;
        Ok(interaction
            .submit(input, self.agent.as_ref(), observer, renderer)
            .await)
    }

    /// Reset the transcript, waiting for any in-flight question first
    pub async fn clear(&self) -> RenderedView {
        let mut interaction = self.interaction.lock().await;
        info!(session_id = %self.info.session_id, "Clearing transcript");
        interaction.clear()
    }

    /// Current transcript
    pub async fn view(&self) -> RenderedView {
        self.interaction.lock().await.render()
    }

    /// Whether a question is being answered right now
    pub fn is_busy(&self) -> bool {
        self.interaction.try_lock().is_err()
    }

    fn touch(&self, now: Instant) {
        *self.last_active.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_active = *self.last_active.lock().unwrap_or_else(|e| e.into_inner());
        now.saturating_duration_since(last_active)
    }
}

/// Registry of live sessions
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    provisioner: Arc<ConnectionProvisioner>,
    model_config: ModelConfig,
    agent_config: AgentConfig,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Create a manager sharing `provisioner` across sessions
    pub fn new(provisioner: Arc<ConnectionProvisioner>, config: &Config) -> Self {
        Self::with_clock(provisioner, config, Arc::new(SystemClock))
    }

    /// Create a manager that measures idleness with `clock`
    pub fn with_clock(
        provisioner: Arc<ConnectionProvisioner>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            provisioner,
            model_config: config.model.clone(),
            agent_config: config.agent.clone(),
            idle_timeout: config.server.session_idle_timeout,
            clock,
        }
    }

    /// Shared connection provisioner
    pub fn provisioner(&self) -> &Arc<ConnectionProvisioner> {
        &self.provisioner
    }

    /// Validate settings, connect, and register a new session
    ///
    /// The API key is checked before any connection is attempted. The
    /// database is provisioned here to fail fast, and again for every
    /// question so an expired handle is replaced.
    ///
    /// # Errors
    /// * `AppError::Configuration` for a blank key or incomplete credentials
    /// * `AppError::Connection` if the database cannot be reached
    pub async fn create_session(&self, settings: SessionSettings) -> Result<Arc<Session>, AppError> {
        debug!(?settings, "Creating session");

        let model_id = settings
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.model_config.default_model_id)
            .to_string();
        let model = create_model_client(&settings.api_key, &model_id, true, &self.model_config)?;

        let target = DatabaseTarget::from_selection(settings.backend, settings.mysql);
        let db = self.provisioner.configure(&target).await.map_err(|e| {
            error!(backend = target.selection().as_str(), error = %e, "Failed to provision database");
            e
        })?;

        let info = SessionInfo {
            session_id: uuid::Uuid::new_v4().to_string(),
            backend: target.selection(),
            database: db.description().to_string(),
            model: model_id,
            created_at: Utc::now(),
        };
        drop(db);
        let agent = Arc::new(ProvisionedAgent::new(
            target,
            self.provisioner.clone(),
            model,
            &self.agent_config,
        ));

        Ok(self.insert(Session::new(info, agent)).await)
    }

    /// Register an already-built session
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        session.touch(self.clock.now());
        self.sessions
            .write()
            .await
            .insert(session.id().to_string(), session.clone());
        info!(
            session_id = %session.id(),
            backend = session.info().backend.as_str(),
            model = %session.info().model,
            "Session created"
        );
        session
    }

    /// Look a session up and mark it active
    ///
    /// # Errors
    /// * `AppError::SessionNotFound` if no session has that id
    pub async fn get(&self, session_id: &str) -> Result<Arc<Session>, AppError> {
        let session = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        session.touch(self.clock.now());
        Ok(session)
    }

    /// End a session
    ///
    /// # Errors
    /// * `AppError::SessionNotFound` if no session has that id
    pub async fn remove(&self, session_id: &str) -> Result<(), AppError> {
        match self.sessions.write().await.remove(session_id) {
            Some(_) => {
                info!(session_id = %session_id, "Session ended");
                Ok(())
            }
            None => Err(AppError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Drop sessions idle for longer than the timeout, returning how many
    ///
    /// A session answering a question is kept regardless of its age.
    pub async fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let idle_timeout = self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|session_id, session| {
            let keep = session.is_busy() || session.idle_for(now) < idle_timeout;
            if !keep {
                info!(session_id = %session_id, "Session expired after inactivity");
            }
            keep
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no session is live
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NoopObserver;
    use crate::database::ManualClock;
    use crate::session::interaction::NoopRenderer;
    use crate::session::transcript::GREETING;
    use crate::test_support::seed_students_db;
    use std::time::Duration;
    use tempfile::TempDir;

    fn manager_for(path: impl Into<std::path::PathBuf>) -> SessionManager {
        let provisioner = Arc::new(ConnectionProvisioner::new(path, Duration::from_secs(7200)));
        SessionManager::new(provisioner, &Config::default())
    }

    fn manager_with_clock(path: impl Into<std::path::PathBuf>, clock: Arc<ManualClock>) -> SessionManager {
        let provisioner = Arc::new(ConnectionProvisioner::new(path, Duration::from_secs(7200)));
        SessionManager::with_clock(provisioner, &Config::default(), clock)
    }

    fn local_settings(api_key: &str) -> SessionSettings {
        SessionSettings {
            backend: BackendSelection::Local,
            mysql: None,
            api_key: api_key.to_string(),
            model: None,
        }
    }

    #[tokio::test]
    async fn test_blank_api_key_rejected_before_connecting() {
        let dir = TempDir::new().unwrap();
        let manager = manager_for(dir.path().join("student.db"));

        let err = manager.create_session(local_settings("  ")).await.err().unwrap();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(manager.provisioner().cached_count().await, 0);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_partial_mysql_credentials_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager_for(dir.path().join("student.db"));
        let settings = SessionSettings {
            backend: BackendSelection::Remote,
            mysql: Some(RemoteCredentials::new("localhost", "root", "", "")),
            api_key: "gsk-test".to_string(),
            model: None,
        };

        let err = manager.create_session(settings).await.err().unwrap();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_get_remove_local_session() {
        let (dir, _db) = seed_students_db().await;
        let manager = manager_for(dir.path().join("student.db"));

        let session = manager.create_session(local_settings("gsk-test")).await.unwrap();
        assert_eq!(session.info().backend, BackendSelection::Local);
        assert_eq!(session.info().model, Config::default().model.default_model_id);

        let view = session.view().await;
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].content, GREETING);

        let fetched = manager.get(session.id()).await.unwrap();
        assert!(Arc::ptr_eq(&session, &fetched));

        manager.remove(session.id()).await.unwrap();
        assert!(matches!(
            manager.get(session.id()).await,
            Err(AppError::SessionNotFound(_))
        ));
        assert!(matches!(
            manager.remove(session.id()).await,
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sessions_share_cached_handle() {
        let (dir, _db) = seed_students_db().await;
        let manager = manager_for(dir.path().join("student.db"));

        manager.create_session(local_settings("gsk-a")).await.unwrap();
        manager.create_session(local_settings("gsk-b")).await.unwrap();

        assert_eq!(manager.len().await, 2);
        assert_eq!(manager.provisioner().cached_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_question_while_busy_is_rejected() {
        let (dir, _db) = seed_students_db().await;
        let manager = manager_for(dir.path().join("student.db"));
        let session = manager.create_session(local_settings("gsk-test")).await.unwrap();

        let _guard = session.try_begin().unwrap();
        let err = session
            .ask("How many students?", &NoopObserver, &NoopRenderer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SessionBusy(_)));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_purged() {
        let (dir, _db) = seed_students_db().await;
        let clock = Arc::new(ManualClock::new());
        let manager = manager_with_clock(dir.path().join("student.db"), clock.clone());
        let timeout = Config::default().server.session_idle_timeout;

        let idle = manager.create_session(local_settings("gsk-a")).await.unwrap();
        let active = manager.create_session(local_settings("gsk-b")).await.unwrap();

        clock.advance(timeout - Duration::from_secs(60));
        manager.get(active.id()).await.unwrap();
        assert_eq!(manager.purge_idle().await, 0);

        clock.advance(Duration::from_secs(60));
        assert_eq!(manager.purge_idle().await, 1);
        assert!(matches!(
            manager.get(idle.id()).await,
            Err(AppError::SessionNotFound(_))
        ));
        assert!(manager.get(active.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_busy_session_survives_idle_purge() {
        let (dir, _db) = seed_students_db().await;
        let clock = Arc::new(ManualClock::new());
        let manager = manager_with_clock(dir.path().join("student.db"), clock.clone());
        let session = manager.create_session(local_settings("gsk-test")).await.unwrap();

        let guard = session.try_begin().unwrap();
        clock.advance(Config::default().server.session_idle_timeout * 2);
        assert_eq!(manager.purge_idle().await, 0);

        drop(guard);
        assert_eq!(manager.purge_idle().await, 1);
        assert!(manager.is_empty().await);
    }

    #[test]
    fn test_settings_debug_redacts_api_key() {
        let settings = local_settings("gsk-very-secret");
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("gsk-very-secret"));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: SessionSettings = serde_json::from_str(
            r#"{"backend":"mysql","mysql":{"host":"db:3306","user":"u","password":"p","database":"shop"},"api_key":"k"}"#,
        )
        .unwrap();
        assert_eq!(settings.backend, BackendSelection::Remote);
        assert_eq!(settings.mysql.unwrap().database, "shop");
        assert!(settings.model.is_none());
    }
}
