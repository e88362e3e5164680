//! Connection provisioning
//!
//! Turns a [`DatabaseTarget`] into a shared [`SqlDatabase`] handle and memoizes
//! it for a bounded time so repeated questions reuse one connection.

use crate::database::cache::{Clock, SystemClock, TtlCache};
use crate::database::handle::SqlDatabase;
use crate::database::models::DatabaseTarget;
use crate::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Shared, reference-counted database handle
pub type DatabaseHandle = Arc<SqlDatabase>;

/// Default lifetime of a cached handle
pub const DEFAULT_HANDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Slot filled once by whichever caller opens the handle first
type HandleSlot = Arc<OnceCell<DatabaseHandle>>;

/// Opens database handles and caches them by target
///
/// The cache may be shared by every session in the process; sessions that
/// supply identical credentials get the same physical pool.
pub struct ConnectionProvisioner {
    local_db_path: PathBuf,
    ttl: Duration,
    cache: Mutex<TtlCache<DatabaseTarget, HandleSlot>>,
}

impl ConnectionProvisioner {
    /// Create a provisioner using the wall clock
    pub fn new(local_db_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(local_db_path, ttl, Arc::new(SystemClock))
    }

    /// Create a provisioner with an injected clock
    pub fn with_clock(local_db_path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            local_db_path: local_db_path.into(),
            ttl,
            cache: Mutex::new(TtlCache::new(ttl, clock)),
        }
    }

    /// Path of the bundled local database
    pub fn local_db_path(&self) -> &PathBuf {
        &self.local_db_path
    }

    /// Return a handle for the target, reusing a live cached one if present
    ///
    /// Concurrent callers for the same target wait for a single open. The
    /// cache lock is only held for the lookup, so a slow remote server never
    /// delays callers asking for a different target.
    ///
    /// # Errors
    /// * `AppError::Configuration` for blank remote fields (no network call is
    ///   made) or a missing/unreadable local file
    /// * `AppError::Connection` if the remote server cannot be reached
    pub async fn configure(&self, target: &DatabaseTarget) -> Result<DatabaseHandle, AppError> {
        if let DatabaseTarget::Remote(credentials) = target {
            credentials.validate()?;
        }

        let slot = self.slot_for(target).await;
        if let Some(handle) = slot.get() {
            debug!(backend = target.selection().as_str(), "Reusing cached database handle");
            return Ok(handle.clone());
        }

        let opened = slot
            .get_or_try_init(|| async {
                let handle = Arc::new(self.open(target).await?);
                info!(
                    backend = target.selection().as_str(),
                    location = %handle.description(),
                    ttl_secs = self.ttl.as_secs(),
                    "Provisioned database handle"
                );
                Ok::<_, AppError>(handle)
            })
            .await;

        match opened {
            Ok(handle) => Ok(handle.clone()),
            Err(e) => {
                // Failures are not cached; the next caller tries again
                self.discard_slot(target, &slot).await;
                Err(e)
            }
        }
    }

    /// Drop the cached handle for a target. Returns true if one was cached.
    pub async fn invalidate(&self, target: &DatabaseTarget) -> bool {
        self.cache.lock().await.invalidate(target)
    }

    /// Drop every cached handle
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    /// Number of cached handles, including expired ones not yet purged
    pub async fn cached_count(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drop expired handles
    pub async fn purge_expired(&self) -> usize {
        self.cache.lock().await.purge_expired()
    }

    async fn slot_for(&self, target: &DatabaseTarget) -> HandleSlot {
        let mut cache = self.cache.lock().await;
        if let Some(slot) = cache.get(target) {
            return slot;
        }
        let slot = HandleSlot::default();
        cache.insert(target.clone(), slot.clone());
        slot
    }

    async fn discard_slot(&self, target: &DatabaseTarget, slot: &HandleSlot) {
        let mut cache = self.cache.lock().await;
        if cache
            .get(target)
            .is_some_and(|current| Arc::ptr_eq(&current, slot) && current.get().is_none())
        {
            cache.invalidate(target);
        }
    }

    async fn open(&self, target: &DatabaseTarget) -> Result<SqlDatabase, AppError> {
        match target {
            DatabaseTarget::Local => SqlDatabase::open_local(&self.local_db_path).await,
            DatabaseTarget::Remote(credentials) => SqlDatabase::connect_mysql(credentials).await,
        }
    }
}
