//! Database module
//!
//! Connection provisioning for the local SQLite file and remote MySQL servers,
//! plus the opaque handle the query agent works against.

pub mod cache;
pub mod handle;
pub mod models;
pub mod provisioner;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use handle::{QueryOutput, SqlDatabase, SqlValue};
pub use models::{BackendSelection, DatabaseTarget, Dialect, RemoteCredentials};
pub use provisioner::{ConnectionProvisioner, DatabaseHandle, DEFAULT_HANDLE_TTL};
