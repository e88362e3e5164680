//! Query agent module
//!
//! Turns a natural-language question into SQL against a database handle,
//! streams intermediate steps to an observer, and returns a narrated answer.

pub mod observer;
pub mod prompt;
pub mod provisioned;
pub mod sql_agent;
pub mod tools;

pub use observer::{AgentStep, NoopObserver, RecordingObserver, StepObserver};
pub use provisioned::ProvisionedAgent;
pub use sql_agent::{create_agent, QueryAgent, SqlAgent};
pub use tools::{SqlTool, SqlToolkit};
