//! Step observation
//!
//! The agent pushes a live trace of what it is doing to a [`StepObserver`].
//! Delivery is fire-and-forget: observers must never block the agent and
//! cannot influence its result.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One intermediate event produced while answering a question
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentStep {
    /// Incremental text from the model while it is generating
    Token {
        /// Text delta
        text: String,
    },
    /// The model's reasoning before choosing an action
    Thought {
        /// Reasoning text
        text: String,
    },
    /// A tool the agent decided to call
    Action {
        /// Tool name
        tool: String,
        /// Raw tool input
        input: String,
    },
    /// What the tool returned
    Observation {
        /// Tool output (or tool error text)
        text: String,
    },
    /// The answer the agent settled on
    FinalAnswer {
        /// Answer text
        text: String,
    },
}

/// Push-only sink for agent steps
pub trait StepObserver: Send + Sync {
    /// Receive one step. Must return promptly.
    fn on_step(&self, step: AgentStep);
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&self, _step: AgentStep) {}
}

/// Forward steps into an unbounded channel; a closed receiver is ignored
impl StepObserver for mpsc::UnboundedSender<AgentStep> {
    fn on_step(&self, step: AgentStep) {
        let _ = self.send(step);
    }
}

/// Observer that keeps every step in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    steps: Mutex<Vec<AgentStep>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn steps(&self) -> Vec<AgentStep> {
        self.steps
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }

    /// Recorded steps without streaming tokens
    pub fn trace(&self) -> Vec<AgentStep> {
        self.steps()
            .into_iter()
            .filter(|s| !matches!(s, AgentStep::Token { .. }))
            .collect()
    }
}

impl StepObserver for RecordingObserver {
    fn on_step(&self, step: AgentStep) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(step);
        }
    }
}
