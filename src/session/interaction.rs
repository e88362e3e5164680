//! Interaction loop
//!
//! Explicit state machine for one session's question/answer cycle:
//!
//! ```text
//! Idle --(non-blank input)--> AwaitingAgent --(agent returns)--> Rendered --> Idle
//! any  --(clear)-----------> Idle
//! ```
//!
//! Presentation is passive: the loop hands a [`RenderedView`] to a
//! [`TranscriptRenderer`] after each transition that changes the transcript.

use crate::agent::{QueryAgent, StepObserver};
use crate::session::transcript::{Role, Transcript, TranscriptEntry};
use serde::Serialize;
use tracing::{debug, warn};

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Waiting for the next question
    Idle,
    /// A question is being answered
    AwaitingAgent,
    /// The answer has been appended and rendered
    Rendered,
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    /// Loop state at render time
    pub state: LoopState,
    /// Full transcript
    pub entries: Vec<TranscriptEntry>,
}

/// Receives a view whenever the transcript changes. Must not block.
pub trait TranscriptRenderer: Send + Sync {
    /// Present the view
    fn render(&self, view: &RenderedView);
}

/// Renderer that ignores every view
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl TranscriptRenderer for NoopRenderer {
    fn render(&self, _view: &RenderedView) {}
}

/// What a submission did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// The agent answered
    Answered(String),
    /// The agent failed; the error text was recorded as the assistant entry
    Degraded(String),
}

/// Question/answer state machine over a session transcript
#[derive(Debug, Clone)]
pub struct InteractionLoop {
    transcript: Transcript,
    state: LoopState,
}

impl Default for InteractionLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionLoop {
    /// Start idle with a fresh transcript
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            state: LoopState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Read access to the transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Snapshot of the current state and transcript
    pub fn render(&self) -> RenderedView {
        RenderedView {
            state: self.state,
            entries: self.transcript.replay().to_vec(),
        }
    }

    /// Handle one user submission
    ///
    /// Blank input is a no-op. Otherwise the question is appended and rendered
    /// right away, the agent runs to completion, and exactly one assistant
    /// entry is appended whether it succeeded or not.
    pub async fn submit(
        &mut self,
        input: &str,
        agent: &dyn QueryAgent,
        observer: &dyn StepObserver,
        renderer: &dyn TranscriptRenderer,
    ) -> SubmitOutcome {
        let question = input.trim();
        if question.is_empty() {
            debug!("Ignoring blank submission");
            return SubmitOutcome::Ignored;
        }

        self.transition(LoopState::AwaitingAgent);
        self.transcript.append(Role::User, question);
        renderer.render(&self.render());

        let outcome = match agent.run(question, observer).await {
            Ok(answer) => {
                self.transcript.append(Role::Assistant, answer.clone());
                SubmitOutcome::Answered(answer)
            }
            Err(e) => {
                warn!(error = %e, "Agent failed; recording degraded answer");
                let text = format!("⚠️ Sorry, I couldn't answer that: {}", e);
                self.transcript.append(Role::Assistant, text.clone());
                SubmitOutcome::Degraded(text)
            }
        };

        self.transition(LoopState::Rendered);
        renderer.render(&self.render());
        self.transition(LoopState::Idle);

        outcome
    }

    /// Reset the transcript and return to idle
    pub fn clear(&mut self) -> RenderedView {
        self.transcript.reset();
        self.transition(LoopState::Idle);
        self.render()
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "Interaction loop transition");
        self.state = next;
    }
}
