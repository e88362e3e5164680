//! Session module
//!
//! Per-user conversation state: the transcript, the interaction loop that
//! drives it, and the registry of live sessions.

pub mod interaction;
pub mod manager;
pub mod transcript;

pub use interaction::{
    InteractionLoop, LoopState, NoopRenderer, RenderedView, SubmitOutcome, TranscriptRenderer,
};
pub use manager::{Session, SessionInfo, SessionManager, SessionSettings};
pub use transcript::{Role, Transcript, TranscriptEntry, GREETING};
