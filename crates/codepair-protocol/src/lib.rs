//! Wire-level data model shared by the execution dispatcher and the session hub.
//!
//! Everything here is plain serde types: the transport that carries them
//! (sockets, workers, whatever) lives outside this workspace.

pub mod exec;
pub mod language;
pub mod session;

pub use exec::{
    CorrelationId, EXIT_FAILURE, EXIT_SUCCESS, EXIT_TIMEOUT, ExecutionRequest, ExecutionResponse,
    ExecutionResult,
};
pub use language::{ExecutionSupport, Language, LanguageInfo, UnknownLanguage};
pub use session::{
    ClientEvent, CursorPosition, Participant, ParticipantId, Selection, SessionEvent,
    SessionSnapshot,
};
