//! Execution dispatcher: routes run requests to lazily created, asynchronously
//! initializing sandboxed backends, one per language.
//!
//! The dispatcher guarantees that every request resolves exactly once — by a
//! backend reply, by timeout synthesis, or by an immediate informational
//! result for languages without a backend capability. Failures are always
//! encoded in the [`codepair_protocol::ExecutionResult`], never raised to the
//! caller.

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pending;

pub use backend::{
    BackendFactory, BackendHandle, BackendReply, BackendSubmission, SandboxRuntime,
    spawn_runtime_backend,
};
pub use config::DispatcherConfig;
pub use dispatcher::ExecutionDispatcher;
pub use error::BackendError;
