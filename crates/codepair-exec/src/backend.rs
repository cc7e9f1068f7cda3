//! Backend seam for sandboxed per-language runtimes.
//!
//! Backends are special: they initialize asynchronously and reply out of
//! order with respect to submission, so the dispatcher never calls them
//! directly. Instead it talks to a [`BackendHandle`]:
//! - submissions flow in through an unbounded channel,
//! - replies flow out through a channel shared by every backend,
//! - readiness is an explicit `watch` signal flipped by the backend itself
//!   once initialization completes (never a timed guess).

use std::time::Duration;

use async_trait::async_trait;
use codepair_protocol::{CorrelationId, EXIT_FAILURE, ExecutionResult, Language};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tracing::{debug, error};

use crate::error::BackendError;

/// One unit of work handed to a backend.
#[derive(Debug, Clone)]
pub struct BackendSubmission {
    pub correlation_id: CorrelationId,
    pub code: String,
}

/// Asynchronous reply from a backend, possibly out of order with respect to
/// other submissions.
#[derive(Debug)]
pub struct BackendReply {
    pub correlation_id: CorrelationId,
    pub result: ExecutionResult,
}

/// Dispatcher-facing face of one sandboxed runtime.
///
/// At most one handle exists per language per process; it lives until the
/// dispatcher's explicit teardown.
pub struct BackendHandle {
    language: Language,
    submit_tx: mpsc::UnboundedSender<BackendSubmission>,
    ready_rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl BackendHandle {
    pub fn new(
        language: Language,
        submit_tx: mpsc::UnboundedSender<BackendSubmission>,
        ready_rx: watch::Receiver<bool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            language,
            submit_tx,
            ready_rx,
            task,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Readiness gate: wait until the backend signals ready, bounded by
    /// `bound`.
    ///
    /// Returns `false` if the bound elapsed or the backend went away before
    /// signaling. Callers proceed best-effort either way; a backend may still
    /// accept work while finishing initialization.
    pub async fn await_ready(&self, bound: Duration) -> bool {
        let mut ready_rx = self.ready_rx.clone();
        matches!(
            timeout(bound, ready_rx.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        )
    }

    pub fn submit(&self, submission: BackendSubmission) -> Result<(), BackendError> {
        self.submit_tx
            .send(submission)
            .map_err(|_| BackendError::ChannelClosed)
    }

    /// Tear down the backend task. Backends are per-process singletons and
    /// are released only here, at session/process teardown.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// How the dispatcher obtains a backend for a language, created lazily on
/// first demand. Physical sandboxing lives behind this trait.
pub trait BackendFactory: Send + Sync {
    fn spawn(
        &self,
        language: Language,
        reply_tx: mpsc::UnboundedSender<BackendReply>,
    ) -> Result<BackendHandle, BackendError>;
}

/// The capability a backend task calls through to actually run source text.
///
/// Implementations wrap an isolated interpreter or worker. Initialization may
/// take an unbounded (but typically small) time; `run` errors are mapped to
/// exit-1 results by the surrounding task, so they surface as data rather
/// than faults.
#[async_trait]
pub trait SandboxRuntime: Send {
    /// Complete asynchronous initialization. Called once, before any run.
    async fn initialize(&mut self) -> anyhow::Result<()>;

    /// Execute source text and return its structured result.
    async fn run(&mut self, code: &str) -> anyhow::Result<ExecutionResult>;
}

/// Wrap a [`SandboxRuntime`] in the channel and readiness plumbing of a
/// [`BackendHandle`].
///
/// The spawned task completes initialization, flips the readiness gate, then
/// serves submissions one at a time, pushing every reply through `reply_tx`.
/// If initialization fails the gate never opens and the submit channel
/// closes, which the dispatcher surfaces as an exit-1 result.
pub fn spawn_runtime_backend(
    language: Language,
    mut runtime: Box<dyn SandboxRuntime>,
    reply_tx: mpsc::UnboundedSender<BackendReply>,
) -> BackendHandle {
    let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<BackendSubmission>();
    let (ready_tx, ready_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        if let Err(err) = runtime.initialize().await {
            error!(%language, error = %err, "backend initialization failed");
            return;
        }
        let _ = ready_tx.send(true);
        debug!(%language, "backend ready");

        while let Some(submission) = submit_rx.recv().await {
            let started = Instant::now();
            let result = match runtime.run(&submission.code).await {
                Ok(result) => result,
                Err(err) => ExecutionResult {
                    stdout: String::new(),
                    stderr: err.to_string(),
                    exit_code: EXIT_FAILURE,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
            };
            let reply = BackendReply {
                correlation_id: submission.correlation_id,
                result,
            };
            if reply_tx.send(reply).is_err() {
                // Dispatcher gone; nothing left to serve.
                break;
            }
        }
    });

    BackendHandle::new(language, submit_tx, ready_rx, task)
}
