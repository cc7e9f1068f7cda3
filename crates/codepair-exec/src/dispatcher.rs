//! Orchestrates backends, the readiness gate and the pending request table
//! into a single `execute` call that never fails.

use std::collections::HashMap;
use std::sync::Arc;

use codepair_protocol::{
    CorrelationId, EXIT_FAILURE, EXIT_SUCCESS, ExecutionResult, ExecutionSupport, Language,
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::backend::{BackendFactory, BackendHandle, BackendReply, BackendSubmission};
use crate::config::DispatcherConfig;
use crate::error::BackendError;
use crate::pending::PendingTable;

/// Routes run requests to per-language backends.
///
/// Backends are lazy singletons: created on first demand for their language,
/// retained for the process lifetime, released by [`ExecutionDispatcher::shutdown`].
/// Work for independent languages proceeds in parallel; only the pending
/// table and the backend map serialize their own read-modify-write windows.
pub struct ExecutionDispatcher {
    factory: Box<dyn BackendFactory>,
    backends: Mutex<HashMap<Language, Arc<BackendHandle>>>,
    pending: Arc<PendingTable>,
    reply_tx: mpsc::UnboundedSender<BackendReply>,
    config: DispatcherConfig,
}

impl ExecutionDispatcher {
    /// Create a dispatcher and spawn its reply-router task.
    ///
    /// The router drains the shared backend reply channel into the pending
    /// table; replies with no pending entry (late after timeout) are logged
    /// and discarded. The router exits on its own once the dispatcher and
    /// every backend are gone.
    pub fn new(factory: Box<dyn BackendFactory>, config: DispatcherConfig) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingTable::new());
        tokio::spawn(route_replies(reply_rx, pending.clone()));
        Self {
            factory,
            backends: Mutex::new(HashMap::new()),
            pending,
            reply_tx,
            config,
        }
    }

    /// Execute `code` against the backend for `language`.
    ///
    /// Never fails: unsupported languages, backend trouble and timeouts are
    /// all encoded in the returned result. Exit codes: `0` success or
    /// display-only notice, `1` backend-reported failure or unavailable
    /// runtime, `-1` dispatcher timeout.
    pub async fn execute(&self, code: &str, language: Language) -> ExecutionResult {
        let correlation_id = CorrelationId::fresh();
        debug!(%correlation_id, %language, "execute");

        match language.execution_support() {
            ExecutionSupport::Sandboxed => {}
            ExecutionSupport::HighlightOnly => return highlight_only_result(language),
            ExecutionSupport::Unavailable => return unavailable_result(language),
        }

        let backend = match self.backend_for(language).await {
            Ok(backend) => backend,
            Err(err) => {
                warn!(%language, error = %err, "backend spawn failed");
                return backend_failure_result(language, &err);
            }
        };

        if !backend.is_ready() {
            let opened = backend.await_ready(self.config.readiness_timeout).await;
            if !opened {
                warn!(%language, "readiness bound elapsed; submitting best-effort");
            }
        }

        let mut rx = self.pending.register(correlation_id.clone()).await;
        let submission = BackendSubmission {
            correlation_id: correlation_id.clone(),
            code: code.to_string(),
        };
        if let Err(err) = backend.submit(submission) {
            self.pending.abandon(&correlation_id).await;
            warn!(%correlation_id, %language, "backend rejected submission");
            return backend_failure_result(language, &err);
        }

        let deadline = tokio::time::sleep(self.config.execution_timeout);
        tokio::pin!(deadline);
        tokio::select! {
            res = &mut rx => match res {
                Ok(result) => result,
                // Continuation dropped without a send; should not happen, but
                // degrade to data per the error policy.
                Err(_) => backend_failure_result(language, &BackendError::ChannelClosed),
            },
            _ = &mut deadline => {
                if self.pending.abandon(&correlation_id).await {
                    info!(%correlation_id, %language, "execution timed out");
                    ExecutionResult::timed_out(self.config.execution_timeout)
                } else {
                    // The reply won the race at the deadline edge; take it.
                    match rx.await {
                        Ok(result) => result,
                        Err(_) => ExecutionResult::timed_out(self.config.execution_timeout),
                    }
                }
            }
        }
    }

    /// Number of requests currently awaiting resolution.
    pub async fn in_flight(&self) -> usize {
        self.pending.len().await
    }

    /// Release every backend. The per-language singletons exist from first
    /// demand until this call; in-flight work on them is aborted.
    pub async fn shutdown(&self) {
        let mut backends = self.backends.lock().await;
        for (language, backend) in backends.drain() {
            debug!(%language, "releasing backend");
            backend.shutdown();
        }
    }

    /// Get or lazily create the backend for `language`.
    ///
    /// The map lock is held only across lookup/insert, so a slow backend for
    /// one language never stalls dispatch for another.
    async fn backend_for(&self, language: Language) -> Result<Arc<BackendHandle>, BackendError> {
        let mut backends = self.backends.lock().await;
        if let Some(backend) = backends.get(&language) {
            return Ok(backend.clone());
        }
        info!(%language, "launching backend");
        let backend = Arc::new(self.factory.spawn(language, self.reply_tx.clone())?);
        backends.insert(language, backend.clone());
        Ok(backend)
    }
}

async fn route_replies(
    mut reply_rx: mpsc::UnboundedReceiver<BackendReply>,
    pending: Arc<PendingTable>,
) {
    while let Some(reply) = reply_rx.recv().await {
        if !pending.resolve(&reply.correlation_id, reply.result).await {
            debug!(correlation_id = %reply.correlation_id, "discarding reply with no pending entry");
        }
    }
    debug!("reply router stopped");
}

fn highlight_only_result(language: Language) -> ExecutionResult {
    ExecutionResult {
        stdout: format!(
            "{} buffers are display-only in this editor; there is no runtime to execute them against.",
            language.display_name()
        ),
        stderr: String::new(),
        exit_code: EXIT_SUCCESS,
        duration_ms: 0,
    }
}

fn unavailable_result(language: Language) -> ExecutionResult {
    let runtime = language.info().map(|info| info.runtime).unwrap_or("required");
    ExecutionResult {
        stdout: String::new(),
        stderr: format!(
            "{} execution is not yet implemented.\n\
             This would require provisioning the {} runtime.\n\
             Currently, JavaScript and Python are fully supported.",
            language.display_name(),
            runtime
        ),
        exit_code: EXIT_FAILURE,
        duration_ms: 0,
    }
}

fn backend_failure_result(language: Language, err: &BackendError) -> ExecutionResult {
    ExecutionResult {
        stdout: String::new(),
        stderr: format!("{} backend unavailable: {}", language.display_name(), err),
        exit_code: EXIT_FAILURE,
        duration_ms: 0,
    }
}
