use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::language::Language;

/// Result produced by a successful run or a backend-reported failure.
pub const EXIT_SUCCESS: i32 = 0;
/// Backend-reported failure, or an informational unsupported-language result.
pub const EXIT_FAILURE: i32 = 1;
/// Dispatcher-synthesized timeout. Negative codes are reserved for the
/// dispatcher; backends never produce them.
pub const EXIT_TIMEOUT: i32 = -1;

/// Token linking a run request to its eventual reply across async boundaries.
///
/// Unique for the lifetime of the process (uuid v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One run invocation. Owned by the dispatcher until resolved; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub correlation_id: CorrelationId,
    pub code: String,
    pub language: Language,
}

/// Structured outcome of one run. Exactly one is produced per request,
/// whether by the backend, by a backend failure, or by timeout synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Synthetic result delivered when the execution deadline expires.
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: "Execution timed out".to_string(),
            exit_code: EXIT_TIMEOUT,
            duration_ms: timeout.as_millis() as u64,
        }
    }
}

/// Reply envelope carrying a result back to its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub correlation_id: CorrelationId,
    pub result: ExecutionResult,
}
