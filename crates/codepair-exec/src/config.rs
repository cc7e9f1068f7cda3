use std::time::Duration;

/// Execution dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Hard deadline for one execution; expiry synthesizes an exit -1 result.
    pub execution_timeout: Duration,
    /// Soft bound on waiting for a backend's readiness gate; expiry submits
    /// best-effort instead of failing.
    pub readiness_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(10),
            readiness_timeout: Duration::from_secs(5),
        }
    }
}

impl DispatcherConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Recognized variables: `CODEPAIR_EXEC_TIMEOUT_MS`,
    /// `CODEPAIR_READY_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(timeout) = env_millis("CODEPAIR_EXEC_TIMEOUT_MS") {
            config.execution_timeout = timeout;
        }
        if let Some(timeout) = env_millis("CODEPAIR_READY_TIMEOUT_MS") {
            config.readiness_timeout = timeout;
        }
        config
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_millis)
}
