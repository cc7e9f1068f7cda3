//! Scripted stub backends for dispatcher tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use codepair_exec::{
    BackendError, BackendFactory, BackendHandle, BackendReply, SandboxRuntime,
    spawn_runtime_backend,
};
use codepair_protocol::{EXIT_SUCCESS, ExecutionResult, Language};
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How a scripted backend behaves for one language.
#[derive(Clone)]
pub enum Behavior {
    /// Ready immediately; echoes the submitted code as stdout.
    Echo,
    /// Ready immediately; accepts submissions and never replies.
    Silent,
    /// Signals readiness only after the delay, then echoes.
    SlowReady(Duration),
    /// Echoes, delaying each reply by the next duration in the queue.
    EchoAfter(Vec<Duration>),
    /// Spawn fails outright.
    FailSpawn,
}

pub struct ScriptedFactory {
    behaviors: HashMap<Language, Behavior>,
    spawned: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new(behaviors: impl IntoIterator<Item = (Language, Behavior)>) -> Self {
        Self {
            behaviors: behaviors.into_iter().collect(),
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of successful spawns; clone before boxing the factory.
    pub fn spawn_counter(&self) -> Arc<AtomicUsize> {
        self.spawned.clone()
    }
}

impl BackendFactory for ScriptedFactory {
    fn spawn(
        &self,
        language: Language,
        reply_tx: mpsc::UnboundedSender<BackendReply>,
    ) -> Result<BackendHandle, BackendError> {
        let behavior = self
            .behaviors
            .get(&language)
            .cloned()
            .unwrap_or(Behavior::Echo);

        let runtime: Box<dyn SandboxRuntime> = match behavior {
            Behavior::FailSpawn => {
                return Err(BackendError::Spawn(format!("no sandbox for {language}")));
            }
            Behavior::Echo => Box::new(ScriptedRuntime::echo()),
            Behavior::Silent => Box::new(ScriptedRuntime {
                silent: true,
                ..ScriptedRuntime::echo()
            }),
            Behavior::SlowReady(delay) => Box::new(ScriptedRuntime {
                init_delay: Some(delay),
                ..ScriptedRuntime::echo()
            }),
            Behavior::EchoAfter(delays) => Box::new(ScriptedRuntime {
                reply_delays: delays.into_iter().collect(),
                ..ScriptedRuntime::echo()
            }),
        };

        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(spawn_runtime_backend(language, runtime, reply_tx))
    }
}

struct ScriptedRuntime {
    init_delay: Option<Duration>,
    silent: bool,
    reply_delays: VecDeque<Duration>,
}

impl ScriptedRuntime {
    fn echo() -> Self {
        Self {
            init_delay: None,
            silent: false,
            reply_delays: VecDeque::new(),
        }
    }
}

#[async_trait]
impl SandboxRuntime for ScriptedRuntime {
    async fn initialize(&mut self) -> anyhow::Result<()> {
        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn run(&mut self, code: &str) -> anyhow::Result<ExecutionResult> {
        if self.silent {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.reply_delays.pop_front() {
            tokio::time::sleep(delay).await;
        }
        Ok(ExecutionResult {
            stdout: code.to_string(),
            stderr: String::new(),
            exit_code: EXIT_SUCCESS,
            duration_ms: 1,
        })
    }
}
