//! The hub actor and its handle.
//!
//! The hub owns the canonical `{code, language, participants}` state and runs
//! as a task draining a control channel, so mutations are applied one at a
//! time without a shared lock. Joining is a single awaited step: admission,
//! registration and the snapshot reply all happen inside one control message,
//! which leaves no room for a double-registered connect callback.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use codepair_protocol::{
    CursorPosition, Language, Participant, ParticipantId, Selection, SessionEvent, SessionSnapshot,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::HubError;
use crate::registry::ParticipantRegistry;

/// Initial state for a freshly spawned hub.
#[derive(Debug, Clone)]
pub struct SessionHubConfig {
    pub initial_code: String,
    pub initial_language: Language,
    /// Capacity of the control channel feeding the hub task.
    pub control_capacity: usize,
}

impl Default for SessionHubConfig {
    fn default() -> Self {
        Self {
            initial_code: String::new(),
            initial_language: Language::Javascript,
            control_capacity: 64,
        }
    }
}

/// Hub state visible to observers (tests, monitoring).
#[derive(Debug, Clone)]
pub struct HubSnapshot {
    pub code: String,
    pub language: Language,
    pub participants: Vec<Participant>,
}

/// Control messages for the hub task.
#[derive(Debug)]
enum HubMsg {
    Join {
        /// Hub assigns a fresh id when absent; presenting an existing id is
        /// the idempotent re-join path.
        participant_id: Option<ParticipantId>,
        display_name_hint: Option<String>,
        outbound: mpsc::UnboundedSender<SessionEvent>,
        resp: oneshot::Sender<SessionSnapshot>,
    },
    Leave {
        participant_id: ParticipantId,
    },
    SetCode {
        participant_id: ParticipantId,
        code: String,
    },
    SetLanguage {
        participant_id: ParticipantId,
        language: Language,
    },
    SetCursor {
        participant_id: ParticipantId,
        position: CursorPosition,
    },
    SetSelection {
        participant_id: ParticipantId,
        selection: Option<Selection>,
    },
    Snapshot {
        resp: oneshot::Sender<HubSnapshot>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// The session hub task. Owns the canonical session state; nothing else may
/// mutate it.
pub struct SessionHub {
    code: String,
    language: Language,
    registry: ParticipantRegistry,
    outbound: HashMap<ParticipantId, mpsc::UnboundedSender<SessionEvent>>,
    control_rx: mpsc::Receiver<HubMsg>,
}

impl SessionHub {
    /// Spawn the hub task and return the handle used to talk to it.
    pub fn spawn(config: SessionHubConfig) -> HubHandle {
        let (control_tx, control_rx) = mpsc::channel(config.control_capacity);
        let hub = SessionHub {
            code: config.initial_code,
            language: config.initial_language,
            registry: ParticipantRegistry::new(),
            outbound: HashMap::new(),
            control_rx,
        };
        tokio::spawn(hub.run());
        HubHandle { tx: control_tx }
    }

    async fn run(mut self) {
        info!("session hub started");
        while let Some(msg) = self.control_rx.recv().await {
            if !self.apply(msg) {
                break;
            }
        }
        info!("session hub stopped");
    }

    /// Apply one control message. Returns `false` on shutdown.
    fn apply(&mut self, msg: HubMsg) -> bool {
        match msg {
            HubMsg::Join {
                participant_id,
                display_name_hint,
                outbound,
                resp,
            } => self.handle_join(participant_id, display_name_hint, outbound, resp),
            HubMsg::Leave { participant_id } => self.handle_leave(&participant_id),
            HubMsg::SetCode {
                participant_id,
                code,
            } => {
                if !self.registry.contains(&participant_id) {
                    debug!(participant = %participant_id, "code mutation from unknown participant dropped");
                    return true;
                }
                // Last write wins: full replacement, no merge.
                self.code = code.clone();
                self.broadcast_except(
                    &participant_id,
                    SessionEvent::CodeMutation {
                        code,
                        participant_id: participant_id.clone(),
                    },
                );
            }
            HubMsg::SetLanguage {
                participant_id,
                language,
            } => {
                if !self.registry.contains(&participant_id) {
                    debug!(participant = %participant_id, "language mutation from unknown participant dropped");
                    return true;
                }
                self.language = language;
                self.broadcast_except(
                    &participant_id,
                    SessionEvent::LanguageMutation {
                        language,
                        participant_id: participant_id.clone(),
                    },
                );
            }
            HubMsg::SetCursor {
                participant_id,
                position,
            } => {
                if !self.registry.set_cursor(&participant_id, position) {
                    debug!(participant = %participant_id, "cursor mutation from unknown participant dropped");
                    return true;
                }
                self.broadcast_except(
                    &participant_id,
                    SessionEvent::CursorMutation {
                        participant_id: participant_id.clone(),
                        position,
                    },
                );
            }
            HubMsg::SetSelection {
                participant_id,
                selection,
            } => {
                if !self.registry.set_selection(&participant_id, selection) {
                    debug!(participant = %participant_id, "selection mutation from unknown participant dropped");
                    return true;
                }
                self.broadcast_except(
                    &participant_id,
                    SessionEvent::SelectionMutation {
                        participant_id: participant_id.clone(),
                        selection,
                    },
                );
            }
            HubMsg::Snapshot { resp } => {
                let _ = resp.send(HubSnapshot {
                    code: self.code.clone(),
                    language: self.language,
                    participants: self.registry.participants(),
                });
            }
            HubMsg::Shutdown { resp } => {
                let _ = resp.send(());
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        participant_id: Option<ParticipantId>,
        display_name_hint: Option<String>,
        outbound: mpsc::UnboundedSender<SessionEvent>,
        resp: oneshot::Sender<SessionSnapshot>,
    ) {
        let id = participant_id.unwrap_or_else(ParticipantId::fresh);
        let rejoin = self.registry.contains(&id);
        let name =
            display_name_hint.unwrap_or_else(|| format!("User-{}", id.short()));
        // Re-joins keep their original color; a fresh join burns the next one.
        let color = match self.registry.get(&id) {
            Some(existing) => existing.color.clone(),
            None => self.registry.next_color().to_string(),
        };
        let record = self
            .registry
            .admit(Participant {
                id: id.clone(),
                name,
                color,
                cursor: None,
                selection: None,
                joined_at_ms: now_ms(),
            })
            .clone();
        self.outbound.insert(id.clone(), outbound);

        let snapshot = SessionSnapshot {
            code: self.code.clone(),
            language: self.language,
            participants: self.registry.participants(),
            your_id: record.id.clone(),
            your_color: record.color.clone(),
        };
        let _ = resp.send(snapshot);

        self.broadcast_except(&id, SessionEvent::ParticipantJoined(record));
        info!(participant = %id, rejoin, "participant joined");
    }

    fn handle_leave(&mut self, id: &ParticipantId) {
        if self.registry.remove(id).is_none() {
            // Participant may have just left; nobody is notified.
            debug!(participant = %id, "leave for unknown participant ignored");
            return;
        }
        self.outbound.remove(id);
        self.broadcast_except(
            id,
            SessionEvent::ParticipantLeft {
                participant_id: id.clone(),
            },
        );
        info!(participant = %id, "participant left");
    }

    /// Deliver `event` to every subscriber except `skip`. Delivery is
    /// best-effort and never blocks the hub; a failed send means the peer is
    /// gone and is treated as its disconnect.
    fn broadcast_except(&mut self, skip: &ParticipantId, event: SessionEvent) {
        let mut gone = Vec::new();
        for (id, tx) in &self.outbound {
            if id == skip {
                continue;
            }
            if tx.send(event.clone()).is_err() {
                gone.push(id.clone());
            }
        }
        for id in gone {
            warn!(participant = %id, "subscriber channel closed; treating as disconnect");
            self.handle_leave(&id);
        }
    }
}

/// Cloneable handle to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubMsg>,
}

impl HubHandle {
    /// Join the session: one awaited step that admits the participant and
    /// returns the full snapshot plus the event stream for this subscriber.
    pub async fn join(
        &self,
        display_name_hint: Option<String>,
    ) -> Result<(SessionSnapshot, mpsc::UnboundedReceiver<SessionEvent>), HubError> {
        self.join_inner(None, display_name_hint).await
    }

    /// Re-join with a known identity. Idempotent: the registry entry is
    /// replaced in place, never duplicated.
    pub async fn rejoin(
        &self,
        participant_id: ParticipantId,
        display_name_hint: Option<String>,
    ) -> Result<(SessionSnapshot, mpsc::UnboundedReceiver<SessionEvent>), HubError> {
        self.join_inner(Some(participant_id), display_name_hint).await
    }

    async fn join_inner(
        &self,
        participant_id: Option<ParticipantId>,
        display_name_hint: Option<String>,
    ) -> Result<(SessionSnapshot, mpsc::UnboundedReceiver<SessionEvent>), HubError> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = oneshot::channel();
        self.send(HubMsg::Join {
            participant_id,
            display_name_hint,
            outbound: outbound_tx,
            resp: resp_tx,
        })
        .await?;
        let snapshot = resp_rx.await.map_err(|_| HubError::Closed)?;
        Ok((snapshot, outbound_rx))
    }

    pub async fn leave(&self, participant_id: ParticipantId) -> Result<(), HubError> {
        self.send(HubMsg::Leave { participant_id }).await
    }

    pub async fn set_code(
        &self,
        participant_id: ParticipantId,
        code: impl Into<String>,
    ) -> Result<(), HubError> {
        self.send(HubMsg::SetCode {
            participant_id,
            code: code.into(),
        })
        .await
    }

    pub async fn set_language(
        &self,
        participant_id: ParticipantId,
        language: Language,
    ) -> Result<(), HubError> {
        self.send(HubMsg::SetLanguage {
            participant_id,
            language,
        })
        .await
    }

    pub async fn set_cursor(
        &self,
        participant_id: ParticipantId,
        position: CursorPosition,
    ) -> Result<(), HubError> {
        self.send(HubMsg::SetCursor {
            participant_id,
            position,
        })
        .await
    }

    pub async fn set_selection(
        &self,
        participant_id: ParticipantId,
        selection: Option<Selection>,
    ) -> Result<(), HubError> {
        self.send(HubMsg::SetSelection {
            participant_id,
            selection,
        })
        .await
    }

    /// Observe the current state without joining.
    pub async fn snapshot(&self) -> Result<HubSnapshot, HubError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.send(HubMsg::Snapshot { resp: resp_tx }).await?;
        resp_rx.await.map_err(|_| HubError::Closed)
    }

    /// Stop the hub task after it drains the messages already queued.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.send(HubMsg::Shutdown { resp: resp_tx }).await?;
        resp_rx.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, msg: HubMsg) -> Result<(), HubError> {
        self.tx.send(msg).await.map_err(|_| HubError::Closed)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
