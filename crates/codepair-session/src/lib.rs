//! Session hub: reconciles one shared code buffer, its language and the set
//! of connected participants across concurrent mutation events.
//!
//! Reconciliation is last-write-wins at field level: the hub processes
//! mutations one at a time, so "last processed" is well defined regardless of
//! wall-clock arrival order. There is no merge of concurrent edits.

pub mod error;
pub mod hub;
pub mod registry;

pub use error::HubError;
pub use hub::{HubHandle, HubSnapshot, SessionHub, SessionHubConfig};
pub use registry::{CURSOR_PALETTE, ParticipantRegistry};
