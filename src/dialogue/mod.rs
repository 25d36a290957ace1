//! The conversation state machine.
//!
//! One finite-state machine per active session, keyed by chat identity.
//! Raw input text is classified once into an [`event::InputEvent`]; per-state
//! handlers in [`engine::DialogueEngine`] consult the profile store, catalog,
//! cake builder, and order ledger and produce the next state plus outbound
//! replies. No collaborator calls back into the engine.

pub mod engine;
pub mod event;
pub mod reply;
pub mod sessions;
pub mod state;

pub use engine::DialogueEngine;
pub use event::InputEvent;
pub use reply::OutgoingReply;
pub use sessions::SessionMap;
pub use state::{DialogState, SessionState};
