//! Upload wizard state machine
//!
//! Pure transitions over an explicit step enum; the runtime executes the
//! resulting effects.

pub mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ConversationId, Session, SessionField, UploadJob, UploadStep};
pub use transition::transition;
