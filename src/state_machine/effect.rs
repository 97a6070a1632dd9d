//! Effects produced by state transitions

use super::state::{SessionField, UploadJob, UploadStep};

pub const WELCOME_MESSAGE: &str = "Welcome! Send /upload to start uploading video details.";
pub const TITLE_PROMPT: &str = "Send the title of the video.";
pub const VIDEO_LINK_PROMPT: &str = "Send the video link (URL).";
pub const IMAGE_LINK_PROMPT: &str = "Send the image link (URL) for the thumbnail.";

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a text message back to the conversation
    Reply { text: String },

    /// Create (or reset) the session at the title step
    BeginSession,

    /// Store a field and move to the next step
    Advance {
        field: SessionField,
        value: String,
        next: UploadStep,
    },

    /// Hand the completed session to the upload pipeline
    StartPipeline { job: UploadJob },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }

    pub fn advance(field: SessionField, value: impl Into<String>, next: UploadStep) -> Self {
        Effect::Advance {
            field,
            value: value.into(),
            next,
        }
    }
}
