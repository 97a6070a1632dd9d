//! Upload session state types

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Conversation Identity
// ============================================================================

/// Opaque identity of one chat (Telegram `chat.id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Upload Steps
// ============================================================================

/// Step of the upload wizard a session is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadStep {
    /// Waiting for the video title
    Title,
    /// Waiting for the video URL
    VideoLink,
    /// Waiting for the thumbnail URL
    ImageLink,
    /// All fields collected, pipeline in flight
    Uploading,
}

impl UploadStep {
    /// The field a text message fills in while in this step
    pub fn collects(self) -> Option<SessionField> {
        match self {
            UploadStep::Title => Some(SessionField::Title),
            UploadStep::VideoLink => Some(SessionField::VideoLink),
            UploadStep::ImageLink => Some(SessionField::ImageLink),
            UploadStep::Uploading => None,
        }
    }
}

/// A session field, in collection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionField {
    Title,
    VideoLink,
    ImageLink,
}

impl fmt::Display for SessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionField::Title => "title",
            SessionField::VideoLink => "videoLink",
            SessionField::ImageLink => "imageLink",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Session
// ============================================================================

/// In-progress upload wizard for one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub step: UploadStep,
    pub title: Option<String>,
    pub video_link: Option<String>,
    pub image_link: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session waiting for the title
    pub fn new() -> Self {
        Self {
            step: UploadStep::Title,
            title: None,
            video_link: None,
            image_link: None,
        }
    }

    pub fn field(&self, field: SessionField) -> Option<&str> {
        match field {
            SessionField::Title => self.title.as_deref(),
            SessionField::VideoLink => self.video_link.as_deref(),
            SessionField::ImageLink => self.image_link.as_deref(),
        }
    }

    pub(crate) fn set_field(&mut self, field: SessionField, value: String) {
        match field {
            SessionField::Title => self.title = Some(value),
            SessionField::VideoLink => self.video_link = Some(value),
            SessionField::ImageLink => self.image_link = Some(value),
        }
    }
}

// ============================================================================
// Upload Job
// ============================================================================

/// Completed wizard input handed to the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadJob {
    pub conversation_id: ConversationId,
    pub title: String,
    pub video_link: String,
    pub image_link: String,
}
