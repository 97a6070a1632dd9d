//! Pure state transition function
//!
//! Given the current session (if any) and an inbound event, computes the
//! effects the runtime must execute. No I/O happens here.

use super::effect::{IMAGE_LINK_PROMPT, TITLE_PROMPT, VIDEO_LINK_PROMPT, WELCOME_MESSAGE};
use super::state::{ConversationId, Session, SessionField, UploadJob, UploadStep};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransitionResult {
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// The event is dropped: no state change, no reply
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_ignored(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("session for {0} reached the last step without {1}")]
    IncompleteSession(ConversationId, SessionField),
}

/// Pure transition function
pub fn transition(
    conversation_id: ConversationId,
    session: Option<&Session>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session, event) {
        // /start never touches the session
        (_, Event::Start) => {
            Ok(TransitionResult::new().with_effect(Effect::reply(WELCOME_MESSAGE)))
        }

        // /upload always starts over. A pipeline still running for the replaced
        // session keeps going and only releases its own generation.
        (_, Event::Upload) => Ok(TransitionResult::new()
            .with_effect(Effect::BeginSession)
            .with_effect(Effect::reply(TITLE_PROMPT))),

        // Free text is not collected while the pipeline runs
        (
            Some(Session {
                step: UploadStep::Uploading,
                ..
            }),
            Event::Text(_),
        ) => Ok(TransitionResult::ignored()),

        (None, Event::Text(_)) => Ok(TransitionResult::ignored()),

        (
            Some(Session {
                step: UploadStep::Title,
                ..
            }),
            Event::Text(title),
        ) => Ok(TransitionResult::new()
            .with_effect(Effect::advance(
                SessionField::Title,
                title,
                UploadStep::VideoLink,
            ))
            .with_effect(Effect::reply(VIDEO_LINK_PROMPT))),

        (
            Some(Session {
                step: UploadStep::VideoLink,
                ..
            }),
            Event::Text(video_link),
        ) => Ok(TransitionResult::new()
            .with_effect(Effect::advance(
                SessionField::VideoLink,
                video_link,
                UploadStep::ImageLink,
            ))
            .with_effect(Effect::reply(IMAGE_LINK_PROMPT))),

        (
            Some(
                session @ Session {
                    step: UploadStep::ImageLink,
                    ..
                },
            ),
            Event::Text(image_link),
        ) => {
            let title = required(conversation_id, session, SessionField::Title)?;
            let video_link = required(conversation_id, session, SessionField::VideoLink)?;

            let job = UploadJob {
                conversation_id,
                title,
                video_link,
                image_link: image_link.clone(),
            };

            Ok(TransitionResult::new()
                .with_effect(Effect::advance(
                    SessionField::ImageLink,
                    image_link,
                    UploadStep::Uploading,
                ))
                .with_effect(Effect::StartPipeline { job }))
        }
    }
}

fn required(
    conversation_id: ConversationId,
    session: &Session,
    field: SessionField,
) -> Result<String, TransitionError> {
    session
        .field(field)
        .map(str::to_string)
        .ok_or(TransitionError::IncompleteSession(conversation_id, field))
}
