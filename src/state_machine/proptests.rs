//! Property-based tests for the state machine
//!
//! Transitions are driven against a real in-memory session store so the
//! properties cover the effects as the runtime applies them.

use super::effect::WELCOME_MESSAGE;
use super::state::*;
use super::transition::*;
use super::*;
use crate::session::{InMemorySessionStore, SessionStore};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Apply the store-mutating effects of one transition, returning all effects
fn step(store: &InMemorySessionStore, id: ConversationId, event: Event) -> Vec<Effect> {
    let session = store.get(id);
    let result = transition(id, session.as_ref(), event).expect("store keeps sessions complete");
    for effect in &result.effects {
        match effect {
            Effect::BeginSession => store.begin(id),
            Effect::Advance { field, value, next } => store
                .advance(id, *field, value.clone(), *next)
                .expect("transition only advances the current field"),
            Effect::Reply { .. } | Effect::StartPipeline { .. } => {}
        }
    }
    result.effects
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9:/. ]{0,24}"
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => Just(Event::Start),
        2 => Just(Event::Upload),
        6 => arb_text().prop_map(Event::Text),
    ]
}

fn arb_step() -> impl Strategy<Value = UploadStep> {
    prop_oneof![
        Just(UploadStep::Title),
        Just(UploadStep::VideoLink),
        Just(UploadStep::ImageLink),
        Just(UploadStep::Uploading),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Uploading is reached exactly on the third text after the latest /upload,
    /// with the fields holding those three texts in order.
    #[test]
    fn prop_uploading_after_exactly_three_texts(events in proptest::collection::vec(arb_event(), 0..40)) {
        let store = InMemorySessionStore::new();
        let id = ConversationId(1);
        let mut texts_since_upload: Option<Vec<String>> = None;

        for event in events {
            match &event {
                Event::Upload => texts_since_upload = Some(vec![]),
                Event::Text(t) => {
                    if let Some(texts) = texts_since_upload.as_mut() {
                        if texts.len() < 3 {
                            texts.push(t.clone());
                        }
                    }
                }
                Event::Start => {}
            }

            let effects = step(&store, id, event);
            let started = effects.iter().any(|e| matches!(e, Effect::StartPipeline { .. }));
            let session = store.get(id);

            match &texts_since_upload {
                None => prop_assert!(session.is_none()),
                Some(texts) => {
                    let session = session.expect("session exists after /upload");
                    let expected_step = match texts.len() {
                        0 => UploadStep::Title,
                        1 => UploadStep::VideoLink,
                        2 => UploadStep::ImageLink,
                        _ => UploadStep::Uploading,
                    };
                    prop_assert_eq!(session.step, expected_step);
                    prop_assert_eq!(session.title.as_ref(), texts.first());
                    prop_assert_eq!(session.video_link.as_ref(), texts.get(1));
                    prop_assert_eq!(session.image_link.as_ref(), texts.get(2));
                    if started {
                        prop_assert_eq!(texts.len(), 3);
                    }
                }
            }
        }
    }

    /// /upload from any step, including a running upload, resets to a fresh title step
    #[test]
    fn prop_upload_resets_from_any_step(target in arb_step(), texts in proptest::collection::vec(arb_text(), 3)) {
        let store = InMemorySessionStore::new();
        let id = ConversationId(2);
        step(&store, id, Event::Upload);
        for text in texts {
            if store.get(id).map(|s| s.step) == Some(target) {
                break;
            }
            step(&store, id, Event::Text(text));
        }

        step(&store, id, Event::Upload);
        prop_assert_eq!(store.get(id), Some(Session::new()));
    }

    /// /start replies with the welcome text and never changes the session
    #[test]
    fn prop_start_is_stateless(events in proptest::collection::vec(arb_event(), 0..10)) {
        let store = InMemorySessionStore::new();
        let id = ConversationId(3);
        for event in events {
            step(&store, id, event);
        }

        let before = store.get(id);
        let effects = step(&store, id, Event::Start);
        prop_assert_eq!(effects, vec![Effect::reply(WELCOME_MESSAGE)]);
        prop_assert_eq!(store.get(id), before);
    }

    /// Text without a session produces no effects at all
    #[test]
    fn prop_text_without_session_is_silent(text in arb_text()) {
        let store = InMemorySessionStore::new();
        let effects = step(&store, ConversationId(4), Event::Text(text));
        prop_assert!(effects.is_empty());
        prop_assert!(store.is_empty());
    }

    /// Interleaved conversations never observe each other's values
    #[test]
    fn prop_conversations_are_isolated(
        a_texts in proptest::collection::vec("a[a-z]{0,8}", 3),
        b_texts in proptest::collection::vec("b[a-z]{0,8}", 3),
    ) {
        let store = InMemorySessionStore::new();
        let (a, b) = (ConversationId(10), ConversationId(11));
        step(&store, a, Event::Upload);
        step(&store, b, Event::Upload);

        for (ta, tb) in a_texts.iter().zip(&b_texts) {
            step(&store, a, Event::Text(ta.clone()));
            step(&store, b, Event::Text(tb.clone()));
        }

        let sa = store.get(a).unwrap();
        let sb = store.get(b).unwrap();
        prop_assert_eq!(sa.title.as_ref(), a_texts.first());
        prop_assert_eq!(sa.image_link.as_ref(), a_texts.get(2));
        prop_assert_eq!(sb.title.as_ref(), b_texts.first());
        prop_assert_eq!(sb.image_link.as_ref(), b_texts.get(2));
    }
}
