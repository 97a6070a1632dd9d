//! Events that can occur in a conversation

/// Inbound chat input that may trigger a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/start` command
    Start,
    /// `/upload` command
    Upload,
    /// Any other text message
    Text(String),
}

impl Event {
    /// Classify a text message.
    ///
    /// A command is recognized when the first whitespace-separated token is
    /// `/start` or `/upload`, optionally addressed to a bot (`/upload@my_bot`).
    pub fn from_text(text: &str) -> Self {
        let command = text
            .split_whitespace()
            .next()
            .map(|token| token.split('@').next().unwrap_or(token));

        match command {
            Some("/start") => Event::Start,
            Some("/upload") => Event::Upload,
            _ => Event::Text(text.to_string()),
        }
    }
}
