//! API response types

use serde::Serialize;

/// Response of the health endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Conversations with an upload in progress
    pub active_sessions: usize,
    /// Conversations with a live runtime task
    pub active_conversations: usize,
}
