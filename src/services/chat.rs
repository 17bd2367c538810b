use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{keys::ChatRole, models::ChatReadMarker, preferences::Preferences},
    dto::chat::ChatMessage,
};

/// Unread chat counter backed by the per-viewer read marker.
///
/// Timestamps are RFC 3339 strings produced by one server clock, so lexical comparison is
/// chronological.
pub struct ChatTracker {
    preferences: Preferences,
    session_id: Uuid,
    role: ChatRole,
    token: Option<String>,
}

impl ChatTracker {
    /// Tracker for one viewer of one session.
    pub fn new(
        preferences: Preferences,
        session_id: Uuid,
        role: ChatRole,
        token: Option<String>,
    ) -> Self {
        Self {
            preferences,
            session_id,
            role,
            token,
        }
    }

    /// Timestamp of the last message the viewer has read.
    pub fn last_read(&self) -> Option<String> {
        match self
            .preferences
            .chat_last_read(self.session_id, self.role, self.token.as_deref())
        {
            Ok(marker) => marker.map(|marker| marker.last_read_at),
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "failed to read chat marker");
                None
            }
        }
    }

    /// Messages newer than the read marker. Everything is unread without a marker.
    pub fn unread_count(&self, messages: &[ChatMessage]) -> usize {
        match self.last_read() {
            Some(last_read) => messages
                .iter()
                .filter(|message| message.created_at.as_str() > last_read.as_str())
                .count(),
            None => messages.len(),
        }
    }

    /// Move the marker to the newest message. The marker never moves backwards.
    pub fn mark_read(&self, messages: &[ChatMessage]) {
        let Some(newest) = messages.iter().map(|message| &message.created_at).max() else {
            return;
        };
        if self
            .last_read()
            .is_some_and(|last_read| last_read.as_str() >= newest.as_str())
        {
            return;
        }

        let marker = ChatReadMarker {
            last_read_at: newest.clone(),
        };
        if let Err(err) = self.preferences.set_chat_last_read(
            self.session_id,
            self.role,
            self.token.as_deref(),
            &marker,
        ) {
            warn!(session_id = %self.session_id, error = %err, "failed to store chat marker");
        }
    }
}
