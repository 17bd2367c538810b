use std::sync::Arc;

use uuid::Uuid;

use crate::dao::{
    keys::{self, ChatRole},
    local_store::{LocalStore, load_json, save_json},
    models::{ChatReadMarker, JoinPreference, SavedRunProgress},
    storage::StorageResult,
};

/// Typed access to every record the client keeps in local storage.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn LocalStore>,
}

impl Preferences {
    /// Wrap a local store backend.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Stored participant token for a session.
    pub fn participant_token(&self, code: &str) -> StorageResult<Option<String>> {
        let token = self.store.get_item(&keys::participant_token(code))?;
        Ok(token.filter(|token| !token.is_empty()))
    }

    /// Remember the participant token for a session.
    pub fn store_participant_token(&self, code: &str, token: &str) -> StorageResult<()> {
        self.store.set_item(&keys::participant_token(code), token)
    }

    /// Forget the participant token for a session.
    pub fn clear_participant_token(&self, code: &str) -> StorageResult<()> {
        self.store.remove_item(&keys::participant_token(code))
    }

    /// Saved join preference; unknown values read as none.
    pub fn join_preference(&self, code: &str) -> StorageResult<Option<JoinPreference>> {
        let raw = self.store.get_item(&keys::join_preference(code))?;
        Ok(raw.as_deref().and_then(JoinPreference::parse))
    }

    /// Persist the join preference.
    pub fn set_join_preference(&self, code: &str, preference: JoinPreference) -> StorageResult<()> {
        self.store
            .set_item(&keys::join_preference(code), preference.as_str())
    }

    /// Saved run progress.
    pub fn run_progress(&self, run_id: Uuid) -> StorageResult<Option<SavedRunProgress>> {
        load_json(self.store.as_ref(), &keys::run_progress(run_id))
    }

    /// Persist run progress.
    pub fn save_run_progress(&self, run_id: Uuid, progress: &SavedRunProgress) -> StorageResult<()> {
        save_json(self.store.as_ref(), &keys::run_progress(run_id), progress)
    }

    /// Forget run progress, once the run completed or was abandoned.
    pub fn clear_run_progress(&self, run_id: Uuid) -> StorageResult<()> {
        self.store.remove_item(&keys::run_progress(run_id))
    }

    /// Last chat timestamp the viewer has read.
    pub fn chat_last_read(
        &self,
        session_id: Uuid,
        role: ChatRole,
        token: Option<&str>,
    ) -> StorageResult<Option<ChatReadMarker>> {
        load_json(
            self.store.as_ref(),
            &keys::chat_last_read(session_id, role, token),
        )
    }

    /// Move the chat read marker.
    pub fn set_chat_last_read(
        &self,
        session_id: Uuid,
        role: ChatRole,
        token: Option<&str>,
        marker: &ChatReadMarker,
    ) -> StorageResult<()> {
        save_json(
            self.store.as_ref(),
            &keys::chat_last_read(session_id, role, token),
            marker,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::local_store::MemoryStore;

    fn preferences() -> (Preferences, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Preferences::new(store.clone()), store)
    }

    #[test]
    fn tokens_are_keyed_by_uppercase_code() {
        let (prefs, store) = preferences();
        prefs.store_participant_token("abcd", "tok-123").unwrap();

        assert_eq!(
            store.get_item("play-participant-token:ABCD").unwrap().as_deref(),
            Some("tok-123")
        );
        assert_eq!(prefs.participant_token("ABCD").unwrap().as_deref(), Some("tok-123"));

        prefs.clear_participant_token("ABCD").unwrap();
        assert_eq!(prefs.participant_token("abcd").unwrap(), None);
    }

    #[test]
    fn unknown_join_preference_reads_as_none() {
        let (prefs, store) = preferences();
        store.set_item("play-join-pref:ABCD", "maybe").unwrap();
        assert_eq!(prefs.join_preference("ABCD").unwrap(), None);

        prefs.set_join_preference("ABCD", JoinPreference::Later).unwrap();
        assert_eq!(prefs.join_preference("ABCD").unwrap(), Some(JoinPreference::Later));
    }

    #[test]
    fn corrupt_run_progress_surfaces_decode_error() {
        let (prefs, store) = preferences();
        let run_id = Uuid::new_v4();
        store
            .set_item(&keys::run_progress(run_id), "{not json")
            .unwrap();

        assert!(prefs.run_progress(run_id).is_err());
    }
}
