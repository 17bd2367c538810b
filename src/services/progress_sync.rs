//! Local mirroring and debounced server sync of run progress.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{api::RunApi, dao::preferences::Preferences, state::run::RunCursor};

/// Writes every progress change locally and pushes it to the server after a quiet period.
pub struct ProgressSync {
    run_id: Uuid,
    api: Arc<dyn RunApi>,
    preferences: Preferences,
    debounce: Duration,
    last_payload: Mutex<Option<String>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressSync {
    /// Create the sync for one run.
    pub fn new(
        run_id: Uuid,
        api: Arc<dyn RunApi>,
        preferences: Preferences,
        debounce: Duration,
    ) -> Self {
        Self {
            run_id,
            api,
            preferences,
            debounce,
            last_payload: Mutex::new(None),
            pending: Mutex::new(None),
        }
    }

    /// Record the cursor state.
    ///
    /// Returns `true` when a server push was (re)scheduled, `false` when the payload is identical
    /// to the last one scheduled.
    pub fn record(&self, cursor: &RunCursor) -> bool {
        if let Err(err) = self
            .preferences
            .save_run_progress(self.run_id, &cursor.to_saved())
        {
            warn!(run_id = %self.run_id, error = %err, "failed to persist run progress locally");
        }

        let payload = cursor.to_payload();
        let serialized = match serde_json::to_string(&payload) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(run_id = %self.run_id, error = %err, "failed to encode progress payload");
                return false;
            }
        };

        {
            let mut last = self
                .last_payload
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() == Some(serialized.as_str()) {
                return false;
            }
            *last = Some(serialized);
        }

        let api = self.api.clone();
        let run_id = self.run_id;
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            sleep(debounce).await;
            match api.update_progress(run_id, payload).await {
                Ok(()) => debug!(%run_id, "run progress synced"),
                Err(err) => warn!(%run_id, error = %err, "failed to sync run progress"),
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        true
    }

    /// Drop any scheduled push.
    pub fn cancel(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = pending {
            task.abort();
        }
    }
}

impl Drop for ProgressSync {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        api::ApiResult,
        dao::local_store::{LocalStore, MemoryStore},
        dto::run::{ProgressPayload, RunStep, StartRunResponse},
    };

    #[derive(Default)]
    pub(crate) struct FakeRunApi {
        pub payloads: Mutex<Vec<ProgressPayload>>,
        pub completed: Mutex<Vec<Uuid>>,
        pub abandoned: Mutex<Vec<Uuid>>,
        pub start: Mutex<Option<StartRunResponse>>,
    }

    impl RunApi for FakeRunApi {
        fn start_run(&self, plan_id: &str) -> BoxFuture<'static, ApiResult<StartRunResponse>> {
            let response = self.start.lock().unwrap().clone();
            let path = format!("/api/play/{plan_id}/start");
            Box::pin(async move { response.ok_or_else(|| crate::api::ApiError::status(path, 404)) })
        }

        fn update_progress(
            &self,
            _run_id: Uuid,
            payload: ProgressPayload,
        ) -> BoxFuture<'static, ApiResult<()>> {
            self.payloads.lock().unwrap().push(payload);
            Box::pin(async { Ok(()) })
        }

        fn complete_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>> {
            self.completed.lock().unwrap().push(run_id);
            Box::pin(async { Ok(()) })
        }

        fn abandon_run(&self, run_id: Uuid) -> BoxFuture<'static, ApiResult<()>> {
            self.abandoned.lock().unwrap().push(run_id);
            Box::pin(async { Ok(()) })
        }
    }

    pub(crate) fn step(id: &str, minutes: f64) -> RunStep {
        RunStep {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            duration_minutes: Some(minutes),
            materials: Vec::new(),
            safety: None,
            tag: None,
            note: None,
        }
    }

    fn sync_with(store: Arc<dyn LocalStore>) -> (ProgressSync, Arc<FakeRunApi>, Uuid) {
        let api = Arc::new(FakeRunApi::default());
        let run_id = Uuid::new_v4();
        let sync = ProgressSync::new(
            run_id,
            api.clone(),
            Preferences::new(store),
            Duration::from_millis(800),
        );
        (sync, api, run_id)
    }

    #[tokio::test(start_paused = true)]
    async fn identical_payload_within_window_posts_once() {
        let (sync, api, _) = sync_with(Arc::new(MemoryStore::new()));
        let cursor = RunCursor::new(vec![step("a", 1.0), step("b", 2.0)], 0);

        assert!(sync.record(&cursor));
        sleep(Duration::from_millis(300)).await;
        assert!(!sync.record(&cursor));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(api.payloads.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_within_window_collapse_to_last_write() {
        let (sync, api, _) = sync_with(Arc::new(MemoryStore::new()));
        let mut cursor = RunCursor::new(vec![step("a", 1.0), step("b", 2.0)], 0);

        sync.record(&cursor);
        sleep(Duration::from_millis(500)).await;
        cursor.next();
        sync.record(&cursor);
        sleep(Duration::from_millis(500)).await;
        assert!(api.payloads.lock().unwrap().is_empty());

        sleep(Duration::from_millis(400)).await;
        let payloads = api.payloads.lock().unwrap().clone();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].current_step_index, 1);
        assert_eq!(payloads[0].timer_total, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn local_write_happens_immediately() {
        let store = Arc::new(MemoryStore::new());
        let (sync, _api, run_id) = sync_with(store.clone());
        let cursor = RunCursor::new(vec![step("a", 1.0)], 0);

        sync.record(&cursor);
        let saved = Preferences::new(store).run_progress(run_id).unwrap();
        assert_eq!(saved, Some(cursor.to_saved()));
    }

    #[tokio::test(start_paused = true)]
    async fn storage_quota_does_not_block_server_sync() {
        let (sync, api, _) = sync_with(Arc::new(MemoryStore::with_quota(8)));
        let cursor = RunCursor::new(vec![step("a", 1.0)], 0);

        assert!(sync.record(&cursor));
        sleep(Duration::from_secs(1)).await;
        assert_eq!(api.payloads.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_push() {
        let (sync, api, _) = sync_with(Arc::new(MemoryStore::new()));
        sync.record(&RunCursor::new(vec![step("a", 1.0)], 0));
        sync.cancel();

        sleep(Duration::from_secs(2)).await;
        assert!(api.payloads.lock().unwrap().is_empty());
    }
}
