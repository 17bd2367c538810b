use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api::RunApi,
    dao::preferences::Preferences,
    dto::run::Run,
    error::ClientError,
    services::progress_sync::ProgressSync,
    state::run::RunCursor,
};

/// Host-side driver of a facilitated run: step navigation, timer and progress persistence.
pub struct RunController {
    run_id: Uuid,
    name: String,
    api: Arc<dyn RunApi>,
    preferences: Preferences,
    cursor: watch::Sender<RunCursor>,
    sync: ProgressSync,
}

impl RunController {
    /// Start a run of `plan_id` on the server and restore any local progress for it.
    pub async fn start(
        api: Arc<dyn RunApi>,
        preferences: Preferences,
        plan_id: &str,
        debounce: Duration,
    ) -> Result<Arc<Self>, ClientError> {
        let response = api.start_run(plan_id).await?;
        info!(plan_id, run_id = %response.run.id, "run started");
        Ok(Self::resume(api, preferences, response.run, debounce))
    }

    /// Attach to an already started run.
    ///
    /// Local progress wins over the server's step index; unreadable local progress restarts
    /// at the first step.
    pub fn resume(
        api: Arc<dyn RunApi>,
        preferences: Preferences,
        run: Run,
        debounce: Duration,
    ) -> Arc<Self> {
        let cursor = match preferences.run_progress(run.id) {
            Ok(Some(saved)) => RunCursor::restore(run.steps, &saved),
            Ok(None) => RunCursor::new(run.steps, run.current_step_index as i64),
            Err(err) => {
                warn!(run_id = %run.id, error = %err, "failed to restore run progress");
                RunCursor::new(run.steps, 0)
            }
        };

        let sync = ProgressSync::new(run.id, api.clone(), preferences.clone(), debounce);
        let (cursor, _rx) = watch::channel(cursor);
        let controller = Arc::new(Self {
            run_id: run.id,
            name: run.name,
            api,
            preferences,
            cursor,
            sync,
        });
        controller.persist();
        controller
    }

    /// Identifier of the run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Display name of the run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cursor.
    pub fn cursor(&self) -> RunCursor {
        self.cursor.borrow().clone()
    }

    /// Subscribe to cursor changes.
    pub fn subscribe(&self) -> watch::Receiver<RunCursor> {
        self.cursor.subscribe()
    }

    /// Advance one step; `false` on the last step.
    pub fn next(&self) -> bool {
        self.change(RunCursor::next)
    }

    /// Go back one step; `false` on the first step.
    pub fn prev(&self) -> bool {
        self.change(RunCursor::prev)
    }

    /// Jump to the last step.
    pub fn end(&self) -> bool {
        self.change(RunCursor::end)
    }

    /// Jump to `index`, clamped to the timeline.
    pub fn go_to(&self, index: i64) -> bool {
        self.change(|cursor| cursor.go_to(index))
    }

    /// Start the step timer.
    pub fn start_timer(&self) {
        self.change(|cursor| {
            cursor.start_timer();
            true
        });
    }

    /// Pause the step timer.
    pub fn pause_timer(&self) {
        self.change(|cursor| {
            cursor.pause_timer();
            true
        });
    }

    /// Rewind the step timer to its full length, stopped.
    pub fn reset_timer(&self) {
        self.change(|cursor| {
            cursor.reset_timer();
            true
        });
    }

    /// Count the timer down by one second.
    pub fn tick(&self) {
        self.change(|cursor| {
            let running = cursor.timer().running;
            cursor.tick(1);
            running
        });
    }

    /// Spawn the one-second timer driver.
    pub fn spawn_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.tick();
            }
        })
    }

    /// Mark the run completed and forget its local progress.
    pub async fn complete(&self) -> Result<(), ClientError> {
        self.sync.cancel();
        self.api.complete_run(self.run_id).await?;
        info!(run_id = %self.run_id, "run completed");
        self.forget_progress();
        Ok(())
    }

    /// Abandon the run and forget its local progress.
    pub async fn abandon(&self) -> Result<(), ClientError> {
        self.sync.cancel();
        self.api.abandon_run(self.run_id).await?;
        info!(run_id = %self.run_id, "run abandoned");
        self.forget_progress();
        Ok(())
    }

    fn change(&self, f: impl FnOnce(&mut RunCursor) -> bool) -> bool {
        let changed = self.cursor.send_if_modified(f);
        if changed {
            self.persist();
        }
        changed
    }

    fn persist(&self) {
        let cursor = self.cursor.borrow().clone();
        self.sync.record(&cursor);
    }

    fn forget_progress(&self) {
        if let Err(err) = self.preferences.clear_run_progress(self.run_id) {
            warn!(run_id = %self.run_id, error = %err, "failed to clear run progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;
    use crate::{
        dao::{local_store::MemoryStore, models::SavedRunProgress},
        dto::run::{RunStatus, StartRunResponse},
        services::progress_sync::tests::{FakeRunApi, step},
    };

    fn run(current_step_index: usize) -> Run {
        Run {
            id: Uuid::from_u128(7),
            plan_id: "plan-1".into(),
            name: "Forest walk".into(),
            status: RunStatus::InProgress,
            current_step_index,
            steps: vec![step("a", 1.0), step("b", 2.0), step("c", 3.0)],
        }
    }

    fn preferences() -> Preferences {
        Preferences::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn start_uses_server_index_without_local_progress() {
        let api = Arc::new(FakeRunApi::default());
        *api.start.lock().unwrap() = Some(StartRunResponse { run: run(1) });

        let controller = RunController::start(api.clone(), preferences(), "plan-1", Duration::from_millis(800))
            .await
            .unwrap();
        assert_eq!(controller.cursor().index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn local_progress_wins_and_is_clamped() {
        let api = Arc::new(FakeRunApi::default());
        let prefs = preferences();
        prefs
            .save_run_progress(
                Uuid::from_u128(7),
                &SavedRunProgress {
                    step_index: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();

        let controller = RunController::resume(api, prefs, run(0), Duration::from_millis(800));
        assert_eq!(controller.cursor().index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_and_syncs() {
        let api = Arc::new(FakeRunApi::default());
        let controller = RunController::resume(api.clone(), preferences(), run(0), Duration::from_millis(800));
        let ticker = controller.spawn_ticker();

        controller.start_timer();
        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(controller.cursor().timer().remaining, 57);

        controller.pause_timer();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(controller.cursor().timer().remaining, 57);
        let last = api.payloads.lock().unwrap().last().cloned().unwrap();
        assert!(!last.is_timer_running);
        assert_eq!(last.timer_remaining, 57);
        ticker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn complete_clears_local_progress() {
        let api = Arc::new(FakeRunApi::default());
        let prefs = preferences();
        let controller = RunController::resume(api.clone(), prefs.clone(), run(0), Duration::from_millis(800));
        controller.next();

        controller.complete().await.unwrap();
        assert_eq!(api.completed.lock().unwrap().as_slice(), &[Uuid::from_u128(7)]);
        assert_eq!(prefs.run_progress(Uuid::from_u128(7)).unwrap(), None);

        sleep(Duration::from_secs(2)).await;
        assert!(api.payloads.lock().unwrap().is_empty());
    }
}
