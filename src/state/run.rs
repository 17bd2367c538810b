//! Step cursor and countdown timer of a facilitated run.

use crate::{
    dao::models::SavedRunProgress,
    dto::run::{ProgressPayload, RunStatus, RunStep},
};

/// Step duration assumed when a step does not declare one.
pub const DEFAULT_STEP_MINUTES: f64 = 5.0;
/// Shortest timer a step can get.
pub const MIN_STEP_SECONDS: u32 = 30;

/// Clamp a requested index into the valid range for `len` steps (0 for an empty run).
pub fn clamp_step(index: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.clamp(0, len as i64 - 1) as usize
}

/// Default timer length of a step, in seconds.
pub fn step_duration_seconds(step: Option<&RunStep>) -> u32 {
    let minutes = step
        .and_then(|step| step.duration_minutes)
        .filter(|minutes| minutes.is_finite())
        .unwrap_or(DEFAULT_STEP_MINUTES);
    let seconds = (minutes * 60.0).round().clamp(0.0, u32::MAX as f64) as u32;
    seconds.max(MIN_STEP_SECONDS)
}

/// Countdown attached to the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// Seconds left.
    pub remaining: u32,
    /// Full length in seconds.
    pub total: u32,
    /// Whether it counts down.
    pub running: bool,
}

impl TimerState {
    /// A stopped, full timer of `total` seconds.
    pub fn fresh(total: u32) -> Self {
        Self {
            remaining: total,
            total,
            running: false,
        }
    }
}

/// Current position within a run plus its timer.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCursor {
    steps: Vec<RunStep>,
    index: usize,
    timer: TimerState,
}

impl RunCursor {
    /// Position the cursor at `index` (clamped) with a fresh timer.
    pub fn new(steps: Vec<RunStep>, index: i64) -> Self {
        let index = clamp_step(index, steps.len());
        let timer = TimerState::fresh(step_duration_seconds(steps.get(index)));
        Self { steps, index, timer }
    }

    /// Rebuild the cursor from locally saved progress.
    ///
    /// A missing step index restores to the first step. The timer keeps the saved total when
    /// positive, keeps the saved remaining time when positive (capped at the total), and only
    /// resumes running when time is left.
    pub fn restore(steps: Vec<RunStep>, saved: &SavedRunProgress) -> Self {
        let index = clamp_step(saved.step_index.unwrap_or(0), steps.len());
        let default_total = step_duration_seconds(steps.get(index));

        let total = saved
            .timer_total_seconds
            .filter(|total| *total > 0)
            .map_or(default_total, saturate);
        let remaining = saved
            .remaining_seconds
            .filter(|remaining| *remaining > 0)
            .map_or(total, |remaining| saturate(remaining).min(total));
        let running = saved.is_running.unwrap_or(false) && remaining > 0;

        Self {
            steps,
            index,
            timer: TimerState {
                remaining,
                total,
                running,
            },
        }
    }

    /// Steps of the run.
    pub fn steps(&self) -> &[RunStep] {
        &self.steps
    }

    /// Index of the current step.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The current step, absent for an empty run.
    pub fn current(&self) -> Option<&RunStep> {
        self.steps.get(self.index)
    }

    /// Timer of the current step.
    pub fn timer(&self) -> TimerState {
        self.timer
    }

    /// Move to `index` (clamped). Returns whether the step changed.
    ///
    /// Changing step resets the timer to the new step's default.
    pub fn go_to(&mut self, index: i64) -> bool {
        let next = clamp_step(index, self.steps.len());
        if next == self.index {
            return false;
        }
        self.index = next;
        self.timer = TimerState::fresh(step_duration_seconds(self.current()));
        true
    }

    /// Advance one step.
    pub fn next(&mut self) -> bool {
        self.go_to(self.index as i64 + 1)
    }

    /// Go back one step.
    pub fn prev(&mut self) -> bool {
        self.go_to(self.index as i64 - 1)
    }

    /// Jump to the last step.
    pub fn end(&mut self) -> bool {
        self.go_to(self.steps.len() as i64 - 1)
    }

    /// Start or resume the countdown. No-op when no time is left.
    pub fn start_timer(&mut self) {
        self.timer.running = self.timer.remaining > 0;
    }

    /// Pause the countdown.
    pub fn pause_timer(&mut self) {
        self.timer.running = false;
    }

    /// Refill the timer to its total and stop it.
    pub fn reset_timer(&mut self) {
        self.timer = TimerState::fresh(self.timer.total);
    }

    /// Count down by `seconds`; reaching zero stops the timer.
    pub fn tick(&mut self, seconds: u32) {
        if !self.timer.running {
            return;
        }
        self.timer.remaining = self.timer.remaining.saturating_sub(seconds);
        if self.timer.remaining == 0 {
            self.timer.running = false;
        }
    }

    /// Local storage record.
    pub fn to_saved(&self) -> SavedRunProgress {
        SavedRunProgress {
            step_index: Some(self.index as i64),
            remaining_seconds: Some(i64::from(self.timer.remaining)),
            timer_total_seconds: Some(i64::from(self.timer.total)),
            is_running: Some(self.timer.running),
        }
    }

    /// Server progress payload.
    pub fn to_payload(&self) -> ProgressPayload {
        ProgressPayload {
            current_step_index: self.index,
            status: RunStatus::InProgress,
            timer_remaining: self.timer.remaining,
            timer_total: self.timer.total,
            is_timer_running: self.timer.running,
        }
    }
}

fn saturate(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
