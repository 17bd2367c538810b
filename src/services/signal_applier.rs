//! Folds realtime play events into the published session view.

use std::time::SystemTime;

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, warn};

use crate::{
    dto::events::PlayEvent,
    state::{BlockingOverlay, OverlayKind, ReceivedSignal, SessionView, SharedSession},
};

/// Apply one event to the view.
pub fn apply_event(view: &mut SessionView, event: PlayEvent, now: SystemTime) {
    match event {
        PlayEvent::StateChange { status } => view.apply_status(status),
        PlayEvent::DecisionOpened {
            decision_id,
            title,
            blocking,
        } => {
            if blocking {
                view.overlays.arbiter.push(BlockingOverlay::Decision { decision_id, title });
            }
        }
        PlayEvent::DecisionClosed { decision_id } => {
            view.overlays.arbiter.withdraw_decision(decision_id);
        }
        PlayEvent::StoryShown { title, text } => {
            view.overlays.arbiter.push(BlockingOverlay::Story { title, text });
        }
        PlayEvent::StoryHidden => view.overlays.arbiter.withdraw_kind(OverlayKind::Story),
        PlayEvent::CountdownShown {
            duration_seconds,
            message,
        } => {
            view.overlays.arbiter.push(BlockingOverlay::Countdown {
                duration_seconds,
                message,
            });
        }
        PlayEvent::CountdownSkipped => view.overlays.arbiter.withdraw_kind(OverlayKind::Countdown),
        PlayEvent::ArtifactsUpdated => view.overlays.note_artifacts_updated(),
        PlayEvent::SignalReceived { channel, message } => {
            view.last_signal = Some(ReceivedSignal {
                channel,
                message,
                received_at: now,
            });
        }
    }
}

/// Apply every event received from the hub until it closes.
pub async fn run(state: SharedSession, mut events: Receiver<PlayEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(?event, "applying play event");
                state.update(|view| apply_event(view, event, SystemTime::now()));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "play event consumer lagged; next poll will resync status");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::dto::session::SessionStatus;

    fn view() -> SessionView {
        SessionView::default()
    }

    #[test]
    fn decision_story_countdown_arbitration() {
        let mut view = view();
        let id = Uuid::new_v4();
        let now = SystemTime::now();

        apply_event(
            &mut view,
            PlayEvent::CountdownShown {
                duration_seconds: 30,
                message: None,
            },
            now,
        );
        apply_event(
            &mut view,
            PlayEvent::DecisionOpened {
                decision_id: id,
                title: Some("Left or right?".into()),
                blocking: true,
            },
            now,
        );
        assert_eq!(
            view.overlays.arbiter.active().map(BlockingOverlay::kind),
            Some(OverlayKind::Decision)
        );

        apply_event(&mut view, PlayEvent::DecisionClosed { decision_id: id }, now);
        assert_eq!(
            view.overlays.arbiter.active().map(BlockingOverlay::kind),
            Some(OverlayKind::Countdown)
        );

        apply_event(&mut view, PlayEvent::CountdownSkipped, now);
        assert!(view.overlays.arbiter.active().is_none());
    }

    #[test]
    fn non_blocking_decisions_do_not_open_overlays() {
        let mut view = view();
        apply_event(
            &mut view,
            PlayEvent::DecisionOpened {
                decision_id: Uuid::new_v4(),
                title: None,
                blocking: false,
            },
            SystemTime::now(),
        );
        assert!(view.overlays.arbiter.active().is_none());
    }

    #[test]
    fn ended_status_clears_overlays_for_good() {
        let mut view = view();
        let now = SystemTime::now();
        apply_event(
            &mut view,
            PlayEvent::StoryShown {
                title: None,
                text: "Once upon a time".into(),
            },
            now,
        );
        apply_event(
            &mut view,
            PlayEvent::StateChange {
                status: SessionStatus::Ended,
            },
            now,
        );
        apply_event(&mut view, PlayEvent::CountdownSkipped, now);
        apply_event(
            &mut view,
            PlayEvent::CountdownShown {
                duration_seconds: 5,
                message: None,
            },
            now,
        );
        assert!(view.overlays.arbiter.active().is_none());
    }

    #[test]
    fn signals_and_artifacts_update_view() {
        let mut view = view();
        let now = SystemTime::now();
        apply_event(&mut view, PlayEvent::ArtifactsUpdated, now);
        apply_event(
            &mut view,
            PlayEvent::SignalReceived {
                channel: "help".into(),
                message: Some("stuck".into()),
            },
            now,
        );

        assert!(view.overlays.artifact_highlight());
        assert_eq!(view.last_signal.as_ref().map(|s| s.channel.as_str()), Some("help"));
    }
}
