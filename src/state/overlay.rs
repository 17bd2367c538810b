//! Arbitration of blocking overlays and the non-blocking drawer layer.

use std::collections::VecDeque;

use uuid::Uuid;

/// Kinds of blocking overlay, in descending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// A blocking decision.
    Decision,
    /// Story text pushed by the host.
    Story,
    /// A host countdown.
    Countdown,
}

impl OverlayKind {
    /// Lower rank wins.
    fn rank(self) -> u8 {
        match self {
            OverlayKind::Decision => 0,
            OverlayKind::Story => 1,
            OverlayKind::Countdown => 2,
        }
    }

    /// Whether `self` strictly outranks `other`.
    pub fn outranks(self, other: OverlayKind) -> bool {
        self.rank() < other.rank()
    }
}

/// A blocking overlay request together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockingOverlay {
    /// A blocking decision waiting for this participant's vote.
    Decision {
        /// Decision waiting for a vote.
        decision_id: Uuid,
        /// Decision title.
        title: Option<String>,
    },
    /// Story text pushed by the host.
    Story {
        /// Optional heading.
        title: Option<String>,
        /// Story text.
        text: String,
    },
    /// A host countdown.
    Countdown {
        /// Length of the countdown.
        duration_seconds: u32,
        /// Text shown under the counter.
        message: Option<String>,
    },
}

impl BlockingOverlay {
    /// Kind of this overlay.
    pub fn kind(&self) -> OverlayKind {
        match self {
            BlockingOverlay::Decision { .. } => OverlayKind::Decision,
            BlockingOverlay::Story { .. } => OverlayKind::Story,
            BlockingOverlay::Countdown { .. } => OverlayKind::Countdown,
        }
    }

    /// Two requests are the same signal when they share kind and identity.
    ///
    /// Decisions are identified by id; there is at most one story and one countdown.
    fn same_signal(&self, other: &BlockingOverlay) -> bool {
        match (self, other) {
            (
                BlockingOverlay::Decision { decision_id: a, .. },
                BlockingOverlay::Decision { decision_id: b, .. },
            ) => a == b,
            (a, b) => a.kind() == b.kind(),
        }
    }
}

/// Selects at most one active blocking overlay and queues the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayArbiter {
    active: Option<BlockingOverlay>,
    queue: VecDeque<BlockingOverlay>,
    terminal: bool,
}

impl OverlayArbiter {
    /// Create an idle arbiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed overlay.
    pub fn active(&self) -> Option<&BlockingOverlay> {
        self.active.as_ref()
    }

    /// Pending overlays in arrival order.
    pub fn queued(&self) -> impl Iterator<Item = &BlockingOverlay> {
        self.queue.iter()
    }

    /// Set once the session ended; later signals are ignored.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Offer a new blocking signal.
    pub fn push(&mut self, overlay: BlockingOverlay) {
        if self.terminal {
            return;
        }

        if let Some(active) = self.active.as_mut() {
            if active.same_signal(&overlay) {
                *active = overlay;
                return;
            }
        }
        if let Some(queued) = self.queue.iter_mut().find(|queued| queued.same_signal(&overlay)) {
            *queued = overlay;
            return;
        }

        match self.active.take() {
            None => self.active = Some(overlay),
            Some(active) if overlay.kind().outranks(active.kind()) => {
                self.queue.push_front(active);
                self.active = Some(overlay);
            }
            Some(active) => {
                self.active = Some(active);
                self.queue.push_back(overlay);
            }
        }
    }

    /// Complete the active overlay if it is of `kind`, promoting the next one.
    ///
    /// Returns whether anything was completed.
    pub fn complete(&mut self, kind: OverlayKind) -> bool {
        if self.active.as_ref().map(BlockingOverlay::kind) != Some(kind) {
            return false;
        }
        self.promote();
        true
    }

    /// Remove a withdrawn decision wherever it sits.
    pub fn withdraw_decision(&mut self, decision_id: Uuid) {
        self.withdraw(|overlay| {
            matches!(overlay, BlockingOverlay::Decision { decision_id: id, .. } if *id == decision_id)
        });
    }

    /// Remove every overlay of `kind` wherever it sits.
    pub fn withdraw_kind(&mut self, kind: OverlayKind) {
        self.withdraw(|overlay| overlay.kind() == kind);
    }

    fn withdraw(&mut self, matches: impl Fn(&BlockingOverlay) -> bool) {
        self.queue.retain(|queued| !matches(queued));
        if self.active.as_ref().is_some_and(&matches) {
            self.promote();
        }
    }

    /// Clear everything and stop accepting signals.
    pub fn end_session(&mut self) {
        self.active = None;
        self.queue.clear();
        self.terminal = true;
    }

    fn promote(&mut self) {
        let next = self
            .queue
            .iter()
            .enumerate()
            .min_by_key(|(index, overlay)| (overlay.kind().rank(), *index))
            .map(|(index, _)| index);

        self.active = next.and_then(|index| self.queue.remove(index));
    }
}

/// User-toggled, non-blocking panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drawer {
    /// Artifact list.
    Artifacts,
    /// Decision history.
    Decisions,
    /// Role card.
    Role,
    /// Participant tools.
    Toolbelt,
}

/// Full overlay layer: the blocking arbiter plus one optional drawer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayStack {
    /// Blocking overlay arbiter.
    pub arbiter: OverlayArbiter,
    drawer: Option<Drawer>,
    artifact_highlight: bool,
}

impl OverlayStack {
    /// Drawer the user opened, if it is not hidden by a blocking overlay.
    pub fn visible_drawer(&self) -> Option<Drawer> {
        if self.arbiter.active().is_some() {
            None
        } else {
            self.drawer
        }
    }

    /// Open `drawer`, or close it when it is already open.
    pub fn toggle_drawer(&mut self, drawer: Drawer) {
        if self.drawer == Some(drawer) {
            self.drawer = None;
            return;
        }
        self.drawer = Some(drawer);
        if drawer == Drawer::Artifacts {
            self.artifact_highlight = false;
        }
    }

    /// Close whatever drawer is open.
    pub fn close_drawer(&mut self) {
        self.drawer = None;
    }

    /// New or changed artifacts arrived.
    pub fn note_artifacts_updated(&mut self) {
        if self.visible_drawer() != Some(Drawer::Artifacts) {
            self.artifact_highlight = true;
        }
    }

    /// Whether the artifacts entry point should draw attention.
    pub fn artifact_highlight(&self) -> bool {
        self.artifact_highlight
    }
}
