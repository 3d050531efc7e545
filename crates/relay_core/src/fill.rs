//! Per-tab fill state machine.
//!
//! `Idle -> Filling -> {Sent | FilledOnly | Failed}`. A follow-up
//! instruction may start from any settled phase and returns the session to
//! `Idle` once it finishes, so the same tab can take another prompt later.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPhase {
    #[default]
    Idle,
    Filling { follow_up: bool },
    Sent,
    FilledOnly,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillFailure {
    /// No input candidate appeared before the locator timed out.
    InputNotFound,
    /// The page rejected the write.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Sent,
    FilledOnly,
    Failed(FillFailure),
    /// No adapter for this page; nothing attempted.
    Unsupported,
    /// Another fill already ran or is running for a non-follow-up instruction.
    Skipped,
}

impl FillOutcome {
    /// Only a submitted prompt is reported back to the coordinator.
    pub fn should_report(self) -> bool {
        matches!(self, FillOutcome::Sent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillSession {
    phase: FillPhase,
    last_outcome: Option<FillOutcome>,
    attempts: u32,
}

impl FillSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FillPhase {
        self.phase
    }

    pub fn last_outcome(&self) -> Option<FillOutcome> {
        self.last_outcome
    }

    /// Number of times `Filling` was entered.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Tries to enter `Filling`. Returns `false` when the instruction must be ignored.
    pub fn begin(&mut self, follow_up: bool) -> bool {
        let allowed = match self.phase {
            FillPhase::Filling { .. } => false,
            FillPhase::Idle => true,
            FillPhase::Sent | FillPhase::FilledOnly | FillPhase::Failed => follow_up,
        };
        if allowed {
            self.phase = FillPhase::Filling { follow_up };
            self.attempts += 1;
        }
        allowed
    }

    /// Leaves `Filling`. Has no effect outside of it.
    pub fn finish(&mut self, outcome: FillOutcome) {
        let FillPhase::Filling { follow_up } = self.phase else {
            return;
        };
        self.last_outcome = Some(outcome);
        self.phase = if follow_up {
            FillPhase::Idle
        } else {
            match outcome {
                FillOutcome::Sent => FillPhase::Sent,
                FillOutcome::FilledOnly => FillPhase::FilledOnly,
                FillOutcome::Failed(_) | FillOutcome::Unsupported | FillOutcome::Skipped => {
                    FillPhase::Failed
                }
            }
        };
    }
}
