//! Stage lifecycle bookkeeping.

use sfms_common::FwiParameter;

/// Lifecycle of one (parameter, cadence, run type) calculation.
///
/// `Skipped` is terminal and non-error: a required input simply is not
/// available yet, and a later run will retry from key existence alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    InputsChecked,
    InputsWarped,
    Computed,
    Persisted,
    Skipped,
}

/// What a stage run concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The output key already existed; nothing was written.
    AlreadyDone,
    /// The output was computed and persisted at the given key.
    Persisted { key: String },
    /// A required input was missing; nothing was written.
    Skipped { missing: String },
}

/// Per-stage record returned to callers for observability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub param: FwiParameter,
    pub outcome: StageOutcome,
}

impl StageReport {
    pub fn state(&self) -> StageState {
        match &self.outcome {
            StageOutcome::AlreadyDone | StageOutcome::Persisted { .. } => StageState::Persisted,
            StageOutcome::Skipped { .. } => StageState::Skipped,
        }
    }

    pub fn persisted_key(&self) -> Option<&str> {
        match &self.outcome {
            StageOutcome::Persisted { key } => Some(key),
            _ => None,
        }
    }
}
