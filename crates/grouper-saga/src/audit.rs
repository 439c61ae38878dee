use std::fmt;
use std::time::{Duration, Instant};

/// Where a step ended up after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// The action succeeded and its effect was kept.
    Completed,
    /// The action itself failed.
    Failed,
    /// The action succeeded and was undone afterwards.
    Compensated,
    /// The action succeeded but undoing it failed.
    CompensationFailed,
}

impl StepStatus {
    /// Lowercase name used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Compensated => "compensated",
            Self::CompensationFailed => "compensation-failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a run as seen by the audit log.
#[derive(Debug, Clone)]
pub struct StepRecord {
    step_id: String,
    status: StepStatus,
    elapsed: Duration,
    compensation: Option<String>,
}

impl StepRecord {
    /// Id of the step this record describes.
    #[must_use]
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Final status after execution and any compensation.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Time the action took. Compensation time is not included.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// What undoing the step does, for reversible steps whose action
    /// succeeded.
    #[must_use]
    pub fn compensation(&self) -> Option<&str> {
        self.compensation.as_deref()
    }
}

/// Step-by-step account of a single run, in execution order.
///
/// Steps after the failing one never ran and have no record.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: Vec<StepRecord>,
}

impl AuditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn action_finished(
        &mut self,
        step_id: &str,
        started: Instant,
        result: Result<Option<String>, ()>,
    ) {
        let (status, compensation) = match result {
            Ok(compensation) => (StepStatus::Completed, compensation),
            Err(()) => (StepStatus::Failed, None),
        };
        self.records.push(StepRecord {
            step_id: step_id.to_string(),
            status,
            elapsed: started.elapsed(),
            compensation,
        });
    }

    pub(crate) fn undo_finished(&mut self, step_id: &str, succeeded: bool) {
        if let Some(record) = self.records.iter_mut().find(|r| r.step_id == step_id) {
            record.status = if succeeded {
                StepStatus::Compensated
            } else {
                StepStatus::CompensationFailed
            };
        }
    }

    /// All records in execution order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Record for `step_id`, if the step ran.
    #[must_use]
    pub fn get(&self, step_id: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.step_id == step_id)
    }

    /// Status of `step_id`, if the step ran.
    #[must_use]
    pub fn status_of(&self, step_id: &str) -> Option<StepStatus> {
        self.get(step_id).map(StepRecord::status)
    }

    /// `step=status` pairs in execution order, e.g.
    /// `insert=compensated groupsCreate=failed`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, record) in self.records.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", record.step_id, record.status)?;
        }
        Ok(())
    }
}
