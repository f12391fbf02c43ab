use crate::base::{JobId, TaskAttemptId};

// These formats are shared with previously stored artifacts; they must not
// drift.

pub fn job_dataset(dataset: &str, job: &JobId) -> String {
    format!("{}_{}", dataset, job)
}

pub fn task_attempt_dataset(dataset: &str, attempt: &TaskAttemptId) -> String {
    format!("{}_{}", dataset, attempt)
}
