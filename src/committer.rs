use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::base::{JobId, TaskAttemptId};
use crate::config::SinkConfig;
use crate::dataset::{Dataset, DatasetError, Mergeable};
use crate::naming;
use crate::store::Store;

/// Commit hooks the batch framework drives around a job and its task
/// attempts. Which implementation a job gets is decided once, at sink
/// construction.
pub trait Committer {
    fn setup_job(&self) -> Result<()>;
    fn commit_job(&self) -> Result<()>;
    fn abort_job(&self) -> Result<()>;
    fn setup_task(&self, attempt: &TaskAttemptId) -> Result<()>;
    fn needs_task_commit(&self) -> bool;
    fn commit_task(&self, attempt: &TaskAttemptId) -> Result<()>;
    fn abort_task(&self, attempt: &TaskAttemptId) -> Result<()>;
}

/// Trivial mode: attempts write straight into the target, so there is
/// nothing to commit and nothing to clean up. Used when the target cannot
/// merge or the scheduler cannot guarantee task hook invocation; isolation
/// under retry and speculation is then the scheduler's problem.
pub struct NullCommitter;

impl Committer for NullCommitter {
    fn setup_job(&self) -> Result<()> {
        Ok(())
    }

    fn commit_job(&self) -> Result<()> {
        Ok(())
    }

    fn abort_job(&self) -> Result<()> {
        Ok(())
    }

    fn setup_task(&self, _attempt: &TaskAttemptId) -> Result<()> {
        Ok(())
    }

    fn needs_task_commit(&self) -> bool {
        false
    }

    fn commit_task(&self, _attempt: &TaskAttemptId) -> Result<()> {
        Ok(())
    }

    fn abort_task(&self, _attempt: &TaskAttemptId) -> Result<()> {
        Ok(())
    }
}

/// Staged-merge mode: every attempt writes its own staging dataset, task
/// commit merges it into the job-staging dataset, and job commit merges that
/// into the target in a single step. Nothing an attempt writes is visible in
/// the target before job commit.
pub struct MergeCommitter {
    store: Arc<dyn Store>,
    config: SinkConfig,
    job: JobId,
}

impl MergeCommitter {
    pub fn new(store: Arc<dyn Store>, config: SinkConfig, job: JobId) -> Self {
        MergeCommitter { store, config, job }
    }

    fn job_dataset_name(&self) -> String {
        naming::job_dataset(&self.config.dataset_name, &self.job)
    }

    /// A failed delete after a successful merge leaves the source dataset
    /// behind as a tolerated leak. Reporting the failure would make the
    /// scheduler rerun the commit and merge the records a second time, so
    /// the leak is logged and swallowed; cleanup belongs to an operator.
    fn delete_merged(&self, name: &str) {
        if let Err(error) = self.store.delete(name) {
            warn!(dataset = name, %error, "leaking merged staging dataset");
        }
    }
}

impl Committer for MergeCommitter {
    fn setup_job(&self) -> Result<()> {
        let target = self.store.load(&self.config.dataset_name)?;
        let descriptor = target.descriptor()?.staging_copy();

        let name = self.job_dataset_name();
        info!(job = %self.job, dataset = %name, "creating job staging dataset");
        self.store.create(&name, descriptor)?;
        Ok(())
    }

    fn commit_job(&self) -> Result<()> {
        let target = self.store.load(&self.config.dataset_name)?;
        let job_dataset = self.store.load(&self.job_dataset_name())?;

        let mergeable = target
            .as_mergeable()
            .ok_or_else(|| DatasetError::MergeUnsupported(target.name().to_string()))?;
        mergeable.merge(job_dataset.as_ref())?;

        info!(job = %self.job, dataset = %self.config.dataset_name, "job committed");
        self.delete_merged(&self.job_dataset_name());
        Ok(())
    }

    fn abort_job(&self) -> Result<()> {
        let name = self.job_dataset_name();
        if self.store.exists(&name) {
            self.store.delete(&name)?;
        }
        info!(job = %self.job, "job aborted");
        Ok(())
    }

    fn setup_task(&self, _attempt: &TaskAttemptId) -> Result<()> {
        // the attempt staging dataset is created lazily, at writer acquisition
        Ok(())
    }

    fn needs_task_commit(&self) -> bool {
        // the commit step must still run to look for an attempt dataset
        true
    }

    fn commit_task(&self, attempt: &TaskAttemptId) -> Result<()> {
        let name = naming::task_attempt_dataset(&self.config.dataset_name, attempt);
        if !self.store.exists(&name) {
            // the attempt never wrote a record
            return Ok(());
        }

        let attempt_dataset = self.store.load(&name)?;
        let job_dataset = self.store.load(&self.job_dataset_name())?;

        let mergeable = job_dataset
            .as_mergeable()
            .ok_or_else(|| DatasetError::MergeUnsupported(job_dataset.name().to_string()))?;
        mergeable.merge(attempt_dataset.as_ref())?;

        info!(attempt = %attempt, "task committed");
        self.delete_merged(&name);
        Ok(())
    }

    fn abort_task(&self, attempt: &TaskAttemptId) -> Result<()> {
        let name = naming::task_attempt_dataset(&self.config.dataset_name, attempt);
        if self.store.exists(&name) {
            self.store.delete(&name)?;
        }
        info!(attempt = %attempt, "task aborted");
        Ok(())
    }
}

/// Load-or-create the staging dataset for one task attempt. A dataset
/// already present under this exact attempt id means a re-entrant
/// acquisition; it is reused, never recreated.
pub(crate) fn load_or_create_task_attempt_dataset(
    store: &dyn Store,
    config: &SinkConfig,
    attempt: &TaskAttemptId,
) -> Result<Box<dyn Dataset>> {
    let name = naming::task_attempt_dataset(&config.dataset_name, attempt);
    if store.exists(&name) {
        Ok(store.load(&name)?)
    } else {
        let target = store.load(&config.dataset_name)?;
        let descriptor = target.descriptor()?.staging_copy();
        Ok(store.create(&name, descriptor)?)
    }
}
