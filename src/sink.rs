use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::base::{JobId, TaskAttemptId};
use crate::committer::{self, Committer, MergeCommitter, NullCommitter};
use crate::config::{SinkConfig, TaskHooks};
use crate::store::Store;
use crate::view;
use crate::writer::DatasetRecordWriter;

/// Per-task write path of the batch framework, bound to one target dataset.
/// The framework drives it as: job setup, one writer per task attempt, task
/// commit or abort, job commit or abort.
pub struct DatasetSink {
    store: Arc<dyn Store>,
    config: SinkConfig,
}

impl DatasetSink {
    pub fn new(store: Arc<dyn Store>, config: SinkConfig) -> Self {
        DatasetSink { store, config }
    }

    /// Staged-merge commits need both a mergeable target and a scheduler
    /// that reliably invokes per-task commit hooks. Without either, attempt
    /// isolation is impossible and the sink degrades to direct writes.
    fn staged(&self) -> Result<bool> {
        if self.config.task_hooks == TaskHooks::Skipped {
            return Ok(false);
        }
        let target = self.store.load(&self.config.dataset_name)?;
        Ok(target.as_mergeable().is_some())
    }

    pub fn committer(&self, job: &JobId) -> Result<Box<dyn Committer>> {
        if self.staged()? {
            debug!(job = %job, "using staged-merge commits");
            Ok(Box::new(MergeCommitter::new(
                self.store.clone(),
                self.config.clone(),
                job.clone(),
            )))
        } else {
            debug!(job = %job, "using direct writes");
            Ok(Box::new(NullCommitter))
        }
    }

    pub fn record_writer(&self, attempt: &TaskAttemptId) -> Result<DatasetRecordWriter> {
        let dataset = if self.staged()? {
            committer::load_or_create_task_attempt_dataset(
                self.store.as_ref(),
                &self.config,
                attempt,
            )?
        } else {
            self.store.load(&self.config.dataset_name)?
        };

        let view = view::resolve(dataset, &self.config)?;
        DatasetRecordWriter::new(view.as_ref())
    }
}
