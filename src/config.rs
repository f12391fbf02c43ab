use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

pub const REPOSITORY_URI: &str = "sink.repository.uri";
pub const DATASET_NAME: &str = "sink.dataset.name";
pub const PARTITION_DIR: &str = "sink.partition.dir";
pub const CONSTRAINTS: &str = "sink.constraints";
pub const TASK_HOOKS: &str = "sink.task.hooks";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid constraint payload: {0}")]
    InvalidConstraints(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Whether the scheduler invokes per-task commit hooks. Some scheduler
/// generations only fire job-level hooks; staged commits would leak attempt
/// datasets there, so this is resolved once at startup and threaded through
/// construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskHooks {
    Invoked,
    Skipped,
}

/// Typed form of the opaque key/value map the scheduler hands to every
/// component invocation.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub repository_uri: String,
    pub dataset_name: String,
    pub partition_dir: Option<PathBuf>,
    /// Raw constraint payload; deserialized at writer-acquisition time so a
    /// bad payload fails that attempt, not job setup.
    pub constraints: Option<String>,
    pub task_hooks: TaskHooks,
}

impl SinkConfig {
    pub fn new<S: Into<String>>(repository_uri: S, dataset_name: S) -> Self {
        SinkConfig {
            repository_uri: repository_uri.into(),
            dataset_name: dataset_name.into(),
            partition_dir: None,
            constraints: None,
            task_hooks: TaskHooks::Invoked,
        }
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let repository_uri = map
            .get(REPOSITORY_URI)
            .ok_or(ConfigError::MissingKey(REPOSITORY_URI))?
            .clone();
        let dataset_name = map
            .get(DATASET_NAME)
            .ok_or(ConfigError::MissingKey(DATASET_NAME))?
            .clone();

        let task_hooks = match map.get(TASK_HOOKS).map(|s| s.as_str()) {
            None | Some("invoked") => TaskHooks::Invoked,
            Some("skipped") => TaskHooks::Skipped,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: TASK_HOOKS,
                    value: other.to_string(),
                })
            }
        };

        Ok(SinkConfig {
            repository_uri,
            dataset_name,
            partition_dir: map.get(PARTITION_DIR).map(PathBuf::from),
            constraints: map.get(CONSTRAINTS).cloned(),
            task_hooks,
        })
    }

    pub fn with_partition_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.partition_dir = Some(dir.into());
        self
    }

    pub fn with_constraints<S: Into<String>>(mut self, payload: S) -> Self {
        self.constraints = Some(payload.into());
        self
    }

    pub fn with_task_hooks(mut self, hooks: TaskHooks) -> Self {
        self.task_hooks = hooks;
        self
    }
}
