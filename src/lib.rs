pub mod base;
pub mod committer;
pub mod config;
pub mod dataset;
pub mod descriptor;
pub mod naming;
pub mod sink;
pub mod store;
pub mod view;
pub mod writer;

pub use base::{JobId, PartitionKey, Record, TaskAttemptId, Value};
pub use committer::{Committer, MergeCommitter, NullCommitter};
pub use config::{SinkConfig, TaskHooks};
pub use dataset::{Dataset, DatasetError, DatasetWriter, Mergeable};
pub use descriptor::{Descriptor, PartitionStrategy};
pub use sink::DatasetSink;
pub use store::{MemoryStore, Store, StoreError};
pub use view::{Constraints, WriteView};
pub use writer::DatasetRecordWriter;
