use thiserror::Error;

use crate::base::{PartitionKey, Record};
use crate::descriptor::Descriptor;
use crate::view::Constraints;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Missing dataset: {0}")]
    Missing(String),

    #[error("Missing partition {1} in dataset {0}")]
    MissingPartition(String, PartitionKey),

    #[error("Dataset {0} does not support constraint views")]
    ViewUnsupported(String),

    #[error("Dataset {0} does not support merging")]
    MergeUnsupported(String),

    #[error("Record {record} does not satisfy the view on dataset {dataset}")]
    OutsideView { dataset: String, record: String },

    #[error("Field {field} of record {record} is not in the schema of dataset {dataset}")]
    UnknownField {
        dataset: String,
        field: String,
        record: String,
    },

    #[error("Record {record} has no value for partition field of dataset {dataset}")]
    Unroutable { dataset: String, record: String },

    #[error("Writer for dataset {0} is not open")]
    WriterNotOpen(String),

    #[error("Writer for dataset {0} is closed")]
    WriterClosed(String),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Capability a dataset may expose: absorbing another dataset's records.
/// Additive only; deleting the source afterwards is the caller's step and is
/// not transactional with the merge.
pub trait Mergeable {
    fn merge(&self, source: &dyn Dataset) -> Result<()>;
}

pub trait DatasetWriter {
    fn open(&mut self) -> Result<()>;
    fn write(&mut self, record: Record) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// A named, schema-and-partitioning-described collection of records, or a
/// restricted view of one. Views are obtained with `partition` and `filter`
/// and write through to the same underlying dataset.
pub trait Dataset {
    fn name(&self) -> &str;

    fn descriptor(&self) -> Result<Descriptor>;

    fn new_writer(&self) -> Result<Box<dyn DatasetWriter>>;

    /// Partition-scoped view. With `create` set an absent partition is
    /// created; without it, an absent partition is an error.
    fn partition(&self, key: &PartitionKey, create: bool) -> Result<Box<dyn Dataset>>;

    /// Constraint-filtered view. Implementations without filter support
    /// return `ViewUnsupported`.
    fn filter(&self, constraints: &Constraints) -> Result<Box<dyn Dataset>>;

    /// Every record visible through this dataset or view, with the partition
    /// it lives under.
    fn scan(&self) -> Result<Vec<(PartitionKey, Record)>>;

    /// Merge capability, resolved by inspection. None means the dataset can
    /// only be written directly.
    fn as_mergeable(&self) -> Option<&dyn Mergeable>;
}

impl std::fmt::Debug for dyn Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset").field("name", &self.name()).finish()
    }
}
