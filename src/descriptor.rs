use std::fmt;
use std::path::Path;

use arrow::datatypes::Schema;

use crate::base::{PartitionKey, Record};

/// Ordered field names records are partitioned by. Empty means the dataset
/// is unpartitioned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PartitionStrategy {
    fields: Vec<String>,
}

impl PartitionStrategy {
    pub fn new<S: Into<String>>(fields: Vec<S>) -> Self {
        PartitionStrategy {
            fields: fields.into_iter().map(|f| f.into()).collect(),
        }
    }

    pub fn unpartitioned() -> Self {
        PartitionStrategy { fields: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Derives the key a record falls under. None if the record is missing
    /// any strategy field.
    pub fn key_for(&self, record: &Record) -> Option<PartitionKey> {
        let mut key = PartitionKey::root();
        for field in &self.fields {
            let value = record.get(field)?;
            key = key.push(field.clone(), value.to_string());
        }
        Some(key)
    }

    /// Derives a key from a `k=v` directory hint. Path components that do
    /// not parse as `k=v` are skipped; a full key needs a value for every
    /// strategy field, anything less yields None.
    pub fn key_from_directory(&self, dir: &Path) -> Option<PartitionKey> {
        if self.fields.is_empty() {
            return None;
        }

        let mut pairs = vec![];
        for component in dir.components() {
            let name = component.as_os_str().to_string_lossy().to_string();
            match (name.find('='), name.ends_with('=')) {
                (Some(idx), false) => {
                    pairs.push((name[0..idx].to_string(), name[idx + 1..].to_string()))
                }
                _ => continue,
            }
        }

        let mut key = PartitionKey::root();
        for field in &self.fields {
            let value = pairs
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value.clone())?;
            key = key.push(field.clone(), value);
        }
        Some(key)
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.fields.join(", "))
    }
}

/// Schema, partition strategy and storage location of a dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    schema: Schema,
    strategy: PartitionStrategy,
    location: Option<String>,
}

impl Descriptor {
    pub fn new(schema: Schema, strategy: PartitionStrategy) -> Self {
        Descriptor {
            schema,
            strategy,
            location: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn strategy(&self) -> &PartitionStrategy {
        &self.strategy
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_partitioned(&self) -> bool {
        !self.strategy.is_empty()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.fields().iter().any(|f| f.name().as_str() == name)
    }

    /// Copy for a derived staging dataset. The location must be cleared so
    /// the store assigns a fresh one.
    pub fn staging_copy(&self) -> Descriptor {
        Descriptor {
            schema: self.schema.clone(),
            strategy: self.strategy.clone(),
            location: None,
        }
    }
}
