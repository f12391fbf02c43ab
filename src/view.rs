use std::fmt;

use anyhow::Result;

use crate::base::{PartitionKey, Record};
use crate::config::{ConfigError, SinkConfig};
use crate::dataset::Dataset;
use crate::descriptor::Descriptor;

/// Conjunction of field equality constraints, serialized into the
/// configuration map as `field=value,field=value`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Constraints {
    terms: Vec<(String, String)>,
}

impl Constraints {
    pub fn equal<S: Into<String>>(field: S, value: S) -> Self {
        Constraints {
            terms: vec![(field.into(), value.into())],
        }
    }

    pub fn and<S: Into<String>>(mut self, field: S, value: S) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.terms.iter().all(|(field, value)| {
            record
                .get(field)
                .map(|v| v.to_string() == *value)
                .unwrap_or(false)
        })
    }

    pub fn serialize(&self) -> String {
        self.terms
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect::<Vec<String>>()
            .join(",")
    }

    pub fn deserialize(payload: &str) -> std::result::Result<Self, ConfigError> {
        let mut terms = vec![];
        for term in payload.split(',') {
            match (term.find('='), term.ends_with('=')) {
                (Some(idx), false) if idx > 0 => {
                    terms.push((term[0..idx].to_string(), term[idx + 1..].to_string()))
                }
                _ => return Err(ConfigError::InvalidConstraints(payload.to_string())),
            }
        }
        Ok(Constraints { terms })
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

/// The view a task attempt writes into, chosen once per writer acquisition.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteView {
    Partition(PartitionKey),
    Constrained(Constraints),
    Whole,
}

/// Priority order: a partition-directory hint against a partitioned dataset
/// wins; a hint that derives no key falls back to the whole dataset, never
/// to the constraints branch. Constraints apply otherwise, and failing both,
/// the dataset is written unfiltered.
pub fn choose(descriptor: &Descriptor, config: &SinkConfig) -> Result<WriteView> {
    if descriptor.is_partitioned() {
        if let Some(dir) = &config.partition_dir {
            return Ok(match descriptor.strategy().key_from_directory(dir) {
                Some(key) => WriteView::Partition(key),
                None => WriteView::Whole,
            });
        }
    }

    if let Some(payload) = &config.constraints {
        return Ok(WriteView::Constrained(Constraints::deserialize(payload)?));
    }

    Ok(WriteView::Whole)
}

pub fn resolve(dataset: Box<dyn Dataset>, config: &SinkConfig) -> Result<Box<dyn Dataset>> {
    let descriptor = dataset.descriptor()?;
    match choose(&descriptor, config)? {
        WriteView::Partition(key) => Ok(dataset.partition(&key, true)?),
        WriteView::Constrained(constraints) => Ok(dataset.filter(&constraints)?),
        WriteView::Whole => Ok(dataset),
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::{DataType, Field, Schema};

    use super::*;
    use crate::base::Value;
    use crate::dataset::{DatasetError, DatasetWriter, Mergeable};
    use crate::descriptor::PartitionStrategy;

    fn descriptor(strategy: PartitionStrategy) -> Descriptor {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("year", DataType::Utf8, false),
        ]);
        Descriptor::new(schema, strategy)
    }

    fn config() -> SinkConfig {
        SinkConfig::new("mem://local", "events")
    }

    #[test]
    fn constraints_round_trip() {
        let constraints = Constraints::equal("year", "2015").and("month", "10");
        assert_eq!(constraints.serialize(), "year=2015,month=10");
        assert_eq!(
            Constraints::deserialize("year=2015,month=10").unwrap(),
            constraints
        );
    }

    #[test]
    fn constraints_match_records() {
        let constraints = Constraints::equal("year", "2015");
        let hit = Record::new()
            .with("id", Value::Int(1))
            .with("year", Value::Str("2015".to_string()));
        let miss = Record::new().with("id", Value::Int(1));

        assert!(constraints.matches(&hit));
        assert!(!constraints.matches(&miss));
    }

    #[test]
    fn bad_payloads_fail_to_deserialize() {
        for payload in &["", "year", "year=", "=2015", "year=2015,"] {
            assert!(
                Constraints::deserialize(payload).is_err(),
                "accepted {:?}",
                payload
            );
        }
    }

    #[test]
    fn hint_on_partitioned_dataset_wins() {
        let descriptor = descriptor(PartitionStrategy::new(vec!["year"]));
        let config = config()
            .with_partition_dir("data/year=2015")
            .with_constraints("year=1999");

        assert_eq!(
            choose(&descriptor, &config).unwrap(),
            WriteView::Partition(PartitionKey::new("year", "2015"))
        );
    }

    #[test]
    fn hint_miss_falls_back_to_whole_not_constraints() {
        let descriptor = descriptor(PartitionStrategy::new(vec!["year"]));
        let config = config()
            .with_partition_dir("data/raw")
            .with_constraints("year=1999");

        assert_eq!(choose(&descriptor, &config).unwrap(), WriteView::Whole);
    }

    #[test]
    fn hint_is_ignored_for_unpartitioned_datasets() {
        let descriptor = descriptor(PartitionStrategy::unpartitioned());
        let config = config()
            .with_partition_dir("data/year=2015")
            .with_constraints("year=2015");

        assert_eq!(
            choose(&descriptor, &config).unwrap(),
            WriteView::Constrained(Constraints::equal("year", "2015"))
        );
    }

    #[test]
    fn no_hint_no_constraints_is_whole() {
        let descriptor = descriptor(PartitionStrategy::new(vec!["year"]));
        assert_eq!(choose(&descriptor, &config()).unwrap(), WriteView::Whole);
    }

    #[test]
    fn invalid_payload_is_a_hard_failure() {
        let descriptor = descriptor(PartitionStrategy::unpartitioned());
        let config = config().with_constraints("year=");
        assert!(choose(&descriptor, &config).is_err());
    }

    struct UnfilterableDataset {
        descriptor: Descriptor,
    }

    impl Dataset for UnfilterableDataset {
        fn name(&self) -> &str {
            "readonly"
        }

        fn descriptor(&self) -> crate::dataset::Result<Descriptor> {
            Ok(self.descriptor.clone())
        }

        fn new_writer(&self) -> crate::dataset::Result<Box<dyn DatasetWriter>> {
            unimplemented!()
        }

        fn partition(
            &self,
            _key: &PartitionKey,
            _create: bool,
        ) -> crate::dataset::Result<Box<dyn Dataset>> {
            unimplemented!()
        }

        fn filter(
            &self,
            _constraints: &Constraints,
        ) -> crate::dataset::Result<Box<dyn Dataset>> {
            Err(DatasetError::ViewUnsupported("readonly".to_string()))
        }

        fn scan(&self) -> crate::dataset::Result<Vec<(PartitionKey, Record)>> {
            Ok(vec![])
        }

        fn as_mergeable(&self) -> Option<&dyn Mergeable> {
            None
        }
    }

    #[test]
    fn unsupported_filter_is_a_hard_failure() {
        let dataset = Box::new(UnfilterableDataset {
            descriptor: descriptor(PartitionStrategy::unpartitioned()),
        });
        let config = config().with_constraints("year=2015");

        let err = resolve(dataset, &config).unwrap_err();
        assert!(err.to_string().contains("does not support constraint views"));
    }
}
