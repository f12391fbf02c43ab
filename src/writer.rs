use anyhow::Result;

use crate::base::Record;
use crate::dataset::{Dataset, DatasetWriter};

/// Record-write delegate for one task attempt. Opens a writer against the
/// resolved view on construction; records pass straight through, the paired
/// value the framework carries is discarded unconditionally.
pub struct DatasetRecordWriter {
    inner: Box<dyn DatasetWriter>,
}

impl DatasetRecordWriter {
    pub fn new(view: &dyn Dataset) -> Result<Self> {
        let mut inner = view.new_writer()?;
        inner.open()?;
        Ok(DatasetRecordWriter { inner })
    }

    pub fn write<V>(&mut self, record: Record, _value: V) -> Result<()> {
        Ok(self.inner.write(record)?)
    }

    pub fn close(&mut self) -> Result<()> {
        Ok(self.inner.close()?)
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::{DataType, Field, Schema};

    use super::*;
    use crate::base::Value;
    use crate::descriptor::{Descriptor, PartitionStrategy};
    use crate::store::{MemoryStore, Store};

    fn events(store: &MemoryStore) -> Box<dyn Dataset> {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
        store
            .create(
                "events",
                Descriptor::new(schema, PartitionStrategy::unpartitioned()),
            )
            .unwrap()
    }

    #[test]
    fn forwards_records_and_drops_values() {
        let store = MemoryStore::new();
        let dataset = events(&store);

        let mut writer = DatasetRecordWriter::new(dataset.as_ref()).unwrap();
        writer
            .write(Record::new().with("id", Value::Int(1)), "ignored")
            .unwrap();
        writer
            .write(Record::new().with("id", Value::Int(2)), 42)
            .unwrap();
        writer.close().unwrap();

        assert_eq!(dataset.scan().unwrap().len(), 2);
    }

    #[test]
    fn writes_after_close_fail() {
        let store = MemoryStore::new();
        let dataset = events(&store);

        let mut writer = DatasetRecordWriter::new(dataset.as_ref()).unwrap();
        writer.close().unwrap();
        assert!(writer
            .write(Record::new().with("id", Value::Int(1)), ())
            .is_err());
    }
}
