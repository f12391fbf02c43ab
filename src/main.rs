use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use arrow::datatypes::{DataType, Field, Schema};

use dsink::config::{self, SinkConfig};
use dsink::{
    Committer, Dataset, DatasetSink, Descriptor, JobId, MemoryStore, PartitionStrategy, Record,
    Store, TaskAttemptId, Value,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let schema = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
    store.create(
        "events",
        Descriptor::new(schema, PartitionStrategy::unpartitioned()),
    )?;

    let mut conf = HashMap::new();
    conf.insert(config::REPOSITORY_URI.to_string(), "mem://local".to_string());
    conf.insert(config::DATASET_NAME.to_string(), "events".to_string());
    let config = SinkConfig::from_map(&conf)?;

    let sink = DatasetSink::new(store.clone(), config);
    let job = JobId::new("j1");
    let committer = sink.committer(&job)?;

    committer.setup_job()?;

    for (task, ids) in vec![(0usize, vec![1i64, 2]), (1, vec![3])] {
        let attempt = TaskAttemptId::new(job.clone(), task, 0);
        committer.setup_task(&attempt)?;

        let mut writer = sink.record_writer(&attempt)?;
        for id in ids {
            writer.write(Record::new().with("id", Value::Int(id)), ())?;
        }
        writer.close()?;

        if committer.needs_task_commit() {
            committer.commit_task(&attempt)?;
        }
    }

    committer.commit_job()?;

    let events = store.load("events")?;
    println!("events after commit of {}:", job);
    for (key, record) in events.scan()? {
        if key.is_root() {
            println!("  {}", record);
        } else {
            println!("  {}: {}", key, record);
        }
    }

    Ok(())
}
