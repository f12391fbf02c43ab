use std::sync::{Arc, Mutex, MutexGuard};

use im::{HashMap, Vector};
use thiserror::Error;
use tracing::debug;

use crate::base::{PartitionKey, Record};
use crate::dataset::{Dataset, DatasetError, DatasetWriter, Mergeable};
use crate::descriptor::Descriptor;
use crate::view::Constraints;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No dataset named {0}")]
    NotFound(String),

    #[error("Dataset {0} already exists")]
    AlreadyExists(String),

    #[error("Descriptor for {0} carries a foreign location {1}")]
    ForeignLocation(String, String),

    #[error("Store backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Repository of named datasets. `delete` is expected to run behind an
/// `exists` check.
pub trait Store {
    fn create(&self, name: &str, descriptor: Descriptor) -> Result<Box<dyn Dataset>>;
    fn load(&self, name: &str) -> Result<Box<dyn Dataset>>;
    fn exists(&self, name: &str) -> bool;
    fn delete(&self, name: &str) -> Result<()>;
}

#[derive(Clone, Debug)]
struct StoredDataset {
    descriptor: Descriptor,
    rows: HashMap<PartitionKey, Vector<Record>>,
}

#[derive(Debug, Default)]
struct Shared {
    datasets: HashMap<String, StoredDataset>,
}

#[derive(Clone, Copy, Debug)]
struct Capabilities {
    merge: bool,
}

/// In-memory repository. Handles share one registry, so views and staging
/// datasets observe each other's writes the way a real store's would.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
    caps: Capabilities,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            shared: Arc::new(Mutex::new(Shared::default())),
            caps: Capabilities { merge: true },
        }
    }

    /// A store whose datasets expose no merge capability.
    pub fn plain() -> Self {
        MemoryStore {
            shared: Arc::new(Mutex::new(Shared::default())),
            caps: Capabilities { merge: false },
        }
    }

    fn handle(&self, name: &str) -> MemoryDataset {
        MemoryDataset {
            name: name.to_string(),
            shared: self.shared.clone(),
            caps: self.caps,
            view: ViewBound::Whole,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl Store for MemoryStore {
    fn create(&self, name: &str, descriptor: Descriptor) -> Result<Box<dyn Dataset>> {
        if let Some(location) = descriptor.location() {
            return Err(StoreError::ForeignLocation(
                name.to_string(),
                location.to_string(),
            ));
        }

        let mut shared = lock(&self.shared);
        if shared.datasets.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        debug!(dataset = name, "creating dataset");
        shared.datasets.insert(
            name.to_string(),
            StoredDataset {
                descriptor: descriptor.with_location(format!("mem://{}", name)),
                rows: HashMap::new(),
            },
        );

        Ok(Box::new(self.handle(name)))
    }

    fn load(&self, name: &str) -> Result<Box<dyn Dataset>> {
        let shared = lock(&self.shared);
        if !shared.datasets.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(Box::new(self.handle(name)))
    }

    fn exists(&self, name: &str) -> bool {
        lock(&self.shared).datasets.contains_key(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut shared = lock(&self.shared);
        match shared.datasets.remove(name) {
            Some(_) => {
                debug!(dataset = name, "deleted dataset");
                Ok(())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }
}

fn lock(shared: &Arc<Mutex<Shared>>) -> MutexGuard<'_, Shared> {
    shared.lock().expect("store mutex poisoned")
}

#[derive(Clone, Debug)]
enum ViewBound {
    Whole,
    Partition(PartitionKey),
    Constrained(Constraints),
}

#[derive(Clone)]
pub struct MemoryDataset {
    name: String,
    shared: Arc<Mutex<Shared>>,
    caps: Capabilities,
    view: ViewBound,
}

impl MemoryDataset {
    fn restricted(&self, view: ViewBound) -> MemoryDataset {
        MemoryDataset {
            name: self.name.clone(),
            shared: self.shared.clone(),
            caps: self.caps,
            view,
        }
    }

    fn append(&self, record: Record) -> crate::dataset::Result<()> {
        let mut shared = lock(&self.shared);
        let stored = shared
            .datasets
            .get_mut(&self.name)
            .ok_or_else(|| DatasetError::Missing(self.name.clone()))?;

        for (field, _) in record.fields() {
            if !stored.descriptor.has_field(field) {
                return Err(DatasetError::UnknownField {
                    dataset: self.name.clone(),
                    field: field.clone(),
                    record: record.to_string(),
                });
            }
        }

        let key = match &self.view {
            ViewBound::Partition(key) => key.clone(),
            ViewBound::Constrained(constraints) => {
                if !constraints.matches(&record) {
                    return Err(DatasetError::OutsideView {
                        dataset: self.name.clone(),
                        record: record.to_string(),
                    });
                }
                self.route(stored, &record)?
            }
            ViewBound::Whole => self.route(stored, &record)?,
        };

        stored
            .rows
            .entry(key)
            .or_insert_with(Vector::new)
            .push_back(record);
        Ok(())
    }

    fn route(&self, stored: &StoredDataset, record: &Record) -> crate::dataset::Result<PartitionKey> {
        if !stored.descriptor.is_partitioned() {
            return Ok(PartitionKey::root());
        }
        stored
            .descriptor
            .strategy()
            .key_for(record)
            .ok_or_else(|| DatasetError::Unroutable {
                dataset: self.name.clone(),
                record: record.to_string(),
            })
    }
}

impl Dataset for MemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> crate::dataset::Result<Descriptor> {
        let shared = lock(&self.shared);
        shared
            .datasets
            .get(&self.name)
            .map(|stored| stored.descriptor.clone())
            .ok_or_else(|| DatasetError::Missing(self.name.clone()))
    }

    fn new_writer(&self) -> crate::dataset::Result<Box<dyn DatasetWriter>> {
        Ok(Box::new(MemoryWriter {
            target: self.clone(),
            open: false,
            closed: false,
        }))
    }

    fn partition(
        &self,
        key: &PartitionKey,
        create: bool,
    ) -> crate::dataset::Result<Box<dyn Dataset>> {
        let mut shared = lock(&self.shared);
        let stored = shared
            .datasets
            .get_mut(&self.name)
            .ok_or_else(|| DatasetError::Missing(self.name.clone()))?;

        if !stored.rows.contains_key(key) {
            if !create {
                return Err(DatasetError::MissingPartition(
                    self.name.clone(),
                    key.clone(),
                ));
            }
            stored.rows.insert(key.clone(), Vector::new());
        }

        Ok(Box::new(self.restricted(ViewBound::Partition(key.clone()))))
    }

    fn filter(&self, constraints: &Constraints) -> crate::dataset::Result<Box<dyn Dataset>> {
        Ok(Box::new(
            self.restricted(ViewBound::Constrained(constraints.clone())),
        ))
    }

    fn scan(&self) -> crate::dataset::Result<Vec<(PartitionKey, Record)>> {
        let shared = lock(&self.shared);
        let stored = shared
            .datasets
            .get(&self.name)
            .ok_or_else(|| DatasetError::Missing(self.name.clone()))?;

        let mut records = vec![];
        for (key, rows) in stored.rows.iter() {
            for record in rows.iter() {
                let visible = match &self.view {
                    ViewBound::Whole => true,
                    ViewBound::Partition(bound) => key == bound,
                    ViewBound::Constrained(constraints) => constraints.matches(record),
                };
                if visible {
                    records.push((key.clone(), record.clone()));
                }
            }
        }
        Ok(records)
    }

    fn as_mergeable(&self) -> Option<&dyn Mergeable> {
        if self.caps.merge {
            Some(self)
        } else {
            None
        }
    }
}

impl Mergeable for MemoryDataset {
    fn merge(&self, source: &dyn Dataset) -> crate::dataset::Result<()> {
        // scan before locking: the source usually shares this registry
        let incoming = source.scan()?;

        let mut shared = lock(&self.shared);
        let stored = shared
            .datasets
            .get_mut(&self.name)
            .ok_or_else(|| DatasetError::Missing(self.name.clone()))?;

        debug!(
            target_dataset = %self.name,
            source_dataset = %source.name(),
            records = incoming.len(),
            "merging dataset"
        );
        for (key, record) in incoming {
            stored
                .rows
                .entry(key)
                .or_insert_with(Vector::new)
                .push_back(record);
        }
        Ok(())
    }
}

struct MemoryWriter {
    target: MemoryDataset,
    open: bool,
    closed: bool,
}

impl DatasetWriter for MemoryWriter {
    fn open(&mut self) -> crate::dataset::Result<()> {
        if self.closed {
            return Err(DatasetError::WriterClosed(self.target.name.clone()));
        }
        self.open = true;
        Ok(())
    }

    fn write(&mut self, record: Record) -> crate::dataset::Result<()> {
        if self.closed {
            return Err(DatasetError::WriterClosed(self.target.name.clone()));
        }
        if !self.open {
            return Err(DatasetError::WriterNotOpen(self.target.name.clone()));
        }
        self.target.append(record)
    }

    fn close(&mut self) -> crate::dataset::Result<()> {
        self.open = false;
        self.closed = true;
        Ok(())
    }
}
