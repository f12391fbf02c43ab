use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One execution instance of a unit of work. The same logical task may run
/// several attempts (retries, speculation); every attempt renders to a
/// distinct id.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskAttemptId {
    job: JobId,
    task: usize,
    attempt: usize,
}

impl TaskAttemptId {
    pub fn new(job: JobId, task: usize, attempt: usize) -> Self {
        TaskAttemptId { job, task, attempt }
    }

    pub fn job(&self) -> &JobId {
        &self.job
    }
}

impl fmt::Display for TaskAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{:05}_{}", self.job, self.task, self.attempt)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PartitionKey {
    values: Vec<(String, String)>,
}

impl PartitionKey {
    pub fn new<S: Into<String>>(key: S, value: S) -> PartitionKey {
        PartitionKey {
            values: vec![(key.into(), value.into())],
        }
    }

    pub fn root() -> PartitionKey {
        PartitionKey { values: vec![] }
    }

    pub fn push(&self, key: String, value: String) -> PartitionKey {
        let mut values = self.values.clone();
        values.push((key, value));
        PartitionKey { values }
    }

    pub fn is_root(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn std_path(&self) -> PathBuf {
        let mut buf = PathBuf::new();
        for (key, value) in &self.values {
            buf.push(format!("{}={}", key, value));
        }
        buf
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A schema-described entity. Field order follows insertion order; the paired
/// value the batch framework carries alongside each record never reaches this
/// type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: vec![] }
    }

    pub fn with<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.fields.push((field.into(), value));
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}
