use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::schema::SchemaNode;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("render failed: {0}")]
    Other(String),
}

/// Opaque render capability bound into a widget.
pub trait WidgetRenderer: Send + Sync {
    fn render(&self, data: &Value) -> Result<String, RenderError>;
}

/// Read-only metadata the binder attaches to every bound widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetMetadata {
    pub schema: SchemaNode,
    pub example_output: Value,
}

pub type ExampleProducer = Box<dyn FnOnce() -> anyhow::Result<Value> + Send>;

/// Where a widget's resolved example comes from.
pub enum ExampleSource {
    /// Used verbatim.
    Value(Value),
    /// Invoked exactly once at bind time.
    Producer(ExampleProducer),
    /// Synthesized from the schema by the mock generator.
    Generate,
}

impl ExampleSource {
    pub fn producer<F>(producer: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Value> + Send + 'static,
    {
        ExampleSource::Producer(Box::new(producer))
    }
}

impl From<Value> for ExampleSource {
    fn from(value: Value) -> Self {
        ExampleSource::Value(value)
    }
}

impl From<Option<Value>> for ExampleSource {
    fn from(value: Option<Value>) -> Self {
        value.map_or(ExampleSource::Generate, ExampleSource::Value)
    }
}

impl fmt::Debug for ExampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleSource::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ExampleSource::Producer(_) => f.write_str("Producer(..)"),
            ExampleSource::Generate => f.write_str("Generate"),
        }
    }
}

/// One persisted metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub name: String,
    pub example_output: Value,
}

/// Widget name to metadata entry, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataMap {
    entries: BTreeMap<String, MetadataEntry>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry keyed by its name. Returns `false` and keeps the
    /// existing entry if the name is already present.
    pub fn insert(&mut self, entry: MetadataEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&MetadataEntry> {
        self.entries.get(name)
    }

    pub fn example_for(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|entry| &entry.example_output)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a map previously written by the extractor.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}
