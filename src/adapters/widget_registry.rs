use crate::adapters::mock_generator::MockGenerator;
use crate::adapters::widget_binder::{BindError, BoundWidget, TemplateRenderer, WidgetBinder};
use crate::adapters::widget_source::{
    discover_from_settings, RegistrationKeys, SharedModule, SourceError, SourceUnit, WidgetSource,
};
use crate::config::Settings;
use crate::domain::{ExampleSource, RenderError, SchemaNode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read widget source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Widget '{widget}' has an invalid registration: {reason}")]
    Registration { widget: String, reason: String },

    #[error("Widget '{widget}' declares no schema")]
    MissingSchema { widget: String },

    #[error("Widget '{widget}' references unknown {kind} '{ident}'")]
    UnresolvedReference {
        widget: String,
        kind: &'static str,
        ident: String,
    },

    #[error("Widget template failed to compile: {0}")]
    Template(#[from] RenderError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// A loadable widget module.
#[async_trait]
pub trait WidgetModule: Send + Sync {
    async fn load(&self) -> Result<BoundWidget, LoadError>;
}

#[async_trait]
impl<F> WidgetModule for F
where
    F: Fn() -> Result<BoundWidget, LoadError> + Send + Sync,
{
    async fn load(&self) -> Result<BoundWidget, LoadError> {
        self()
    }
}

/// A widget defined by a source file in the widgets directory.
pub struct SourceWidgetModule {
    unit: SourceUnit,
    shared: Arc<SharedModule>,
    keys: Arc<RegistrationKeys>,
    binder: WidgetBinder,
}

impl SourceWidgetModule {
    pub fn new(
        unit: SourceUnit,
        shared: Arc<SharedModule>,
        keys: Arc<RegistrationKeys>,
        binder: WidgetBinder,
    ) -> Self {
        Self {
            unit,
            shared,
            keys,
            binder,
        }
    }

    fn resolve_schema(&self, source: &WidgetSource) -> Result<SchemaNode, LoadError> {
        let widget = &self.unit.name;
        let ident = source
            .schema_ref
            .as_deref()
            .ok_or_else(|| LoadError::MissingSchema {
                widget: widget.clone(),
            })?;
        self.shared
            .schema(ident)
            .map(SchemaNode::from_json_schema)
            .ok_or_else(|| LoadError::UnresolvedReference {
                widget: widget.clone(),
                kind: "schema",
                ident: ident.to_string(),
            })
    }

    fn resolve_example(&self, source: &WidgetSource) -> Result<ExampleSource, LoadError> {
        match source.example_ref.as_deref() {
            None => Ok(ExampleSource::Generate),
            Some(ident) => self
                .shared
                .example(ident)
                .cloned()
                .map(ExampleSource::Value)
                .ok_or_else(|| LoadError::UnresolvedReference {
                    widget: self.unit.name.clone(),
                    kind: "example",
                    ident: ident.to_string(),
                }),
        }
    }
}

#[async_trait]
impl WidgetModule for SourceWidgetModule {
    async fn load(&self) -> Result<BoundWidget, LoadError> {
        let text = tokio::fs::read_to_string(&self.unit.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.unit.path.clone(),
                source,
            })?;

        let source = WidgetSource::parse(&text, &self.keys)
            .map_err(|reason| LoadError::Registration {
                widget: self.unit.name.clone(),
                reason,
            })?
            .ok_or_else(|| LoadError::Registration {
                widget: self.unit.name.clone(),
                reason: format!("missing '{}' registration", self.keys.marker),
            })?;

        let schema = self.resolve_schema(&source)?;
        let example = self.resolve_example(&source)?;
        let renderer = TemplateRenderer::new(format!("{}.html", self.unit.name), &source.body)?;

        let widget = self
            .binder
            .bind(self.unit.name.clone(), schema, example, Arc::new(renderer))?;
        debug!(widget = %widget.name(), "Widget module loaded");
        Ok(widget)
    }
}

/// The closed set of widget modules, fixed at construction.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    modules: BTreeMap<String, Arc<dyn WidgetModule>>,
}

impl WidgetRegistry {
    pub fn builder() -> WidgetRegistryBuilder {
        WidgetRegistryBuilder::default()
    }

    /// Enumerate the widgets directory once. Files without the registration
    /// marker are not widgets and are left out.
    pub fn discover(settings: &Settings) -> Result<Self, SourceError> {
        let shared = Arc::new(SharedModule::load_or_empty(&settings.widgets.shared));
        let keys = Arc::new(RegistrationKeys::from(&settings.extractor));
        let binder = WidgetBinder::new(MockGenerator::new(settings.generator));

        let mut builder = Self::builder();
        for unit in discover_from_settings(settings)? {
            let text = match std::fs::read_to_string(&unit.path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(widget = %unit.name, "Skipping unreadable widget source: {}", e);
                    continue;
                }
            };
            if !text.contains(keys.marker.as_str()) {
                debug!(widget = %unit.name, "No registration marker, not a widget");
                continue;
            }
            let name = unit.name.clone();
            builder = builder.register(
                name,
                SourceWidgetModule::new(unit, shared.clone(), keys.clone(), binder.clone()),
            );
        }

        let registry = builder.build();
        info!(
            "Discovered {} widget(s): {}",
            registry.len(),
            registry.names().collect::<Vec<_>>().join(", ")
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WidgetModule>> {
        self.modules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Module names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Default)]
pub struct WidgetRegistryBuilder {
    modules: BTreeMap<String, Arc<dyn WidgetModule>>,
}

impl WidgetRegistryBuilder {
    /// Register a module under `name`. The first registration of a name wins.
    pub fn register(mut self, name: impl Into<String>, module: impl WidgetModule + 'static) -> Self {
        let name = name.into();
        if self.modules.contains_key(&name) {
            warn!(widget = %name, "Widget already registered, ignoring duplicate");
            return self;
        }
        self.modules.insert(name, Arc::new(module));
        self
    }

    pub fn build(self) -> WidgetRegistry {
        WidgetRegistry {
            modules: self.modules,
        }
    }
}
