use crate::adapters::mock_generator::MockGenerator;
use crate::domain::{ExampleSource, RenderError, SchemaNode, WidgetMetadata, WidgetRenderer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Example producer for widget '{widget}' failed: {reason}")]
    Producer { widget: String, reason: String },
}

/// A renderer bound to its schema and resolved example.
///
/// Immutable once constructed; clones share the renderer and metadata.
#[derive(Clone)]
pub struct BoundWidget {
    name: String,
    renderer: Arc<dyn WidgetRenderer>,
    metadata: Arc<WidgetMetadata>,
}

impl BoundWidget {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &WidgetMetadata {
        &self.metadata
    }

    pub fn example_output(&self) -> &Value {
        &self.metadata.example_output
    }

    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        self.renderer.render(data)
    }

    /// Render against the resolved example, as when previewed in isolation.
    pub fn render_example(&self) -> Result<String, RenderError> {
        self.renderer.render(&self.metadata.example_output)
    }
}

impl fmt::Debug for BoundWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundWidget")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Binds schema, example and renderer into a [`BoundWidget`].
#[derive(Debug, Clone, Default)]
pub struct WidgetBinder {
    generator: MockGenerator,
}

impl WidgetBinder {
    pub fn new(generator: MockGenerator) -> Self {
        Self { generator }
    }

    pub fn bind(
        &self,
        name: impl Into<String>,
        schema: SchemaNode,
        example: impl Into<ExampleSource>,
        renderer: Arc<dyn WidgetRenderer>,
    ) -> Result<BoundWidget, BindError> {
        let name = name.into();

        // A failing producer fails the bind; no generated fallback.
        let example_output = match example.into() {
            ExampleSource::Value(value) => value,
            ExampleSource::Producer(producer) => producer().map_err(|e| BindError::Producer {
                widget: name.clone(),
                reason: format!("{:#}", e),
            })?,
            ExampleSource::Generate => {
                debug!(widget = %name, "No example supplied; generating from schema");
                self.generator.generate(&schema)
            }
        };

        Ok(BoundWidget {
            name,
            renderer,
            metadata: Arc::new(WidgetMetadata {
                schema,
                example_output,
            }),
        })
    }
}

/// Bind with the default generation policy.
pub fn bind(
    name: impl Into<String>,
    schema: SchemaNode,
    example: impl Into<ExampleSource>,
    renderer: Arc<dyn WidgetRenderer>,
) -> Result<BoundWidget, BindError> {
    WidgetBinder::default().bind(name, schema, example, renderer)
}

/// Renders a Tera template. Object payloads expose their keys at the top
/// level; every payload is also available as `data`.
pub struct TemplateRenderer {
    tera: Tera,
    template_name: String,
}

impl TemplateRenderer {
    pub fn new(template_name: impl Into<String>, source: &str) -> Result<Self, RenderError> {
        let template_name = template_name.into();
        let mut tera = Tera::default();
        tera.add_raw_template(&template_name, source)?;
        Ok(Self {
            tera,
            template_name,
        })
    }
}

impl WidgetRenderer for TemplateRenderer {
    fn render(&self, data: &Value) -> Result<String, RenderError> {
        let mut context = match data {
            Value::Object(_) => Context::from_value(data.clone())?,
            _ => Context::new(),
        };
        context.insert("data", data);
        Ok(self.tera.render(&self.template_name, &context)?)
    }
}

impl<F> WidgetRenderer for F
where
    F: Fn(&Value) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, data: &Value) -> Result<String, RenderError> {
        self(data)
    }
}
