pub mod schema;
pub mod widget;

pub use schema::{Arity, ObjectField, SchemaIntrospect, SchemaNode, SchemaShape};
pub use widget::{
    ExampleProducer, ExampleSource, MetadataEntry, MetadataMap, RenderError, WidgetMetadata,
    WidgetRenderer,
};
