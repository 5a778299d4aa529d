//! # Vitrine - schema-driven widget development server
//!
//! Vitrine lets a widget author preview a data-driven HTML fragment against
//! realistic mock data before any live data source exists, and extracts the
//! same example payloads at build time for downstream tooling.
//!
//! ## Features
//!
//! - **Mock generation**: random but well-typed values from a schema, either the
//!   typed [`SchemaNode`](domain::SchemaNode) or a JSON Schema document
//! - **Widget binding**: schema, example and renderer bound into one immutable
//!   [`BoundWidget`](adapters::widget_binder::BoundWidget)
//! - **Metadata extraction**: `vitrine extract` writes `widget-metadata.json`
//!   from source text, without rendering anything
//! - **Dev server**: shell documents with live-reload injection, a widget
//!   preview endpoint, and static module serving
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitrine::adapters::widget_registry::WidgetRegistry;
//! use vitrine::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let registry = Arc::new(WidgetRegistry::discover(&settings)?);
//!     let app = vitrine::create_app(&settings, registry);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5173").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: schema nodes, widget metadata, the metadata map
//! - **Adapters**: generator, binder, registry, loader, extractor, HTTP handlers
//! - **Config**: layered settings and validation

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;

use crate::adapters::asset_handler::AssetHandler;
use crate::adapters::dev_middleware::{dev_pipeline_middleware, DevPipeline};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::preview_handler::{self, PreviewState};
use crate::adapters::widget_registry::WidgetRegistry;
use crate::config::Settings;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;

/// Creates the dev server router.
///
/// Routes are matched first; everything else passes through the
/// [`DevPipeline`] (shell documents) and then to the module server mounted at
/// `/`, which serves files from `settings.dev.root`.
pub fn create_app(settings: &Settings, registry: Arc<WidgetRegistry>) -> Router {
    let health_handler = Arc::new(HealthHandler::new(registry.clone()));

    let health_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let preview_state = PreviewState::new(
        registry,
        settings.widgets.default_widget.clone(),
        Duration::from_millis(settings.loader.host_timeout_ms),
    );
    let widget_router = Router::new()
        .route(
            "/preview",
            get(preview_handler::preview).post(preview_handler::preview_with_host_data),
        )
        .route("/api/widgets", get(preview_handler::list_widgets))
        .with_state(preview_state);

    // Shell documents must be answered before ServeDir sees them.
    let pipeline = Arc::new(DevPipeline::from_settings(settings));
    let module_server = Router::new()
        .fallback_service(ServeDir::new(&settings.dev.root))
        .layer(from_fn_with_state(pipeline, dev_pipeline_middleware));

    health_router
        .merge(widget_router)
        .route("/__vitrine/*path", get(AssetHandler::serve))
        .merge(module_server)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
