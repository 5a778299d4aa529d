pub mod asset_handler;
pub mod dev_middleware;
pub mod health_handler;
pub mod metadata_extractor;
pub mod mock_generator;
pub mod preview_handler;
pub mod widget_binder;
pub mod widget_loader;
pub mod widget_registry;
pub mod widget_source;

#[cfg(test)]
mod dev_middleware_test;
#[cfg(test)]
mod metadata_extractor_test;
