use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::widget_registry::WidgetRegistry;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub widgets: usize,
}

pub struct HealthHandler {
    registry: Arc<WidgetRegistry>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(registry: Arc<WidgetRegistry>) -> Self {
        Self {
            registry,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check with the number of registered widgets.
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            widgets: self.registry.len(),
        };

        (StatusCode::OK, Json(status))
    }

    /// Liveness check
    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Dev server is alive"
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::widget_binder::BoundWidget;
    use crate::adapters::widget_registry::LoadError;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_health_reports_widget_count() {
        let registry = WidgetRegistry::builder()
            .register("a", || -> Result<BoundWidget, LoadError> {
                Err(LoadError::MissingSchema {
                    widget: "a".to_string(),
                })
            })
            .build();
        let handler = HealthHandler::new(Arc::new(registry));

        let response = handler.health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let status: HealthStatus = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.widgets, 1);
    }

    #[tokio::test]
    async fn test_live_endpoint() {
        let handler = HealthHandler::new(Arc::new(WidgetRegistry::default()));
        let response = handler.live().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
