use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::widget_loader::{host_signal, HostGate, LoaderState, WidgetLoader};
use crate::adapters::widget_registry::WidgetRegistry;

#[derive(Clone)]
pub struct PreviewState {
    pub registry: Arc<WidgetRegistry>,
    pub default_widget: String,
    pub host_timeout: Duration,
}

impl PreviewState {
    pub fn new(
        registry: Arc<WidgetRegistry>,
        default_widget: impl Into<String>,
        host_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            default_widget: default_widget.into(),
            host_timeout,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WidgetList {
    pub widgets: Vec<String>,
    pub default: String,
}

fn respond(state: &LoaderState) -> Response {
    let status = match state {
        LoaderState::Loaded { .. } | LoaderState::AwaitingHostSignal { .. } => StatusCode::OK,
        LoaderState::Error {
            available,
            selector,
            ..
        } if !available.contains(selector) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Html(state.render())).into_response()
}

/// `GET /preview?widget=<name>`: the plain dev shell. No host gate; the
/// widget renders its bound example.
pub async fn preview(State(state): State<PreviewState>, RawQuery(query): RawQuery) -> Response {
    let mut loader = WidgetLoader::new(state.registry, state.default_widget, HostGate::Disabled);
    respond(loader.mount(query.as_deref(), None, None).await)
}

/// `POST /preview?widget=<name>` with a JSON body: the embedded path. The
/// body is delivered as host data through the host signal.
pub async fn preview_with_host_data(
    State(state): State<PreviewState>,
    RawQuery(query): RawQuery,
    Json(data): Json<Value>,
) -> Response {
    let gate = HostGate::Embedded {
        timeout: state.host_timeout,
    };
    let mut loader = WidgetLoader::new(state.registry, state.default_widget, gate);
    let (sender, signal) = host_signal();
    sender.provide(data);
    respond(loader.mount(query.as_deref(), Some(signal), None).await)
}

/// `GET /api/widgets`
pub async fn list_widgets(State(state): State<PreviewState>) -> Json<WidgetList> {
    Json(WidgetList {
        widgets: state.registry.names().map(str::to_string).collect(),
        default: state.default_widget,
    })
}
