//! Resolves a widget selector against the registry, loads the module and
//! renders it.
//!
//! ```text
//! awaiting-host-signal ──► resolving ──► loaded
//!                                   └──► error
//! ```
//!
//! With [`HostGate::Embedded`] the loader first waits for host data on a
//! single-shot [`HostSignal`]. A timeout logs a warning and leaves the loader
//! waiting; it never becomes an error on its own. With [`HostGate::Disabled`]
//! (the plain dev shell) the gate is skipped and the bound example is rendered.

use crate::adapters::widget_binder::BoundWidget;
use crate::adapters::widget_registry::WidgetRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tera::escape_html;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Query parameter carrying the widget name.
pub const SELECTOR_PARAM: &str = "widget";

/// Widget name requested by a page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(String);

impl Selector {
    /// Read `widget=<name>` from a raw query string, falling back to `default`
    /// when the parameter is absent or empty.
    pub fn from_query(query: Option<&str>, default: &str) -> Self {
        let requested = query.and_then(|query| {
            query.split('&').find_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                if key != SELECTOR_PARAM {
                    return None;
                }
                let value = value.replace('+', " ");
                let decoded = urlencoding::decode(&value)
                    .map(|v| v.into_owned())
                    .unwrap_or(value);
                let decoded = decoded.trim().to_string();
                (!decoded.is_empty()).then_some(decoded)
            })
        });
        Selector(requested.unwrap_or_else(|| default.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether the loader waits for host-injected data before resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostGate {
    Disabled,
    Embedded { timeout: Duration },
}

/// Sending half held by the embedding environment.
#[derive(Debug)]
pub struct HostDataSender(oneshot::Sender<Value>);

impl HostDataSender {
    /// Publish host data. Returns `false` if the loader is already gone.
    pub fn provide(self, data: Value) -> bool {
        self.0.send(data).is_ok()
    }
}

/// Resolves once the host provides its data.
#[derive(Debug)]
pub struct HostSignal(oneshot::Receiver<Value>);

impl HostSignal {
    /// Wait for host data. Never resolves if the sender is dropped unused.
    pub async fn ready(self) -> Value {
        match self.0.await {
            Ok(data) => data,
            Err(_) => std::future::pending().await,
        }
    }
}

pub fn host_signal() -> (HostDataSender, HostSignal) {
    let (tx, rx) = oneshot::channel();
    (HostDataSender(tx), HostSignal(rx))
}

/// Held by whoever mounted the loader; `unmount` cancels any pending wait
/// or load.
#[derive(Debug)]
pub struct UnmountHandle(oneshot::Sender<()>);

impl UnmountHandle {
    pub fn unmount(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug)]
pub struct Teardown(Option<oneshot::Receiver<()>>);

impl Teardown {
    async fn unmounted(&mut self) {
        if let Some(rx) = self.0.as_mut() {
            let result = rx.await;
            self.0 = None;
            if result.is_ok() {
                return;
            }
        }
        // Handle dropped without unmounting: stay mounted.
        std::future::pending::<()>().await
    }
}

pub fn teardown() -> (UnmountHandle, Teardown) {
    let (tx, rx) = oneshot::channel();
    (UnmountHandle(tx), Teardown(Some(rx)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    AwaitingHostSignal,
    Resolving,
    Loaded,
    Error,
}

#[derive(Debug, Clone)]
pub enum LoaderState {
    AwaitingHostSignal {
        timed_out: bool,
    },
    Resolving {
        selector: String,
    },
    Loaded {
        selector: String,
        widget: BoundWidget,
        host_data: Option<Value>,
    },
    Error {
        selector: String,
        message: String,
        available: Vec<String>,
    },
}

impl LoaderState {
    pub fn phase(&self) -> LoaderPhase {
        match self {
            LoaderState::AwaitingHostSignal { .. } => LoaderPhase::AwaitingHostSignal,
            LoaderState::Resolving { .. } => LoaderPhase::Resolving,
            LoaderState::Loaded { .. } => LoaderPhase::Loaded,
            LoaderState::Error { .. } => LoaderPhase::Error,
        }
    }

    /// Render the current state as an HTML fragment.
    pub fn render(&self) -> String {
        match self {
            LoaderState::AwaitingHostSignal { .. } => {
                r#"<div class="vitrine-waiting">Waiting for host data&hellip;</div>"#.to_string()
            }
            LoaderState::Resolving { selector } => format!(
                r#"<div class="vitrine-loading" data-widget="{}">Loading&hellip;</div>"#,
                escape_html(selector)
            ),
            LoaderState::Loaded {
                selector,
                widget,
                host_data,
            } => {
                let data = host_data.as_ref().unwrap_or_else(|| widget.example_output());
                match widget.render(data) {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(widget = %selector, "Widget render failed: {}", e);
                        error_view(selector, &format!("Render failed: {}", e), &[])
                    }
                }
            }
            LoaderState::Error {
                selector,
                message,
                available,
            } => error_view(selector, message, available),
        }
    }
}

fn error_view(selector: &str, message: &str, available: &[String]) -> String {
    let options: String = available
        .iter()
        .map(|name| {
            let name = escape_html(name);
            format!(r#"<li><a href="?{}={}">{}</a></li>"#, SELECTOR_PARAM, name, name)
        })
        .collect();
    format!(
        r#"<div class="vitrine-error" data-widget="{selector}"><h2>Widget unavailable</h2><p>{message}</p><p>Requested: <code>{selector}</code></p><ul>{options}</ul></div>"#,
        selector = escape_html(selector),
        message = escape_html(message),
        options = options,
    )
}

/// One loader per mounted page. Taking `&mut self` for [`mount`](Self::mount)
/// keeps at most one load in flight.
pub struct WidgetLoader {
    registry: Arc<WidgetRegistry>,
    default_widget: String,
    gate: HostGate,
    state: LoaderState,
    history: Vec<LoaderPhase>,
}

impl WidgetLoader {
    pub fn new(registry: Arc<WidgetRegistry>, default_widget: impl Into<String>, gate: HostGate) -> Self {
        Self {
            registry,
            default_widget: default_widget.into(),
            gate,
            state: LoaderState::AwaitingHostSignal { timed_out: false },
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &LoaderState {
        &self.state
    }

    /// Phases entered since mount, in order.
    pub fn history(&self) -> &[LoaderPhase] {
        &self.history
    }

    fn transition(&mut self, next: LoaderState) {
        debug!(from = ?self.state.phase(), to = ?next.phase(), "Loader transition");
        self.history.push(next.phase());
        self.state = next;
    }

    /// Drive the loader to a resting state for the page's `query`.
    pub async fn mount(
        &mut self,
        query: Option<&str>,
        host: Option<HostSignal>,
        teardown: Option<Teardown>,
    ) -> &LoaderState {
        let mut teardown = teardown;
        let host_data = match self.gate {
            HostGate::Disabled => None,
            HostGate::Embedded { timeout } => {
                self.transition(LoaderState::AwaitingHostSignal { timed_out: false });
                let wait_for_host = async {
                    match host {
                        Some(signal) => signal.ready().await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    data = wait_for_host => Some(data),
                    _ = tokio::time::sleep(timeout) => {
                        warn!("Host data not available after {:?}; still waiting", timeout);
                        self.state = LoaderState::AwaitingHostSignal { timed_out: true };
                        return &self.state;
                    }
                    _ = unmounted(&mut teardown) => {
                        debug!("Loader unmounted while awaiting host data");
                        return &self.state;
                    }
                }
            }
        };

        let selector = Selector::from_query(query, &self.default_widget);
        self.transition(LoaderState::Resolving {
            selector: selector.as_str().to_string(),
        });

        let available: Vec<String> = self.registry.names().map(str::to_string).collect();
        let Some(module) = self.registry.get(selector.as_str()) else {
            warn!(widget = %selector.as_str(), "Unknown widget selector");
            self.transition(LoaderState::Error {
                message: format!(
                    "Unknown widget '{}'. Available widgets: {}",
                    selector.as_str(),
                    available.join(", ")
                ),
                selector: selector.0,
                available,
            });
            return &self.state;
        };

        let loaded = tokio::select! {
            loaded = module.load() => loaded,
            _ = unmounted(&mut teardown) => {
                debug!(widget = %selector.as_str(), "Loader unmounted during module load");
                return &self.state;
            }
        };

        match loaded {
            Ok(widget) => {
                info!(widget = %selector.as_str(), "Widget loaded");
                self.transition(LoaderState::Loaded {
                    selector: selector.0,
                    widget,
                    host_data,
                });
            }
            Err(e) => {
                warn!(widget = %selector.as_str(), "Widget failed to load: {}", e);
                self.transition(LoaderState::Error {
                    message: format!("Failed to load widget '{}': {}", selector.as_str(), e),
                    selector: selector.0,
                    available,
                });
            }
        }
        &self.state
    }
}

async fn unmounted(teardown: &mut Option<Teardown>) {
    match teardown {
        Some(teardown) => teardown.unmounted().await,
        None => std::future::pending().await,
    }
}
