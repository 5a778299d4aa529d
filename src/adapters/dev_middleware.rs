//! Ordered request pipeline that runs in front of the module server.
//!
//! Each [`PipelineStage`] either answers a request or lets it fall through to
//! the next stage; when every stage falls through the request continues to the
//! inner service (the `ServeDir` mounted at `/`).

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Settings;

/// Marker attribute carried by the injected live-reload script tag.
pub const LIVERELOAD_MARKER: &str = "data-vitrine-livereload";

pub enum StageOutcome {
    Respond(Response),
    FallThrough,
}

#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, request: &Parts) -> StageOutcome;
}

#[derive(Clone, Default)]
pub struct DevPipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
}

impl DevPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default pipeline: shell documents only.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new().with_stage(ShellDocumentStage::from_settings(settings))
    }

    /// Append a stage. Stages run in the order they were added.
    pub fn with_stage(mut self, stage: impl PipelineStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn dispatch(&self, request: &Parts) -> StageOutcome {
        for stage in &self.stages {
            if let StageOutcome::Respond(response) = stage.handle(request).await {
                debug!(stage = stage.name(), path = %request.uri.path(), "Request answered by pipeline");
                return StageOutcome::Respond(response);
            }
        }
        StageOutcome::FallThrough
    }
}

/// Axum middleware entry point; mount with `from_fn_with_state`.
pub async fn dev_pipeline_middleware(
    State(pipeline): State<Arc<DevPipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    match pipeline.dispatch(&parts).await {
        StageOutcome::Respond(response) => response,
        StageOutcome::FallThrough => next.run(Request::from_parts(parts, body)).await,
    }
}

/// Serves allow-listed shell documents from `root` after running them through
/// the [`HtmlTransform`].
pub struct ShellDocumentStage {
    root: PathBuf,
    documents: Vec<String>,
    transform: HtmlTransform,
}

impl ShellDocumentStage {
    pub fn new(root: impl Into<PathBuf>, documents: &[String], transform: HtmlTransform) -> Self {
        Self {
            root: root.into(),
            documents: documents
                .iter()
                .map(|doc| doc.trim_start_matches('/').to_string())
                .collect(),
            transform,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.dev.root.clone(),
            &settings.dev.shell_documents,
            HtmlTransform::new(settings.dev.livereload_script.clone()),
        )
    }

    /// `/` is served as `index.html` when that document is allow-listed.
    /// Matching happens on the percent-decoded path.
    fn document_for(&self, path: &str) -> Option<&str> {
        let decoded = urlencoding::decode(path).ok()?;
        let requested = match decoded.trim_start_matches('/') {
            "" => "index.html",
            other => other,
        };
        self.documents
            .iter()
            .find(|doc| doc.as_str() == requested)
            .map(String::as_str)
    }
}

#[async_trait]
impl PipelineStage for ShellDocumentStage {
    fn name(&self) -> &str {
        "shell-documents"
    }

    async fn handle(&self, request: &Parts) -> StageOutcome {
        if request.method != Method::GET && request.method != Method::HEAD {
            return StageOutcome::FallThrough;
        }
        let Some(document) = self.document_for(request.uri.path()) else {
            return StageOutcome::FallThrough;
        };

        let path = self.root.join(document);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => StageOutcome::Respond(Html(self.transform.apply(&html)).into_response()),
            Err(e) => {
                warn!("Failed to read shell document {}: {}", path.display(), e);
                StageOutcome::FallThrough
            }
        }
    }
}

/// Rewrites a shell document for the dev server.
#[derive(Debug, Clone)]
pub struct HtmlTransform {
    livereload_script: String,
}

impl HtmlTransform {
    pub fn new(livereload_script: impl Into<String>) -> Self {
        Self {
            livereload_script: livereload_script.into(),
        }
    }

    pub fn apply(&self, html: &str) -> String {
        let html = rewrite_relative_specifiers(html);
        if html.contains(LIVERELOAD_MARKER) {
            return html;
        }

        let tag = format!(
            r#"<script type="module" src="{}" {}></script>"#,
            self.livereload_script, LIVERELOAD_MARKER
        );
        let lower = html.to_ascii_lowercase();

        if let Some(pos) = lower.find("</head>") {
            return format!("{}{}\n{}", &html[..pos], tag, &html[pos..]);
        }
        if let Some(open) = lower.find("<body") {
            if let Some(close) = lower[open..].find('>') {
                let at = open + close + 1;
                return format!("{}\n{}{}", &html[..at], tag, &html[at..]);
            }
        }
        format!("{}\n{}", tag, html)
    }
}

/// `src="./x"` and `href="./x"` become root-absolute so they resolve against
/// the module server mounted at `/`.
fn rewrite_relative_specifiers(html: &str) -> String {
    ["src", "href"]
        .iter()
        .flat_map(|attr| ['"', '\''].map(|quote| (*attr, quote)))
        .fold(html.to_string(), |acc, (attr, quote)| {
            acc.replace(
                &format!("{}={}./", attr, quote),
                &format!("{}={}/", attr, quote),
            )
        })
}
