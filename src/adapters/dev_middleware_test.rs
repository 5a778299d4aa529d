use super::dev_middleware::{
    dev_pipeline_middleware, DevPipeline, HtmlTransform, ShellDocumentStage, LIVERELOAD_MARKER,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::from_fn_with_state,
    Router,
};
use http_body_util::BodyExt;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const SCRIPT: &str = "/__vitrine/livereload.js";

fn app(root: &TempDir) -> Router {
    let stage = ShellDocumentStage::new(
        root.path(),
        &["index.html".to_string(), "/test.html".to_string()],
        HtmlTransform::new(SCRIPT),
    );
    let pipeline = Arc::new(DevPipeline::new().with_stage(stage));
    Router::new()
        .fallback(|| async { "from next" })
        .layer(from_fn_with_state(pipeline, dev_pipeline_middleware))
}

async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_allow_listed_document_is_transformed() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("index.html"),
        "<html><head><title>t</title></head><body><script type=\"module\" src=\"./main.js\"></script></body></html>",
    )
    .unwrap();

    let (status, content_type, body) = send(app(&root), "/index.html").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains(LIVERELOAD_MARKER));
    assert!(body.contains(r#"src="/main.js""#));
    let script_at = body.find(LIVERELOAD_MARKER).unwrap();
    assert!(script_at < body.find("</head>").unwrap());
}

#[tokio::test]
async fn test_root_path_serves_index() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("index.html"), "<body></body>").unwrap();

    let (status, _, body) = send(app(&root), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(LIVERELOAD_MARKER));
}

#[tokio::test]
async fn test_percent_encoded_document_path_is_transformed() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("index.html"), "<head></head><body></body>").unwrap();

    for uri in ["/index%2Ehtml", "/%69ndex.html"] {
        let (status, _, body) = send(app(&root), uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.contains(LIVERELOAD_MARKER), "{}", uri);
    }
}

#[tokio::test]
async fn test_other_paths_fall_through_untouched() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("other.html"), "<p>not a shell</p>").unwrap();

    let (status, _, body) = send(app(&root), "/other.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "from next");
}

#[tokio::test]
async fn test_missing_document_falls_through() {
    let root = TempDir::new().unwrap();

    let (status, _, body) = send(app(&root), "/test.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "from next");
}

#[test]
fn test_transform_placement() {
    let transform = HtmlTransform::new(SCRIPT);

    let body_only = transform.apply("<BODY class=\"x\"><p>hi</p></BODY>");
    let tag_at = body_only.find(LIVERELOAD_MARKER).unwrap();
    assert!(tag_at > body_only.find("<BODY").unwrap());
    assert!(tag_at < body_only.find("<p>").unwrap());

    let fragment = transform.apply("<p>hi</p>");
    assert!(fragment.starts_with("<script type=\"module\""));
}

#[test]
fn test_transform_is_idempotent() {
    let transform = HtmlTransform::new(SCRIPT);
    let once = transform.apply("<head></head><link href='./style.css'>");
    let twice = transform.apply(&once);

    assert_eq!(once, twice);
    assert_eq!(once.matches(LIVERELOAD_MARKER).count(), 1);
    assert!(once.contains("href='/style.css'"));
}

#[test]
fn test_pipeline_preserves_stage_order() {
    let root = TempDir::new().unwrap();
    let pipeline = DevPipeline::new()
        .with_stage(ShellDocumentStage::new(root.path(), &[], HtmlTransform::new(SCRIPT)));
    assert_eq!(pipeline.stage_names(), vec!["shell-documents"]);
}
