use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
};
use rust_embed::RustEmbed;

/// Client scripts served under `/__vitrine/`.
#[derive(RustEmbed)]
#[folder = "assets"]
struct Asset;

pub struct AssetHandler;

impl AssetHandler {
    pub async fn serve(Path(path): Path<String>) -> impl IntoResponse {
        let path = path.trim_start_matches('/');

        match Asset::get(path) {
            Some(content) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                (
                    [
                        (header::CONTENT_TYPE, mime.as_ref().to_string()),
                        (header::CACHE_CONTROL, "no-cache".to_string()),
                    ],
                    content.data,
                )
                    .into_response()
            }
            None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        }
    }

    pub fn names() -> Vec<String> {
        Asset::iter().map(|name| name.into_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_embedded_script() {
        let response = AssetHandler::serve(Path("livereload.js".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().contains("javascript"));
    }

    #[tokio::test]
    async fn test_unknown_asset_is_not_found() {
        let response = AssetHandler::serve(Path("nope.js".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bundle_contains_client_scripts() {
        let names = AssetHandler::names();
        assert!(names.iter().any(|n| n == "livereload.js"));
        assert!(names.iter().any(|n| n == "loader.js"));
    }

    #[test]
    fn test_loader_waits_for_host_when_embedded() {
        let loader = Asset::get("loader.js").unwrap();
        let script = std::str::from_utf8(&loader.data).unwrap();

        // embedded roots skip the example fetch and drop superseded responses
        assert!(script.contains(r#"hasAttribute("data-vitrine-embedded")"#));
        assert!(script.contains("if (!embedded)"));
        assert!(script.contains("request !== latest"));

        let shell = std::fs::read_to_string(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demo/test.html"),
        )
        .unwrap();
        assert!(shell.contains("data-vitrine-embedded"));
    }
}
