// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curiosity 3D Server - STEP to printable mesh converter.
//!
//! Serves the conversion pipeline and the dashboard pages as a JSON API:
//!
//! - Upload a STEP model, get volume, bounding box and a watertight check
//! - Interactive Plotly preview of the tessellated mesh
//! - Download as STL, OBJ, 3MF or PLY
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/convert` - Convert an uploaded STEP file (JSON with base64 artifact)
//! - `POST /api/v1/convert/download` - Convert and return the artifact file
//! - `GET /api/v1/pages/:page` - Dashboard page view (converter, future, news)
//! - `POST /api/v1/dashboard` - Apply a dashboard event to a state

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use curiosity_processing::{ConversionPipeline, NewsSource, StaticNews};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<ConversionPipeline>,
    pub news: Arc<dyn NewsSource>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let pipeline = match &config.scratch_dir {
            Some(dir) => ConversionPipeline::new().with_scratch_dir(dir),
            None => ConversionPipeline::new(),
        };
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            news: Arc::new(StaticNews),
        }
    }
}

/// Build the router with all routes and middleware.
fn app(state: AppState) -> Router {
    let cors = state.config.cors_layer();

    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Conversion endpoints
        .route("/api/v1/convert", post(routes::convert::convert))
        .route("/api/v1/convert/download", post(routes::convert::download))
        // Dashboard endpoints
        .route("/api/v1/pages/:page", get(routes::pages::get_page))
        .route("/api/v1/dashboard", post(routes::dashboard::apply_event))
        // Middleware
        .layer(DefaultBodyLimit::disable()) // Uploads are not size limited
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,curiosity_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        cors_origins = ?config.cors_origins,
        "Starting Curiosity 3D Server"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = app(AppState::new(config));

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "curiosity-test-boundary";

    fn test_app() -> Router {
        app(AppState::new(Config {
            port: 0,
            cors_origins: vec!["*".to_string()],
            scratch_dir: None,
        }))
    }

    fn fixture(name: &str) -> Vec<u8> {
        let path = format!("{}/../../tests/models/{}", env!("CARGO_MANIFEST_DIR"), name);
        std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {}: {}", path, e))
    }

    /// `(field, file name, content)`
    fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn post_form(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "curiosity-server");
    }

    #[tokio::test]
    async fn test_convert_cube() {
        let cube = fixture("cube_10mm.step");
        let body = multipart(&[("file", Some("Cube.step"), &cube)]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["file_name"], "Cube.step");
        assert_eq!(body["analysis"]["volume"], "1.0 cm³");
        assert_eq!(body["analysis"]["bounding_box"], "10x10x10 mm");
        assert_eq!(body["analysis"]["watertight"], true);
        assert!(body["analysis"]["warning"].is_null());
        assert_eq!(body["states"].as_array().unwrap().last().unwrap(), "done");
        assert_eq!(body["preview"]["data"][0]["type"], "mesh3d");
        assert_eq!(body["download"]["file_name"], "Cube.stl");
        assert_eq!(body["download"]["label"], "Download .STL");
        assert_eq!(body["download"]["content_type"], "model/stl");
        assert!(!body["download"]["data"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_with_format_and_nozzle() {
        let cube = fixture("cube_10mm.step");
        let body = multipart(&[
            ("export_format", None, b"3MF"),
            ("nozzle_mm", None, b"0.6"),
            ("file", Some("Cube.STP"), &cube),
        ]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["download"]["file_name"], "Cube.3mf");
        assert_eq!(body["download"]["content_type"], "model/3mf");
    }

    #[tokio::test]
    async fn test_convert_rejects_other_extensions() {
        let body = multipart(&[("file", Some("model.stl"), b"solid x\nendsolid x\n")]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "UNSUPPORTED_FILE_TYPE");
    }

    #[tokio::test]
    async fn test_convert_missing_file() {
        let body = multipart(&[("export_format", None, b"obj")]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_convert_invalid_nozzle() {
        let cube = fixture("cube_10mm.step");
        let body = multipart(&[("file", Some("Cube.step"), &cube), ("nozzle_mm", None, b"2.0")]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_CONFIG");
    }

    #[tokio::test]
    async fn test_convert_import_error() {
        let body = multipart(&[("file", Some("broken.step"), b"not a step file")]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "IMPORT_ERROR");
        assert!(body["error"].as_str().unwrap().starts_with("Error: "));
        assert!(body.get("download").is_none());
    }

    #[tokio::test]
    async fn test_download() {
        let cube = fixture("cube_10mm.step");
        let body = multipart(&[("file", Some("Cube.step"), &cube), ("export_format", None, b"obj")]);
        let response = test_app()
            .oneshot(post_form("/api/v1/convert/download", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "model/obj");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Cube.obj\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"# Curiosity 3D"));
    }

    #[tokio::test]
    async fn test_pages() {
        let response = test_app()
            .oneshot(Request::get("/api/v1/pages/news").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["brand"], "CURIOSITY 3D");
        assert_eq!(body["body"]["page"], "news");
        assert_eq!(body["body"]["articles"].as_array().unwrap().len(), 4);

        let response = test_app()
            .oneshot(Request::get("/api/v1/pages/gallery").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard_event() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/dashboard")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"event":{"type":"select_page","value":"future"}}"#,
            ))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["state"]["page"], "future");
        assert_eq!(body["state"]["printer"]["nozzle_mm"], 0.4);
        assert_eq!(body["view"]["body"]["page"], "future");
        assert_eq!(body["view"]["body"]["chart"]["data"][0]["type"], "bar");
    }

    #[tokio::test]
    async fn test_dashboard_rejects_bad_nozzle() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/dashboard")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"event":{"type":"set_nozzle","value":0.1}}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_CONFIG");
    }
}
