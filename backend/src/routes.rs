use std::path::Path;
use std::sync::Arc;

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, get_service, post};
use axum::Router;
use perceptive_shared::config::{ANALYTICS_PATH, LOADER_PATH, WIDGET_PATH};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::analytics::{self, AnalyticsStore};

/// Script host pages include. It loads the wasm loader from the static dir.
const LOADER_BOOTSTRAP: &str = include_str!("../../host-loader/widget.js");

#[derive(Clone)]
pub struct AppState {
    pub analytics: Arc<AnalyticsStore>,
}

impl AppState {
    pub fn new(analytics_retain: usize) -> Self {
        Self {
            analytics: Arc::new(AnalyticsStore::new(analytics_retain)),
        }
    }
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    // Embeds live on arbitrary sites, so any origin may post events.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let widget_document = ServeFile::new(static_dir.join("widget").join("index.html"));

    Router::new()
        .route("/health", get(health))
        .route(ANALYTICS_PATH, post(analytics::ingest))
        .route(&format!("{ANALYTICS_PATH}/recent"), get(analytics::recent))
        .route(LOADER_PATH, get(loader_bootstrap))
        .route(WIDGET_PATH, get_service(widget_document))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn loader_bootstrap() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        LOADER_BOOTSTRAP,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use perceptive_shared::analytics::AnalyticsEvent;
    use perceptive_shared::config::{LOADER_GLUE, LOADER_INIT_GLOBAL, LOADER_WASM};
    use serde_json::{json, Map, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(AppState::new(10), Path::new("does-not-exist"))
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(ANALYTICS_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn accepts_the_loader_body_and_lists_it() {
        let state = AppState::new(10);
        let app = build_router(state.clone(), Path::new("does-not-exist"));

        let mut props = Map::new();
        props.insert("plan".into(), json!("pro"));
        let event = AnalyticsEvent {
            name: "widget_opened".into(),
            widget_id: "acme".into(),
            page_url: "https://shop.example/cart".into(),
            timestamp: "2026-10-18T09:30:00.000Z".into(),
            properties: props,
        };

        let response = app
            .clone()
            .oneshot(post_json(event.http_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(
                Request::get(format!("{ANALYTICS_PATH}/recent"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed[0]["event"], "widget_opened");
        assert_eq!(listed[0]["properties"]["widgetId"], "acme");
        assert_eq!(listed[0]["properties"]["plan"], "pro");
        assert_eq!(state.analytics.recent().len(), 1);
    }

    #[tokio::test]
    async fn empty_event_is_rejected() {
        let response = router()
            .oneshot(post_json(json!({"event": "  ", "properties": {}}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let response = router()
            .oneshot(post_json("{not json".into()))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn cross_origin_posts_are_allowed() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(ANALYTICS_PATH)
            .header(header::ORIGIN, "https://shop.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn widget_js_starts_the_wasm_loader() {
        let response = router()
            .oneshot(Request::get(LOADER_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/javascript"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let script = String::from_utf8_lossy(&bytes);
        assert!(script.contains(LOADER_GLUE), "glue is never fetched");
        assert!(script.contains(LOADER_WASM), "wasm url is never passed");
        assert!(
            script.contains(&format!("window.{LOADER_INIT_GLOBAL};")),
            "init global is never read"
        );
        assert!(script.contains("init({ module_or_path:"), "init is never called");
        assert!(script.contains("data-perceptive-widget"), "tag is never marked");
    }

    #[tokio::test]
    async fn serves_the_widget_document() {
        let dir: PathBuf = std::env::temp_dir().join(format!("perceptive-static-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("widget")).unwrap();
        std::fs::write(dir.join("widget").join("index.html"), "<div id=\"perceptive-widget-root\"></div>").unwrap();
        std::fs::write(dir.join(LOADER_GLUE), "/* glue */").unwrap();

        let app = build_router(AppState::new(1), &dir);

        let response = app
            .clone()
            .oneshot(Request::get("/widget?id=acme&theme=dark").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("perceptive-widget-root"));

        let response = app
            .oneshot(Request::get(format!("/{LOADER_GLUE}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
