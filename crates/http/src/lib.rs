//! HTTP API server for treewright.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::absolute_paths, reason = "Explicit paths for clarity")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]
#![allow(clippy::shadow_reuse, reason = "Shadowing for Arc clones is idiomatic")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]

pub mod api_error;
mod handlers;
mod request_types;
mod response_types;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use treewright_service::{CatalogService, ChatService, ConversationService, SyncService};

pub use response_types::VersionResponse;

/// Spawn the periodic sync. The first run starts immediately.
///
/// Ticks that land while a run is active are skipped. Errors are logged
/// and the loop retries on the next interval.
pub fn start_sync_scheduler(sync: Arc<SyncService>, every: Duration) -> JoinHandle<()> {
    tracing::info!(interval_ms = every.as_millis(), "sync scheduler started");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let sync = Arc::clone(&sync);
            match tokio::spawn(async move { sync.try_sync().await }).await {
                Ok(Ok(Some(report))) => {
                    tracing::debug!(segments_added = report.segments_added, "scheduled sync done");
                },
                Ok(Ok(None)) => tracing::debug!("scheduled sync skipped, previous run active"),
                Ok(Err(e)) => tracing::warn!("Scheduled sync error: {e}"),
                Err(e) => tracing::warn!("Scheduled sync panic: {e:?}"),
            }
        }
    })
}

/// Shared application state for all HTTP handlers.
pub struct AppState {
    /// Broadcast channel for `/api/events` subscribers
    pub event_tx: broadcast::Sender<String>,
    pub conversations: Arc<ConversationService>,
    pub catalog: Arc<CatalogService>,
    pub sync: Arc<SyncService>,
    pub chat: Arc<ChatService>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    use handlers::{catalog, chat, conversations, events};

    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/api/conversations/quick", post(conversations::quick_create_conversation))
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route("/api/conversations/{id}/messages", get(conversations::get_messages))
        .route("/api/conversations/{id}/save-messages", post(conversations::save_messages))
        .route("/api/conversations/{id}/title", post(conversations::generate_title))
        .route("/api/conversations/{id}/tree", get(conversations::get_tree))
        .route("/api/segments", get(catalog::list_segments))
        .route("/api/attributes", get(catalog::list_attributes))
        .route("/api/sync-segments", post(catalog::sync_segments))
        .route("/api/events", get(events::sse_events))
        .route("/api/chat", post(chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use treewright_service::TreeService;
    use treewright_storage::StorageBackend;
    use treewright_core::AttributeInput;
    use treewright_storage::traits::CatalogStore;

    struct TestApp {
        router: Router,
        storage: Arc<StorageBackend>,
    }

    fn app() -> TestApp {
        let storage = Arc::new(StorageBackend::new_memory());
        let (event_tx, _) = broadcast::channel(16);
        let conversations = Arc::new(ConversationService::new(Arc::clone(&storage), None));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage)));
        let trees = Arc::new(TreeService::new(Arc::clone(&storage), None));
        let sync = Arc::new(SyncService::new(Arc::clone(&storage), None, event_tx.clone()));
        let chat = Arc::new(ChatService::new(
            None,
            Arc::clone(&conversations),
            Arc::clone(&catalog),
            trees,
        ));
        let state = Arc::new(AppState { event_tx, conversations, catalog, sync, chat });
        TestApp { router: create_router(state), storage }
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_plain_ok() {
        let app = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let app = app();
        let (status, created) = send(&app.router, "POST", "/api/conversations/quick", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(created["title"].is_null());
        assert_eq!(created["promptText"], "");
        let id = created["conversationId"].as_str().unwrap().to_owned();

        let history = json!({"messages": [{"role": "user", "content": "VIPs"}]});
        let (status, _) =
            send(&app.router, "POST", &format!("/api/conversations/{id}/save-messages"), Some(history))
                .await;
        assert_eq!(status, StatusCode::OK);

        let (_, messages) = send(&app.router, "GET", &format!("/api/conversations/{id}/messages"), None).await;
        assert_eq!(messages["messages"][0]["content"], "VIPs");

        let (_, listed) = send(&app.router, "GET", "/api/conversations", None).await;
        assert_eq!(listed["conversations"].as_array().unwrap().len(), 1);

        let (_, tree) = send(&app.router, "GET", &format!("/api/conversations/{id}/tree"), None).await;
        assert!(tree["tree"].is_null());
        assert_eq!(tree["versions"], json!([]));

        let (_, deleted) = send(&app.router, "DELETE", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(deleted["deleted"], true);
        let (status, body) = send(&app.router, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn save_messages_requires_array() {
        let app = app();
        let (status, body) =
            send(&app.router, "POST", "/api/conversations/x/save-messages", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "messages array is required");

        let payload = json!({"messages": []});
        let (status, _) =
            send(&app.router, "POST", "/api/conversations/missing/save-messages", Some(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn title_without_llm_is_null() {
        let app = app();
        let (_, created) = send(&app.router, "POST", "/api/conversations", Some(json!({"promptText": "VIPs"}))).await;
        let id = created["conversationId"].as_str().unwrap();
        let (status, body) =
            send(&app.router, "POST", &format!("/api/conversations/{id}/title"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["title"].is_null());
    }

    #[tokio::test]
    async fn catalog_listings() {
        let app = app();
        app.storage.upsert_segments(&["vip".into(), "churned".into()]).await.unwrap();
        let (_, segments) = send(&app.router, "GET", "/api/segments", None).await;
        assert_eq!(segments["segments"][0]["name"], "churned");
        assert_eq!(segments["status"]["totalSegments"], 2);
        assert_eq!(segments["status"]["isInitialSync"], true);

        let (_, attributes) = send(&app.router, "GET", "/api/attributes", None).await;
        assert_eq!(attributes["count"], 0);

        let country = AttributeInput {
            id: "country".into(),
            name: "Country".into(),
            attr_type: "string".into(),
            ops: vec!["==".into()],
            description: None,
            enum_values: None,
            min: None,
            max: None,
            item_type: None,
            schema: None,
        };
        app.storage.upsert_attributes(&[country]).await.unwrap();
        let (_, attributes) = send(&app.router, "GET", "/api/attributes", None).await;
        assert_eq!(attributes["count"], 1);
        assert_eq!(attributes["attributes"][0]["id"], "country");
    }

    #[tokio::test]
    async fn unconfigured_backends_are_unavailable() {
        let app = app();
        let (status, _) = send(&app.router, "POST", "/api/sync-segments", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, created) = send(&app.router, "POST", "/api/conversations/quick", None).await;
        let body = json!({"id": created["conversationId"], "messages": [{"role": "user", "content": "hi"}]});
        let (status, _) = send(&app.router, "POST", "/api/chat", Some(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn chat_validates_before_streaming() {
        let app = app();
        let (status, body) = send(&app.router, "POST", "/api/chat", Some(json!({"messages": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "conversationId is required");

        let (status, _) =
            send(&app.router, "POST", "/api/chat", Some(json!({"id": "nope", "messages": []}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
