/*!
 * Tests for the HTTP content store client against a local stand-in server
 */

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use tqagent::content_source::{ContentSource, HttpContentSource, TranslationUpdate};
use tqagent::errors::ContentSourceError;

use crate::common::spawn_server;

type Received = Arc<Mutex<Vec<(String, Value)>>>;

async fn content_store(collection: Value) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    let router = Router::new()
        .route("/api/translations/all", get(move || async move { Json(collection) }))
        .route(
            "/api/translations/:id",
            put(|State(received): State<Received>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                received.lock().push((id, body));
                Json(json!({ "success": true }))
            }),
        )
        .with_state(Arc::clone(&received));

    let addr = spawn_server(router).await;
    (format!("http://{}", addr), received)
}

#[tokio::test]
async fn test_fetch_all_withEnvelope_shouldDecodeRecords() {
    let (base, _) = content_store(json!({
        "translations": [
            { "_id": "64f1", "english": "Coral reef", "sinhala": "කොරල් පරය", "tamil": "பவளப்பாறை", "context": "home" },
            { "id": 7, "english": "Sea turtle", "sinhala": "මුහුදු කැස්බෑවා", "tamil": "கடல் ஆமை" }
        ]
    }))
    .await;
    let source = HttpContentSource::new(&base, "/api/translations").unwrap();

    let records = source.fetch_all().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "64f1");
    assert_eq!(records[0].context.as_deref(), Some("home"));
    assert_eq!(records[1].id, "7");
    assert_eq!(records[1].tamil, "கடல் ஆமை");
}

#[tokio::test]
async fn test_fetch_all_withBareArray_shouldDecodeRecords() {
    let (base, _) = content_store(json!([{ "id": "a", "english": "Whale" }])).await;
    let source = HttpContentSource::new(&base, "api/translations").unwrap();

    let records = source.fetch_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].english, "Whale");
    assert_eq!(records[0].sinhala, "");
}

#[tokio::test]
async fn test_update_shouldPutCamelCasePayloadToRecordUrl() {
    let (base, received) = content_store(json!([])).await;
    let source = HttpContentSource::new(&base, "/api/translations").unwrap();
    let update = TranslationUpdate {
        sinhala: Some("කොරල් පර පද්ධතිය".to_string()),
        tamil: None,
        quality_score: 45.0,
        quality_issues: Vec::new(),
        last_quality_check: chrono::Utc::now(),
        auto_enhanced: true,
    };

    source.update("64f1", &update).await.unwrap();

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let (id, body) = &received[0];
    assert_eq!(id, "64f1");
    assert_eq!(body["sinhala"], "කොරල් පර පද්ධතිය");
    assert_eq!(body["qualityScore"], 45.0);
    assert_eq!(body["autoEnhanced"], true);
    assert!(body.get("tamil").is_none());
}

#[tokio::test]
async fn test_fetch_all_withServerError_shouldReturnStatusError() {
    let router = Router::new().route(
        "/api/translations/all",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "store is down") }),
    );
    let addr = spawn_server(router).await;
    let source = HttpContentSource::new(&format!("http://{}", addr), "/api/translations").unwrap();

    match source.fetch_all().await {
        Err(ContentSourceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "store is down");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_all_withUnexpectedShape_shouldReturnDecodeError() {
    let (base, _) = content_store(json!({ "items": 3 })).await;
    let source = HttpContentSource::new(&base, "/api/translations").unwrap();

    assert!(matches!(source.fetch_all().await, Err(ContentSourceError::Decode(_))));
}

#[tokio::test]
async fn test_fetch_all_whenServerIsSlow_shouldTimeOut() {
    let router = Router::new().route(
        "/api/translations/all",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let addr = spawn_server(router).await;
    let source = HttpContentSource::new(&format!("http://{}", addr), "/api/translations")
        .unwrap()
        .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));

    assert!(matches!(source.fetch_all().await, Err(ContentSourceError::Request(_))));
}
