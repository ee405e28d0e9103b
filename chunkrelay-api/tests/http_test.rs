// HTTP route tests driven through the router with tower's oneshot

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chunkrelay_api::{create_router, AppState};
use chunkrelay_core::relay::{ChunkRelay, RelayLimits, StreamRegistry};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "chunkrelay-test-boundary";

fn app_with_limit(max_chunk_bytes: usize) -> (Router, Arc<ChunkRelay>) {
    let relay = Arc::new(ChunkRelay::new(
        Arc::new(StreamRegistry::new()),
        RelayLimits { max_chunk_bytes },
        None,
    ));
    let router = create_router(AppState::new(Arc::clone(&relay)), None);
    (router, relay)
}

fn app() -> (Router, Arc<ChunkRelay>) {
    app_with_limit(1024)
}

/// Build a multipart body with optional text fields and an optional chunk file
fn multipart_body(stream_id: Option<&str>, mime_type: Option<&str>, chunk: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("streamId", stream_id), ("mimeType", mime_type)] {
        if let Some(value) = value {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
    }
    if let Some(chunk) = chunk {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"videoChunk\"; filename=\"blob\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(chunk);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uploadChunk")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_upload_then_poll_chunk() {
    let (app, _relay) = app();

    let response = app
        .clone()
        .oneshot(upload_request(multipart_body(
            Some("s1"),
            Some("video/webm"),
            Some(b"first chunk"),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Chunk received and uploading");
    assert_eq!(json["index"], 0);

    let response = app
        .clone()
        .oneshot(get_request("/getChunk?streamId=s1&index=0&clientId=c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "video/webm");
    assert_eq!(response.headers().get("content-length").unwrap(), "11");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"first chunk");

    let response = app
        .oneshot(get_request("/getChunk?streamId=s1&index=1&clientId=c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_empty_chunk_and_padded_stream_id_accepted() {
    let (app, relay) = app();

    let response = app
        .clone()
        .oneshot(upload_request(multipart_body(Some(" s1 "), Some("video/webm"), Some(b""))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["index"], 0);
    assert_eq!(relay.registry().stream_ids(), vec![" s1 ".to_string()]);

    let response = app
        .clone()
        .oneshot(get_request("/getChunk?streamId=%20s1%20&index=0&clientId=c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-length").unwrap(), "0");

    let response = app
        .oneshot(get_request("/getChunk?streamId=s1&index=0&clientId=c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_upload_missing_fields() {
    let (app, relay) = app();

    for body in [
        multipart_body(None, Some("video/webm"), Some(b"x")),
        multipart_body(Some("s1"), None, Some(b"x")),
        multipart_body(Some("s1"), Some("video/webm"), None),
    ] {
        let response = app.clone().oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Missing required fields");
        assert_eq!(json["details"], "videoChunk, streamId, and mimeType are required");
    }

    assert!(relay.registry().is_empty());
}

#[tokio::test]
async fn test_upload_without_multipart_body() {
    let (app, _relay) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/uploadChunk")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Missing required fields");
}

#[tokio::test]
async fn test_oversize_upload_rejected_without_mutation() {
    let (app, relay) = app_with_limit(8);

    let response = app
        .clone()
        .oneshot(upload_request(multipart_body(Some("s1"), Some("video/webm"), Some(b"ok"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(upload_request(multipart_body(
            Some("s1"),
            Some("video/webm"),
            Some(b"way past the limit"),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid input");
    assert_eq!(relay.registry().stats("s1").unwrap().next_index, 1);
}

#[tokio::test]
async fn test_get_chunk_invalid_query() {
    let (app, _relay) = app();

    for uri in [
        "/getChunk?index=0&clientId=c1",
        "/getChunk?streamId=s1&index=0",
        "/getChunk?streamId=s1&clientId=c1",
        "/getChunk?streamId=s1&index=abc&clientId=c1",
        "/getChunk?streamId=s1&index=-1&clientId=c1",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = json_body(response).await;
        assert_eq!(json["error"], "Invalid request");
        assert_eq!(json["details"], "streamId, clientId, and valid index are required");
    }
}

#[tokio::test]
async fn test_get_chunk_unknown_stream_is_no_content() {
    let (app, relay) = app();

    let response = app
        .oneshot(get_request("/getChunk?streamId=ghost&index=0&clientId=c1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(relay.registry().get("ghost").is_none());
}

#[tokio::test]
async fn test_stream_stats_routes() {
    let (app, relay) = app();
    relay
        .ingest("cam-1", "video/mp4", bytes::Bytes::from_static(b"abc"))
        .unwrap();

    let response = app.clone().oneshot(get_request("/streams")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json[0]["stream_id"], "cam-1");
    assert_eq!(json[0]["chunk_count"], 1);
    assert_eq!(json[0]["total_bytes"], 3);

    let response = app.clone().oneshot(get_request("/streams/cam-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["content_type"], "video/mp4");

    let response = app.oneshot(get_request("/streams/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, relay) = app();
    relay
        .ingest("s1", "video/webm", bytes::Bytes::from_static(b"x"))
        .unwrap();

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("chunkrelay_chunks_ingested_total"));
}

#[tokio::test]
async fn test_static_fallback_serves_client() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>relay</html>").unwrap();

    let relay = Arc::new(ChunkRelay::new(
        Arc::new(StreamRegistry::new()),
        RelayLimits::default(),
        None,
    ));
    let app = create_router(AppState::new(relay), dir.path().to_str());

    let response = app.clone().oneshot(get_request("/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<html>relay</html>");

    // API routes still win over the fallback
    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
