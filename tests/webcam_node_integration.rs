//! End-to-end tests against a fake camera served over real HTTP.

use anyhow::Result;
use axum::body::Body;
use axum::extract::Query;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use common::webcams::WEBCAM_TRANSFORM_HEADER;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use webcam_node::api::{self, AppState};
use webcam_node::default_camera::DefaultCameraStore;
use webcam_node::http::ReqwestExecutor;
use webcam_node::platform::CameraListPlatform;
use webcam_node::WebcamHelper;

/// A tiny JPEG whose APP0 identifier was zeroed by the streaming server.
const ZEROED_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00, 0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0xFF, 0xD9,
];

async fn spawn(app: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

fn multipart_frame(jpeg: &[u8]) -> Bytes {
    let mut buf = format!(
        "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    )
    .into_bytes();
    buf.extend_from_slice(jpeg);
    buf.extend_from_slice(b"\r\n");
    Bytes::from(buf)
}

/// Never ends, like a real MJPEG server.
async fn mjpeg_stream() -> Response {
    let frames = futures::stream::unfold(0u32, |n| async move {
        if n > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Some((Ok::<_, std::io::Error>(multipart_frame(ZEROED_JPEG)), n + 1))
    });
    (
        [(CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame")],
        Body::from_stream(frames),
    )
        .into_response()
}

/// Sends headers, then nothing.
async fn stalled_stream() -> Response {
    let nothing = futures::stream::pending::<Result<Bytes, std::io::Error>>();
    (
        [(CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame")],
        Body::from_stream(nothing),
    )
        .into_response()
}

async fn classic_webcam(Query(q): Query<HashMap<String, String>>) -> Response {
    match q.get("action").map(String::as_str) {
        Some("stream") => mjpeg_stream().await,
        _ => (StatusCode::NOT_FOUND, "no snapshot here").into_response(),
    }
}

fn camera_app() -> Router {
    Router::new()
        .route("/webcam/", get(classic_webcam))
        .route("/stream", get(mjpeg_stream))
        .route("/stalled", get(stalled_stream))
        .route(
            "/good/snapshot.jpg",
            get(|| async { ([(CONTENT_TYPE, "image/jpeg")], ZEROED_JPEG).into_response() }),
        )
}

struct Harness {
    node: SocketAddr,
    helper: Arc<WebcamHelper>,
    _dir: TempDir,
}

async fn harness(read_timeout: Duration) -> Result<Harness> {
    telemetry::init();

    let camera = spawn(camera_app()).await?;
    let dir = TempDir::new()?;
    let webcams = serde_json::json!([
        {
            "name": "Printer",
            "snapshot_url": "/webcam?action=snapshot",
            "stream_url": "/webcam/?action=stream",
            "flip_h": true,
            "flip_v": false,
            "rotation": 90
        },
        {
            "name": "Direct",
            "snapshot_url": format!("http://{camera}/good/snapshot.jpg"),
            "stream_url": format!("http://{camera}/webrtc"),
            "flip_h": false,
            "flip_v": "false",
            "rotation": 0
        },
        {
            "name": "Stalled",
            "stream_url": "/stalled",
            "flip_h": 0,
            "flip_v": 1,
            "rotation": 0
        }
    ]);
    let list_path = dir.path().join("webcams.json");
    std::fs::write(&list_path, serde_json::to_vec(&webcams)?)?;

    let executor = ReqwestExecutor::new(format!("http://{camera}"), Duration::from_secs(2), read_timeout)?;
    let helper = WebcamHelper::new(
        Arc::new(executor),
        Arc::new(CameraListPlatform::new(list_path)),
        DefaultCameraStore::load(dir.path()),
    );
    let state = AppState::new(helper);
    let helper = state.helper.clone();
    let node = spawn(api::router(state)).await?;

    Ok(Harness {
        node,
        helper,
        _dir: dir,
    })
}

#[tokio::test]
async fn test_snapshot_falls_back_to_stream_frame() -> Result<()> {
    let h = harness(Duration::from_secs(5)).await?;

    let response = reqwest::get(format!("http://{}/v1/webcams/snapshot?camera=printer", h.node)).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[CONTENT_TYPE.as_str()], "image/jpeg");
    assert_eq!(response.headers()[WEBCAM_TRANSFORM_HEADER], "fliph rotate=90");

    let body = response.bytes().await?;
    assert_eq!(body.len(), ZEROED_JPEG.len());
    assert_eq!(&body[6..11], b"JFIF\0");
    // Everything past the identifier is untouched.
    assert_eq!(&body[11..], &ZEROED_JPEG[11..]);
    Ok(())
}

#[tokio::test]
async fn test_direct_snapshot_is_repaired() -> Result<()> {
    let h = harness(Duration::from_secs(5)).await?;

    let result = h.helper.get_snapshot(Some("DIRECT")).await.expect("snapshot");
    assert_eq!(result.status(), StatusCode::OK);
    assert_eq!(result.header_str(WEBCAM_TRANSFORM_HEADER), Some("none"));
    assert_eq!(&result.full_body().expect("buffered")[6..11], b"JFIF\0");
    Ok(())
}

#[tokio::test]
async fn test_stream_is_relayed_live() -> Result<()> {
    let h = harness(Duration::from_secs(5)).await?;

    // The webrtc url is swapped for camera-streamer's mjpeg endpoint.
    let mut response = reqwest::get(format!("http://{}/v1/webcams/stream?camera=Direct", h.node)).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()[CONTENT_TYPE.as_str()],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(response.headers()[WEBCAM_TRANSFORM_HEADER], "none");

    let mut received = Vec::new();
    while received.len() < 2 * ZEROED_JPEG.len() {
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await??
            .expect("stream should keep going");
        received.extend_from_slice(&chunk);
    }
    assert!(received.starts_with(b"--frame\r\n"));
    Ok(())
}

#[tokio::test]
async fn test_oracle_request_uses_camera_name_header() -> Result<()> {
    let h = harness(Duration::from_secs(5)).await?;

    let response = reqwest::Client::new()
        .get(format!("http://{}/v1/oracle", h.node))
        .header("oe-snapshot", "1")
        .header("oe-webcam-name", "Printer")
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[WEBCAM_TRANSFORM_HEADER], "fliph rotate=90");

    let response = reqwest::get(format!("http://{}/v1/oracle", h.node)).await?;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_stalled_stream_times_out() -> Result<()> {
    let h = harness(Duration::from_millis(500)).await?;

    let started = std::time::Instant::now();
    let response = reqwest::get(format!("http://{}/v1/webcams/snapshot?camera=stalled", h.node)).await?;
    assert_eq!(response.status(), 502);
    assert!(started.elapsed() < Duration::from_secs(5));

    let json: serde_json::Value = response.json().await?;
    assert!(json["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_list_and_metrics() -> Result<()> {
    let h = harness(Duration::from_secs(5)).await?;

    let json: serde_json::Value = reqwest::get(format!("http://{}/v1/webcams", h.node))
        .await?
        .json()
        .await?;
    let names: Vec<&str> = json["webcams"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|w| w["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Printer", "Direct", "Stalled"]);
    assert_eq!(json["webcams"][2]["transform"], "flipv");

    let _ = reqwest::get(format!("http://{}/v1/webcams/snapshot?camera=printer", h.node)).await?;
    let metrics = reqwest::get(format!("http://{}/metrics", h.node)).await?.text().await?;
    assert!(metrics.contains("webcam_snapshot_requests_total"));
    assert!(metrics.contains("webcam_snapshot_stream_fallbacks_total"));
    Ok(())
}
