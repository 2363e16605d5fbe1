use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use super::{
  ApiError, ApiResult, AppState, CameraQuery, DefaultCameraDto, SetDefaultCameraRequest, WebcamDto,
  WebcamListDto,
};
use crate::http::HttpResult;
use crate::metrics;
use common::{oracle, validation};

/// Connection scoped headers that must not be copied from the camera's response.
const HOP_BY_HOP_HEADERS: [&str; 3] = ["connection", "transfer-encoding", "keep-alive"];

pub async fn healthz() -> impl IntoResponse {
  (StatusCode::OK, "ok")
}

pub async fn readyz() -> impl IntoResponse {
  (StatusCode::OK, "ready")
}

pub async fn metrics() -> impl IntoResponse {
  (StatusCode::OK, metrics::render())
}

pub async fn list_webcams(State(state): State<AppState>) -> impl IntoResponse {
  let webcams = state.helper.list_webcams().await.unwrap_or_default();
  let out = WebcamListDto {
    default_camera: state.helper.default_camera_name(),
    webcams: webcams.into_iter().map(WebcamDto::from).collect(),
  };
  (StatusCode::OK, Json(out))
}

pub async fn get_default_camera(State(state): State<AppState>) -> impl IntoResponse {
  Json(DefaultCameraDto {
    name: state.helper.default_camera_name(),
  })
}

pub async fn set_default_camera(
  State(state): State<AppState>,
  Json(req): Json<SetDefaultCameraRequest>,
) -> ApiResult<Json<DefaultCameraDto>> {
  validation::validate_camera_name(&req.name)
    .map_err(|e| ApiError::bad_request(format!("invalid name: {e}")))?;

  state.helper.set_default_camera_name(&req.name);
  info!(name = %req.name, "default webcam updated");
  Ok(Json(DefaultCameraDto {
    name: state.helper.default_camera_name(),
  }))
}

pub async fn snapshot(State(state): State<AppState>, Query(q): Query<CameraQuery>) -> ApiResult<Response> {
  state
    .helper
    .get_snapshot(q.camera.as_deref())
    .await
    .map(relay)
    .ok_or_else(|| ApiError::bad_gateway("no snapshot available"))
}

pub async fn stream(State(state): State<AppState>, Query(q): Query<CameraQuery>) -> ApiResult<Response> {
  state
    .helper
    .get_webcam_stream(q.camera.as_deref())
    .await
    .map(relay)
    .ok_or_else(|| ApiError::bad_gateway("no webcam stream available"))
}

/// Serves whichever of snapshot or stream the oracle headers ask for.
pub async fn oracle(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
  if !oracle::is_snapshot_or_webcam_stream_oracle_request(&headers) {
    return Err(ApiError::bad_request(format!(
      "expected a {} or {} header",
      oracle::SNAPSHOT_ORACLE_HEADER,
      oracle::WEBCAM_STREAM_ORACLE_HEADER
    )));
  }

  state
    .helper
    .make_snapshot_or_stream_request(&headers)
    .await
    .map_err(|e| ApiError::bad_request(e.to_string()))?
    .map(relay)
    .ok_or_else(|| ApiError::bad_gateway("no webcam result available"))
}

/// Turns a resolver result into a response, streaming the body unless it was buffered.
fn relay(result: HttpResult) -> Response {
  let (upstream, full_body) = result.into_parts();

  let mut headers = upstream.headers;
  for name in HOP_BY_HOP_HEADERS {
    headers.remove(name);
  }

  let body = match full_body {
    Some(bytes) => {
      headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
      Body::from(bytes)
    }
    None => Body::from_stream(upstream.body.into_stream()),
  };

  if !upstream.status.is_success() {
    warn!(status = %upstream.status, "relaying an unsuccessful webcam response");
  }

  let mut response = Response::new(body);
  *response.status_mut() = upstream.status;
  *response.headers_mut() = headers;
  response
}
