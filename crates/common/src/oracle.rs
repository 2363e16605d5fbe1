//! Oracle requests: inbound requests that carry a sentinel header asking for a
//! webcam snapshot or stream instead of a generic proxied call.

use axum::http::HeaderMap;

/// Present when the request wants a single snapshot image.
pub const SNAPSHOT_ORACLE_HEADER: &str = "oe-snapshot";

/// Present when the request wants the live webcam stream.
pub const WEBCAM_STREAM_ORACLE_HEADER: &str = "oe-webcamstream";

/// Optional camera name override for either request kind.
pub const WEBCAM_NAME_ORACLE_HEADER: &str = "oe-webcam-name";

pub fn is_snapshot_oracle_request(headers: &HeaderMap) -> bool {
    headers.contains_key(SNAPSHOT_ORACLE_HEADER)
}

pub fn is_webcam_stream_oracle_request(headers: &HeaderMap) -> bool {
    headers.contains_key(WEBCAM_STREAM_ORACLE_HEADER)
}

pub fn is_snapshot_or_webcam_stream_oracle_request(headers: &HeaderMap) -> bool {
    is_snapshot_oracle_request(headers) || is_webcam_stream_oracle_request(headers)
}

/// The camera name override, if the header is set and readable.
pub fn oracle_request_camera_name(headers: &HeaderMap) -> Option<String> {
    headers
        .get(WEBCAM_NAME_ORACLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
