//! Detection and repair of camera URL conventions that break internal consumers.
//!
//! Both helpers return `None` when the URL should be used as-is, and the
//! rewritten URL otherwise. Matching is ASCII case-insensitive so byte offsets
//! found in the lowercased copy are valid in the original string.

use tracing::info;

/// Translates a camera-streamer WebRTC stream URL to its MJPEG equivalent.
///
/// camera-streamer serves WebRTC at `.../webrtc` and MJPEG at `.../stream`.
/// WebRTC can't be relayed internally without exposing the viewer's address,
/// so internal consumers always use the MJPEG endpoint instead.
///
/// `/webrtc` must be the last path segment; anything after it means this is
/// not camera-streamer and no translation happens.
pub fn detect_camera_streamer_webrtc_stream_url_and_translate(stream_url: &str) -> Option<String> {
    let lower = stream_url.to_ascii_lowercase();
    let webrtc_location = lower.find("/webrtc")?;

    if lower[webrtc_location + 1..].contains('/') {
        return None;
    }

    Some(format!("{}/stream", &stream_url[..webrtc_location]))
}

/// Adds the missing `/` in urls shaped like `*webcam*?action=*`.
///
/// Some proxies redirect `webcam?action=stream` to `webcam/?action=stream`,
/// costing an extra hop and breaking callers that assume the path is final.
pub fn fix_missing_slash_in_webcam_url_if_needed(webcam_url: &str) -> Option<String> {
    let lower = webcam_url.to_ascii_lowercase();
    if !lower.contains("webcam") {
        return None;
    }
    let action_location = lower.find("?action=")?;

    // Nothing to look behind.
    if action_location == 0 {
        return None;
    }
    if lower.as_bytes()[action_location - 1] == b'/' {
        return None;
    }

    let fixed = format!(
        "{}/{}",
        &webcam_url[..action_location],
        &webcam_url[action_location..]
    );
    info!(original = %webcam_url, fixed = %fixed, "found incorrect webcam url, updating");
    Some(fixed)
}

/// Applies every known rewrite to a URL that will be consumed internally.
///
/// `translate_webrtc` should be set when the URL is a stream URL.
pub fn normalize_webcam_url(url: &str, translate_webrtc: bool) -> String {
    let mut url = url.to_string();
    if translate_webrtc {
        if let Some(translated) = detect_camera_streamer_webrtc_stream_url_and_translate(&url) {
            url = translated;
        }
    }
    if let Some(fixed) = fix_missing_slash_in_webcam_url_if_needed(&url) {
        url = fixed;
    }
    url
}
