//! Snapshot and stream resolution.
//!
//! [`WebcamHelper`] picks a camera, normalizes its URLs, and walks the fallback
//! chain: snapshot URL, then one frame pulled out of the MJPEG stream. Every
//! result leaves with the camera's transform header attached.

use crate::default_camera::DefaultCameraStore;
use crate::http::{get_following_redirects, HttpExecutor, HttpResult};
use crate::platform::WebcamPlatform;
use crate::{jpeg, metrics, mjpeg};
use anyhow::{anyhow, Result};
use common::oracle;
use common::url_quirks::normalize_webcam_url;
use common::webcams::{WebcamSettingItem, WEBCAM_TRANSFORM_HEADER};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which camera's stream a failed snapshot falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFallbackSource {
    /// The camera the snapshot was requested for
    #[default]
    RequestedCamera,
    /// The default camera, whichever camera was requested
    DefaultCamera,
}

impl SnapshotFallbackSource {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requested" | "requested-camera" => Ok(SnapshotFallbackSource::RequestedCamera),
            "default" | "default-camera" => Ok(SnapshotFallbackSource::DefaultCamera),
            other => Err(anyhow!("unknown snapshot fallback source '{}'", other)),
        }
    }
}

pub struct WebcamHelper {
    executor: Arc<dyn HttpExecutor>,
    platform: Arc<dyn WebcamPlatform>,
    default_camera: DefaultCameraStore,
    fallback_source: SnapshotFallbackSource,
}

impl WebcamHelper {
    pub fn new(
        executor: Arc<dyn HttpExecutor>,
        platform: Arc<dyn WebcamPlatform>,
        default_camera: DefaultCameraStore,
    ) -> Self {
        Self {
            executor,
            platform,
            default_camera,
            fallback_source: SnapshotFallbackSource::default(),
        }
    }

    pub fn with_fallback_source(mut self, fallback_source: SnapshotFallbackSource) -> Self {
        self.fallback_source = fallback_source;
        self
    }

    pub fn default_camera_name(&self) -> Option<String> {
        self.default_camera.default_camera_name()
    }

    pub fn set_default_camera_name(&self, name: &str) {
        self.default_camera.set_default_camera_name(name);
    }

    /// Valid cameras in display order, or `None` if there are none.
    pub async fn list_webcams(&self) -> Option<Vec<WebcamSettingItem>> {
        let webcams = match self.platform.get_webcam_config().await {
            Ok(Some(webcams)) => webcams,
            Ok(None) => {
                debug!("platform has no webcam config");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to get the webcam config from the platform");
                return None;
            }
        };

        let valid: Vec<WebcamSettingItem> = webcams.into_iter().filter(|w| w.validate()).collect();
        if valid.is_empty() {
            debug!("no valid webcams configured");
            return None;
        }
        Some(valid)
    }

    /// The camera a request for `name` should use.
    pub async fn resolve_camera(&self, name: Option<&str>) -> Option<WebcamSettingItem> {
        let webcams = self.list_webcams().await?;
        let default_name = self.default_camera_name();
        select_camera(&webcams, name, default_name.as_deref())
    }

    pub async fn get_snapshot(&self, name: Option<&str>) -> Option<HttpResult> {
        metrics::SNAPSHOT_REQUESTS_TOTAL.inc();
        let result = self.snapshot_for(name).await;
        if result.is_none() {
            metrics::SNAPSHOT_FAILURES_TOTAL.inc();
        }
        result
    }

    async fn snapshot_for(&self, name: Option<&str>) -> Option<HttpResult> {
        let camera = self.resolve_camera(name).await?;

        let mut result = None;
        if let Some(url) = camera.snapshot_url() {
            let url = normalize_webcam_url(url, false);
            match get_following_redirects(self.executor.as_ref(), &url).await {
                Some(r) if r.is_success() => result = Some(r),
                Some(r) => debug!(camera = %camera.name, url = %url, status = %r.status(), "snapshot url failed"),
                None => debug!(camera = %camera.name, url = %url, "snapshot url didn't respond"),
            }
        }

        if result.is_none() {
            result = self.snapshot_from_stream(&camera).await;
        }

        let mut result = jpeg::ensure_jpeg_header_info(result?).await?;
        set_transform_header(&mut result, &camera);
        Some(result)
    }

    async fn snapshot_from_stream(&self, requested: &WebcamSettingItem) -> Option<HttpResult> {
        let source = match self.fallback_source {
            SnapshotFallbackSource::RequestedCamera => requested.clone(),
            SnapshotFallbackSource::DefaultCamera => self.resolve_camera(None).await?,
        };
        let Some(url) = source.stream_url() else {
            debug!(camera = %source.name, "no stream url to fall back to for a snapshot");
            return None;
        };

        let url = normalize_webcam_url(url, true);
        info!(camera = %source.name, url = %url, "getting the snapshot from the webcam stream");
        metrics::SNAPSHOT_STREAM_FALLBACKS_TOTAL.inc();
        mjpeg::get_snapshot_from_stream(self.executor.as_ref(), &url).await
    }

    /// Opens the camera's stream. Whatever the camera answers is passed
    /// through; `None` means there was nothing to relay.
    pub async fn get_webcam_stream(&self, name: Option<&str>) -> Option<HttpResult> {
        metrics::STREAM_REQUESTS_TOTAL.inc();
        let result = self.stream_for(name).await;
        if result.is_none() {
            metrics::STREAM_FAILURES_TOTAL.inc();
        }
        result
    }

    async fn stream_for(&self, name: Option<&str>) -> Option<HttpResult> {
        let camera = self.resolve_camera(name).await?;
        let Some(url) = camera.stream_url() else {
            info!(camera = %camera.name, "webcam stream requested but no stream url is configured");
            return None;
        };

        let url = normalize_webcam_url(url, true);
        let mut result = get_following_redirects(self.executor.as_ref(), &url).await?;
        set_transform_header(&mut result, &camera);
        Some(result)
    }

    /// Services a request flagged by the oracle headers.
    pub async fn make_snapshot_or_stream_request(&self, headers: &HeaderMap) -> Result<Option<HttpResult>> {
        let name = oracle::oracle_request_camera_name(headers);
        if oracle::is_snapshot_oracle_request(headers) {
            Ok(self.get_snapshot(name.as_deref()).await)
        } else if oracle::is_webcam_stream_oracle_request(headers) {
            Ok(self.get_webcam_stream(name.as_deref()).await)
        } else {
            Err(anyhow!("request isn't a snapshot or webcam stream request"))
        }
    }
}

/// Picks by name (explicit, else `default_name`), falling back to the first
/// camera when the name matches nothing.
pub fn select_camera(
    webcams: &[WebcamSettingItem],
    name: Option<&str>,
    default_name: Option<&str>,
) -> Option<WebcamSettingItem> {
    let first = webcams.first()?;

    let name = name.filter(|n| !n.trim().is_empty()).or(default_name);
    if let Some(name) = name {
        if let Some(found) = webcams.iter().find(|w| w.is_named(name)) {
            return Some(found.clone());
        }
        error!(name = %name, "webcam name not found, using the first webcam");
    }
    Some(first.clone())
}

fn set_transform_header(result: &mut HttpResult, camera: &WebcamSettingItem) {
    match HeaderValue::from_str(&camera.transform_descriptor()) {
        Ok(value) => {
            result
                .headers_mut()
                .insert(HeaderName::from_static(WEBCAM_TRANSFORM_HEADER), value);
        }
        Err(e) => warn!(camera = %camera.name, error = %e, "couldn't build the webcam transform header"),
    }
}
