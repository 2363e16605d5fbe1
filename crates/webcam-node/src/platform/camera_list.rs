use super::WebcamPlatform;
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::validation::validate_webcam_url;
use common::webcams::WebcamSettingItem;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Cameras listed in a JSON file, re-read on every query so edits apply
/// without a restart.
///
/// ```json
/// [{"name": "Nozzle", "snapshot_url": "http://10.0.0.8/snap.jpg",
///   "stream_url": "/webcam/?action=stream", "flip_h": false, "flip_v": 1, "rotation": 90}]
/// ```
pub struct CameraListPlatform {
    path: PathBuf,
}

impl CameraListPlatform {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WebcamPlatform for CameraListPlatform {
    async fn get_webcam_config(&self) -> Result<Option<Vec<WebcamSettingItem>>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no camera list file");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        let mut items: Vec<WebcamSettingItem> = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse camera list {}", self.path.display()))?;
        for item in &mut items {
            drop_unusable_url(&item.name, &mut item.snapshot_url, "snapshot_url");
            drop_unusable_url(&item.name, &mut item.stream_url, "stream_url");
        }
        Ok(Some(items))
    }
}

fn drop_unusable_url(name: &str, url: &mut Option<String>, field: &str) {
    let Some(value) = url.as_deref().filter(|u| !u.is_empty()) else {
        return;
    };
    if let Err(e) = validate_webcam_url(value, field) {
        warn!(camera = %name, field, error = %e, "ignoring unusable webcam url");
        *url = None;
    }
}
