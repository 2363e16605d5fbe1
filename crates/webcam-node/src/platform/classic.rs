use super::WebcamPlatform;
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::webcams::{coerce_flag, WebcamSettingItem};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_SNAPSHOT_URL: &str = "/webcam/?action=snapshot";
pub const DEFAULT_STREAM_URL: &str = "/webcam/?action=stream";
pub const CLASSIC_WEBCAM_NAME: &str = "default";

/// The single camera of an OctoPrint style settings file.
///
/// URLs and orientation live under `webcam`; newer installs keep the
/// orientation under `plugins.classicwebcam` instead, which is used when the
/// `webcam` keys are absent.
pub struct ClassicWebcamPlatform {
  path: PathBuf,
}

impl ClassicWebcamPlatform {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

#[async_trait]
impl WebcamPlatform for ClassicWebcamPlatform {
  async fn get_webcam_config(&self) -> Result<Option<Vec<WebcamSettingItem>>> {
    let data = match tokio::fs::read(&self.path).await {
      Ok(data) => data,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "no classic webcam settings file");
        return Ok(None);
      }
      Err(e) => return Err(e).with_context(|| format!("failed to read {}", self.path.display())),
    };
    let settings: Value = serde_json::from_slice(&data)
      .with_context(|| format!("failed to parse webcam settings {}", self.path.display()))?;

    Ok(Some(vec![webcam_from_settings(&settings)]))
  }
}

fn webcam_from_settings(settings: &Value) -> WebcamSettingItem {
  let webcam = &settings["webcam"];
  let plugin = &settings["plugins"]["classicwebcam"];

  let url = |key: &str, default: &str| {
    webcam[key]
      .as_str()
      .filter(|u| !u.is_empty())
      .unwrap_or(default)
      .to_string()
  };
  let flag = |key: &str| {
    coerce_flag(&webcam[key])
      .or_else(|| coerce_flag(&plugin[key]))
      .unwrap_or(false)
  };

  // OctoPrint's rotate90 turns the image counter-clockwise.
  let rotation = if flag("rotate90") { 270 } else { 0 };

  WebcamSettingItem::new(
    CLASSIC_WEBCAM_NAME,
    Some(url("snapshot", DEFAULT_SNAPSHOT_URL)),
    Some(url("stream", DEFAULT_STREAM_URL)),
    flag("flipH"),
    flag("flipV"),
    rotation,
  )
}
