use common::webcams::WebcamSettingItem;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CameraQuery {
  pub camera: Option<String>,
}

#[derive(Serialize)]
pub struct WebcamDto {
  pub name: String,
  pub snapshot_url: Option<String>,
  pub stream_url: Option<String>,
  pub flip_h: bool,
  pub flip_v: bool,
  pub rotation: i32,
  pub transform: String,
}

impl From<WebcamSettingItem> for WebcamDto {
  fn from(item: WebcamSettingItem) -> Self {
    Self {
      transform: item.transform_descriptor(),
      flip_h: item.is_flipped_h(),
      flip_v: item.is_flipped_v(),
      rotation: item.rotation_degrees(),
      name: item.name,
      snapshot_url: item.snapshot_url,
      stream_url: item.stream_url,
    }
  }
}

#[derive(Serialize)]
pub struct WebcamListDto {
  pub default_camera: Option<String>,
  pub webcams: Vec<WebcamDto>,
}

#[derive(Serialize, Deserialize)]
pub struct DefaultCameraDto {
  pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct SetDefaultCameraRequest {
  pub name: String,
}
