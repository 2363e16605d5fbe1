//! Where camera settings come from.
//!
//! The resolver only sees [`WebcamPlatform`]; each host platform turns its own
//! configuration format into [`WebcamSettingItem`]s.

use anyhow::Result;
use async_trait::async_trait;
use common::webcams::WebcamSettingItem;

pub mod camera_list;
pub mod classic;

pub use camera_list::CameraListPlatform;
pub use classic::ClassicWebcamPlatform;

#[async_trait]
pub trait WebcamPlatform: Send + Sync {
  /// The configured cameras in display order; index 0 is the implicit default.
  ///
  /// `Ok(None)` means the platform has no camera configuration at all. Called
  /// on every request, so implementations should not cache.
  async fn get_webcam_config(&self) -> Result<Option<Vec<WebcamSettingItem>>>;
}

/// A fixed camera list, for embedding and tests.
pub struct FixedWebcamPlatform {
  webcams: Option<Vec<WebcamSettingItem>>,
}

impl FixedWebcamPlatform {
  pub fn new(webcams: Vec<WebcamSettingItem>) -> Self {
    Self {
      webcams: Some(webcams),
    }
  }

  pub fn unconfigured() -> Self {
    Self { webcams: None }
  }
}

#[async_trait]
impl WebcamPlatform for FixedWebcamPlatform {
  async fn get_webcam_config(&self) -> Result<Option<Vec<WebcamSettingItem>>> {
    Ok(self.webcams.clone())
  }
}
