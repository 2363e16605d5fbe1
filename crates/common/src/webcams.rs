use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::error;

/// Response header carrying the display transform of the camera that served a result.
pub const WEBCAM_TRANSFORM_HEADER: &str = "x-oe-webcam-transform";

/// Rotations (clockwise, degrees) a camera can be configured with.
pub const VALID_ROTATIONS: [i32; 4] = [0, 90, 180, 270];

/// A platform agnostic description of one camera.
///
/// Snapshot and stream URLs may be absolute (`http://host/...`) or relative to
/// the local web server (`/webcam/?action=stream`). Items come straight from
/// platform configuration, so every field may be missing or malformed until
/// [`WebcamSettingItem::validate`] has accepted the item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebcamSettingItem {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub snapshot_url: Option<String>,
  #[serde(default)]
  pub stream_url: Option<String>,
  #[serde(default, deserialize_with = "deserialize_flag")]
  pub flip_h: Option<bool>,
  #[serde(default, deserialize_with = "deserialize_flag")]
  pub flip_v: Option<bool>,
  #[serde(default)]
  pub rotation: Option<i32>,
}

impl WebcamSettingItem {
  pub fn new(
    name: impl Into<String>,
    snapshot_url: Option<String>,
    stream_url: Option<String>,
    flip_h: bool,
    flip_v: bool,
    rotation: i32,
  ) -> Self {
    Self {
      name: name.into(),
      snapshot_url,
      stream_url,
      flip_h: Some(flip_h),
      flip_v: Some(flip_v),
      rotation: Some(rotation),
    }
  }

  /// Checks the item is usable. Every violation is logged on its own line.
  pub fn validate(&self) -> bool {
    let mut valid = true;

    if self.name.trim().is_empty() {
      error!(stream_url = ?self.stream_url, "webcam setting has an empty name");
      valid = false;
    }
    match self.rotation {
      Some(rotation) if VALID_ROTATIONS.contains(&rotation) => {}
      other => {
        error!(name = %self.name, rotation = ?other, "webcam setting has an invalid rotation");
        valid = false;
      }
    }
    if self.snapshot_url().is_none() && self.stream_url().is_none() {
      error!(name = %self.name, "webcam setting has neither a snapshot nor a stream url");
      valid = false;
    }
    if self.flip_h.is_none() {
      error!(name = %self.name, "webcam setting is missing flip_h");
      valid = false;
    }
    if self.flip_v.is_none() {
      error!(name = %self.name, "webcam setting is missing flip_v");
      valid = false;
    }

    valid
  }

  /// The snapshot url, if one is configured and non-empty.
  pub fn snapshot_url(&self) -> Option<&str> {
    self.snapshot_url.as_deref().filter(|u| !u.trim().is_empty())
  }

  /// The stream url, if one is configured and non-empty.
  pub fn stream_url(&self) -> Option<&str> {
    self.stream_url.as_deref().filter(|u| !u.trim().is_empty())
  }

  pub fn is_flipped_h(&self) -> bool {
    self.flip_h.unwrap_or(false)
  }

  pub fn is_flipped_v(&self) -> bool {
    self.flip_v.unwrap_or(false)
  }

  pub fn rotation_degrees(&self) -> i32 {
    self.rotation.unwrap_or(0)
  }

  /// Case-insensitive identity comparison.
  pub fn is_named(&self, name: &str) -> bool {
    self.name.to_lowercase() == name.to_lowercase()
  }

  /// Space separated transform descriptor, e.g. `fliph rotate=90`, or `none`.
  pub fn transform_descriptor(&self) -> String {
    let mut parts = Vec::new();
    if self.is_flipped_h() {
      parts.push("fliph".to_string());
    }
    if self.is_flipped_v() {
      parts.push("flipv".to_string());
    }
    if self.rotation_degrees() != 0 {
      parts.push(format!("rotate={}", self.rotation_degrees()));
    }

    if parts.is_empty() {
      "none".to_string()
    } else {
      parts.join(" ")
    }
  }
}

/// Accepts the loose flag encodings platforms emit (bools, 0/1, "true"/"false").
/// Anything that can't be read as a flag is treated as missing.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.as_ref().and_then(coerce_flag))
}

pub fn coerce_flag(value: &Value) -> Option<bool> {
  match value {
    Value::Bool(b) => Some(*b),
    Value::Number(n) => n.as_f64().map(|f| f != 0.0),
    Value::String(s) => match s.trim().to_lowercase().as_str() {
      "true" | "1" | "yes" | "on" => Some(true),
      "false" | "0" | "no" | "off" | "" => Some(false),
      _ => None,
    },
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn valid_item() -> WebcamSettingItem {
    WebcamSettingItem::new(
      "Printer Cam",
      Some("/webcam/?action=snapshot".to_string()),
      Some("/webcam/?action=stream".to_string()),
      false,
      false,
      0,
    )
  }

  #[test]
  fn test_valid_item_passes() {
    assert!(valid_item().validate());
  }

  #[test]
  fn test_empty_name_fails() {
    let mut item = valid_item();
    item.name = String::new();
    assert!(!item.validate());
  }

  #[test]
  fn test_invalid_rotation_fails() {
    for rotation in [45, -90, 360, 1] {
      let mut item = valid_item();
      item.rotation = Some(rotation);
      assert!(!item.validate(), "rotation {} should be rejected", rotation);
    }

    let mut item = valid_item();
    item.rotation = None;
    assert!(!item.validate());
  }

  #[test]
  fn test_all_valid_rotations_pass() {
    for rotation in VALID_ROTATIONS {
      let mut item = valid_item();
      item.rotation = Some(rotation);
      assert!(item.validate());
    }
  }

  #[test]
  fn test_missing_urls_fail() {
    let mut item = valid_item();
    item.snapshot_url = None;
    item.stream_url = Some("  ".to_string());
    assert!(!item.validate());

    // One url is enough.
    item.stream_url = Some("http://cam.local/stream".to_string());
    assert!(item.validate());
  }

  #[test]
  fn test_missing_flip_flags_fail() {
    let mut item = valid_item();
    item.flip_h = None;
    assert!(!item.validate());

    let mut item = valid_item();
    item.flip_v = None;
    assert!(!item.validate());
  }

  #[test]
  fn test_deserialize_coerces_flags() {
    let item: WebcamSettingItem = serde_json::from_value(json!({
      "name": "cam",
      "stream_url": "http://cam/stream",
      "flip_h": 1,
      "flip_v": "false",
      "rotation": 90
    }))
    .expect("item should parse");

    assert_eq!(item.flip_h, Some(true));
    assert_eq!(item.flip_v, Some(false));
    assert!(item.validate());
  }

  #[test]
  fn test_deserialize_missing_fields_fail_validation() {
    let item: WebcamSettingItem = serde_json::from_value(json!({
      "stream_url": "http://cam/stream",
      "flip_h": {"nested": true},
      "rotation": 0
    }))
    .expect("item should parse");

    assert_eq!(item.name, "");
    assert_eq!(item.flip_h, None);
    assert_eq!(item.flip_v, None);
    assert!(!item.validate());
  }

  #[test]
  fn test_transform_descriptor() {
    assert_eq!(valid_item().transform_descriptor(), "none");

    let item = WebcamSettingItem::new("a", None, Some("/s".into()), true, false, 0);
    assert_eq!(item.transform_descriptor(), "fliph");

    let item = WebcamSettingItem::new("a", None, Some("/s".into()), true, true, 270);
    assert_eq!(item.transform_descriptor(), "fliph flipv rotate=270");

    let item = WebcamSettingItem::new("a", None, Some("/s".into()), false, true, 90);
    assert_eq!(item.transform_descriptor(), "flipv rotate=90");
  }

  #[test]
  fn test_is_named_ignores_case() {
    let item = valid_item();
    assert!(item.is_named("printer cam"));
    assert!(item.is_named("PRINTER CAM"));
    assert!(!item.is_named("printer"));
  }
}
