use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, error, info};

pub const SETTINGS_FILE_NAME: &str = "webcam-settings.json";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSettings {
    #[serde(rename = "DefaultWebcamName", default)]
    default_webcam_name: Option<String>,
}

/// The user's default camera, held in memory and mirrored to a JSON file.
///
/// The in-memory value is authoritative. A failed write is logged and the
/// new name still takes effect for this process.
pub struct DefaultCameraStore {
    path: PathBuf,
    name: RwLock<Option<String>>,
}

impl DefaultCameraStore {
    /// Loads the persisted default from `data_dir`. A missing or unreadable file means no default.
    pub fn load(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(SETTINGS_FILE_NAME);
        let name = read_default_name(&path);
        if let Some(name) = &name {
            info!(name = %name, "loaded default webcam name");
        }
        Self {
            path,
            name: RwLock::new(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_camera_name(&self) -> Option<String> {
        self.name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Sets the default (lowercased) and persists it.
    pub fn set_default_camera_name(&self, name: &str) {
        let name = name.to_lowercase();
        *self.name.write().unwrap_or_else(|e| e.into_inner()) = Some(name.clone());

        match self.persist(&name) {
            Ok(()) => debug!(name = %name, path = %self.path.display(), "saved default webcam name"),
            Err(e) => error!(name = %name, path = %self.path.display(), error = %e, "failed to save default webcam name"),
        }
    }

    fn persist(&self, name: &str) -> anyhow::Result<()> {
        let settings = PersistedSettings {
            default_webcam_name: Some(name.to_string()),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(&settings)?)?;
        Ok(())
    }
}

fn read_default_name(path: &Path) -> Option<String> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no default webcam settings file");
            return None;
        }
    };
    match serde_json::from_slice::<PersistedSettings>(&data) {
        Ok(settings) => settings
            .default_webcam_name
            .filter(|name| !name.trim().is_empty()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable default webcam settings");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_lowercases() {
        let dir = TempDir::new().unwrap();
        let store = DefaultCameraStore::load(dir.path());
        assert_eq!(store.default_camera_name(), None);

        store.set_default_camera_name("Cam1");
        assert_eq!(store.default_camera_name().as_deref(), Some("cam1"));

        let reloaded = DefaultCameraStore::load(dir.path());
        assert_eq!(reloaded.default_camera_name().as_deref(), Some("cam1"));
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let store = DefaultCameraStore::load(dir.path());
        store.set_default_camera_name("Garage");

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"DefaultWebcamName": "garage"}));
    }

    #[test]
    fn test_malformed_or_empty_file_means_no_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        std::fs::write(&path, b"{not json").unwrap();
        assert_eq!(DefaultCameraStore::load(dir.path()).default_camera_name(), None);

        std::fs::write(&path, br#"{"DefaultWebcamName": ""}"#).unwrap();
        assert_eq!(DefaultCameraStore::load(dir.path()).default_camera_name(), None);

        std::fs::write(&path, b"{}").unwrap();
        assert_eq!(DefaultCameraStore::load(dir.path()).default_camera_name(), None);
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_value() {
        let dir = TempDir::new().unwrap();
        // A file where the data directory should be makes every write fail.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let store = DefaultCameraStore::load(&blocker);
        store.set_default_camera_name("Front");
        assert_eq!(store.default_camera_name().as_deref(), Some("front"));
    }
}
