use crate::helper::SnapshotFallbackSource;
use anyhow::{anyhow, Context, Result};
use common::validation::{validate_timeout_secs, validate_webcam_url};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// JSON array of cameras
    CameraList,
    /// OctoPrint style settings with one camera
    Classic,
}

impl PlatformKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera-list" | "cameralist" | "list" => Ok(PlatformKind::CameraList),
            "classic" | "octoprint" => Ok(PlatformKind::Classic),
            other => Err(anyhow!("unknown webcam platform '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub local_base_url: String,
    pub platform: PlatformKind,
    pub platform_file: PathBuf,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub snapshot_fallback: SnapshotFallbackSource,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind = lookup("WEBCAM_NODE_ADDR").unwrap_or_else(|| "0.0.0.0:8090".to_string());
        let bind_addr: SocketAddr = bind.parse().context("invalid WEBCAM_NODE_ADDR")?;

        let data_dir = PathBuf::from(lookup("WEBCAM_DATA_DIR").unwrap_or_else(|| "./data".to_string()));

        let local_base_url =
            lookup("WEBCAM_LOCAL_BASE_URL").unwrap_or_else(|| "http://127.0.0.1".to_string());
        validate_webcam_url(&local_base_url, "WEBCAM_LOCAL_BASE_URL")?;
        if local_base_url.starts_with('/') {
            return Err(anyhow!("WEBCAM_LOCAL_BASE_URL must be an absolute http(s) url"));
        }

        let platform = match lookup("WEBCAM_PLATFORM") {
            Some(value) => PlatformKind::parse(&value).context("invalid WEBCAM_PLATFORM")?,
            None => PlatformKind::CameraList,
        };
        let platform_file = lookup("WEBCAM_PLATFORM_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("webcams.json"));

        let connect_timeout = timeout_from(&lookup, "WEBCAM_CONNECT_TIMEOUT_SECS", 5)?;
        let read_timeout = timeout_from(&lookup, "WEBCAM_READ_TIMEOUT_SECS", 10)?;

        let snapshot_fallback = match lookup("WEBCAM_SNAPSHOT_FALLBACK") {
            Some(value) => SnapshotFallbackSource::parse(&value).context("invalid WEBCAM_SNAPSHOT_FALLBACK")?,
            None => SnapshotFallbackSource::default(),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            local_base_url,
            platform,
            platform_file,
            connect_timeout,
            read_timeout,
            snapshot_fallback,
        })
    }
}

fn timeout_from(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {}", key))?,
        None => default,
    };
    validate_timeout_secs(secs, key)?;
    Ok(Duration::from_secs(secs))
}
