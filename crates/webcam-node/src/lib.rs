//! Webcam snapshot and stream resolution.
//!
//! Given whatever cameras a platform has configured, [`helper::WebcamHelper`]
//! produces a single snapshot or a live stream, falling back to pulling a frame
//! out of the MJPEG stream when a camera has no working snapshot URL.

pub mod api;
pub mod config;
pub mod default_camera;
pub mod helper;
pub mod http;
pub mod jpeg;
pub mod metrics;
pub mod mjpeg;
pub mod platform;

pub use helper::{SnapshotFallbackSource, WebcamHelper};
