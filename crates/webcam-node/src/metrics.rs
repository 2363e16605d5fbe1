use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static SNAPSHOT_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter("webcam_snapshot_requests_total", "Total snapshot requests")
});

pub static SNAPSHOT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter("webcam_snapshot_failures_total", "Snapshot requests that produced no image")
});

pub static SNAPSHOT_STREAM_FALLBACKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter(
    "webcam_snapshot_stream_fallbacks_total",
    "Snapshots that fell back to extracting a frame from the mjpeg stream",
  )
});

pub static JPEG_HEADER_REPAIRS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter("webcam_jpeg_header_repairs_total", "Snapshots whose JFIF identifier was repaired")
});

pub static STREAM_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter("webcam_stream_requests_total", "Total webcam stream requests")
});

pub static STREAM_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
  register_counter("webcam_stream_failures_total", "Webcam stream requests that produced no response")
});

// Names and help strings are compile-time constants.
#[allow(clippy::expect_used)]
fn register_counter(name: &str, help: &str) -> IntCounter {
  let c = IntCounter::new(name, help).expect("valid metric definition");
  REGISTRY.register(Box::new(c.clone())).ok();
  c
}

pub fn render() -> String {
  let mut buf = Vec::new();
  let encoder = TextEncoder::new();
  let mfs = REGISTRY.gather();
  encoder.encode(&mfs, &mut buf).ok();
  String::from_utf8(buf).unwrap_or_default()
}
