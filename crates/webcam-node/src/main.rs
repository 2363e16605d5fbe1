use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use webcam_node::api::{self, AppState};
use webcam_node::config::{Config, PlatformKind};
use webcam_node::default_camera::DefaultCameraStore;
use webcam_node::http::ReqwestExecutor;
use webcam_node::platform::{CameraListPlatform, ClassicWebcamPlatform, WebcamPlatform};
use webcam_node::WebcamHelper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let log_config = telemetry::LogConfig::new("webcam-node").with_version(env!("CARGO_PKG_VERSION"));
  // Keeps the file appender flushing until exit.
  let _log_guard = telemetry::init_structured_logging(log_config);

  let config = Config::from_env()?;

  let platform: Arc<dyn WebcamPlatform> = match config.platform {
    PlatformKind::CameraList => Arc::new(CameraListPlatform::new(&config.platform_file)),
    PlatformKind::Classic => Arc::new(ClassicWebcamPlatform::new(&config.platform_file)),
  };
  let executor = Arc::new(ReqwestExecutor::new(
    config.local_base_url.clone(),
    config.connect_timeout,
    config.read_timeout,
  )?);
  let default_camera = DefaultCameraStore::load(&config.data_dir);

  let helper = WebcamHelper::new(executor, platform, default_camera)
    .with_fallback_source(config.snapshot_fallback);
  let app = api::router(AppState::new(helper));

  let listener = TcpListener::bind(config.bind_addr).await?;
  info!(
    addr = %config.bind_addr,
    platform = ?config.platform,
    platform_file = %config.platform_file.display(),
    "webcam-node started"
  );

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    let _ = tokio::signal::ctrl_c().await;
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{signal, SignalKind};
    if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
      let _ = sigterm.recv().await;
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("shutdown signal received");
}
