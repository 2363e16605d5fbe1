use axum::{
  middleware,
  routing::get,
  Router,
};
use std::sync::Arc;
use telemetry::trace_http_request;
use tower::ServiceBuilder;

use crate::helper::WebcamHelper;

mod dto;
mod error;
mod routes;

pub use dto::*;
pub use error::{ApiError, ApiResult};
pub use routes::*;

#[derive(Clone)]
pub struct AppState {
  pub helper: Arc<WebcamHelper>,
}

impl AppState {
  pub fn new(helper: WebcamHelper) -> Self {
    Self {
      helper: Arc::new(helper),
    }
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/healthz", get(healthz))
    .route("/readyz", get(readyz))
    .route("/metrics", get(metrics))
    .route("/v1/webcams", get(list_webcams))
    .route("/v1/webcams/default", get(get_default_camera).put(set_default_camera))
    .route("/v1/webcams/snapshot", get(snapshot))
    .route("/v1/webcams/stream", get(stream))
    .route("/v1/oracle", get(oracle))
    .with_state(state)
    .layer(ServiceBuilder::new().layer(middleware::from_fn(trace_http_request)))
}
