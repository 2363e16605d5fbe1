use tracing_subscriber::{fmt, EnvFilter};

pub mod http_tracing;
pub mod logging;

pub use http_tracing::{trace_http_request, X_REQUEST_ID};
pub use logging::{init_structured_logging, LogConfig, LogFormat};

/// Plain `fmt` subscriber honouring `RUST_LOG`, for tests and tools.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
