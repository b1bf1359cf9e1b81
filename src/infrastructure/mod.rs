//! Cold path: configuration, logging, metrics

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::RealtimeConfig;
pub use logging::init_logging;
pub use metrics::{ClientMetrics, ClientMetricsSnapshot};
