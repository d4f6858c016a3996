mod metrics;
mod tracing;

pub use metrics::{serve as serve_metrics, Metrics, MetricsSnapshot};
pub use tracing::init_tracing;
