pub mod metrics;
pub mod tracing;

pub use metrics::MetricsRecorder;
pub use self::tracing::init_tracing;
