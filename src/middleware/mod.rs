pub mod logging;
pub mod metrics;
pub mod request_id;

pub use logging::create_logging_middleware;
pub use metrics::{init_metrics, metrics_middleware};
pub use request_id::request_id_middleware;
