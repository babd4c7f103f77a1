pub mod http;

use crate::backend::Backend;
use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

pub use http::HttpBackend;

/// Build the backend described by the configuration
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend = HttpBackend::new(config.backend.clone())?;
    Ok(Arc::new(backend))
}
