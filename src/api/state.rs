use std::sync::Arc;

use crate::config::Config;
use crate::models::Catalog;
use crate::services::{TelemetrySink, TracingSink, DEFAULT_EXHAUSTIVE_SERVICE_LIMIT};

/// Shared application state
///
/// The catalog is read-only after start-up, so requests share it without locking.
/// Each request builds its own engine on top of it.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub exhaustive_service_limit: usize,
    pub telemetry_enabled: bool,
}

impl AppState {
    /// Creates state over a loaded catalog, logging telemetry through `tracing`
    pub fn new(catalog: Catalog, config: &Config) -> Self {
        Self {
            catalog: Arc::new(catalog),
            telemetry: Arc::new(TracingSink),
            exhaustive_service_limit: config.exhaustive_service_limit,
            telemetry_enabled: config.telemetry_enabled,
        }
    }

    /// Creates state with default settings
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            telemetry: Arc::new(TracingSink),
            exhaustive_service_limit: DEFAULT_EXHAUSTIVE_SERVICE_LIMIT,
            telemetry_enabled: true,
        }
    }

    /// Replaces the telemetry sink
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }
}
