pub mod handlers;
pub mod pages;
pub mod routes;

pub use routes::*;

use crate::ml::PredictionService;
use crate::recommendations::Advisor;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub advisor: Arc<dyn Advisor>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, advisor: Arc<dyn Advisor>) -> Self {
        Self {
            service,
            advisor,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
