// src/state.rs
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::services::generator::TextGenerator;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub generator: Arc<dyn TextGenerator>,
    /// Caps outstanding calls to the generation service.
    pub permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self { config, generator, permits }
    }
}
