//! Application state shared across all request handlers.

use autoboard_core::engine::AdEngine;
use std::sync::Arc;

/// Cloneable handle to the publication engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AdEngine>,
}

impl AppState {
    pub fn new(engine: AdEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
