use std::sync::Arc;

use crate::services::{job_store::JobStore, pipeline::Pipeline};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobStore>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        let jobs = Arc::clone(pipeline.store());
        Self {
            jobs,
            pipeline: Arc::new(pipeline),
        }
    }
}
