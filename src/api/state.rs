use std::sync::Arc;

use crate::{db::RecommendationRepository, jobs::Jobs};

/// Shared state of the control API
#[derive(Clone)]
pub struct AppState {
    pub jobs: Jobs,
    pub recommendations: Arc<dyn RecommendationRepository>,
}

impl AppState {
    pub fn new(jobs: Jobs, recommendations: Arc<dyn RecommendationRepository>) -> Self {
        Self {
            jobs,
            recommendations,
        }
    }
}
