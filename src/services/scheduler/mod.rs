//! Session-scoped batch schedulers
//!
//! [`DownloadScheduler`] acquires pending recommendations through the DVR
//! while respecting the size quota; [`UpdateScheduler`] reconciles stored rows
//! with what the DVR reports. Both walk their work in slices with a tick delay
//! in between, and both can be cancelled or superseded by a newer run.

use std::time::Duration;

use crate::{
    db::RecommendationRepository,
    error::{AppError, AppResult},
    models::ADMIN_USER_ID,
    settings::SettingsProvider,
};

pub mod download;
pub mod quota;
pub mod session;
pub mod update;

pub use download::{DownloadScheduler, DownloadSummary};
pub use quota::{parse_max_quota, QuotaTracker};
pub use session::{JobStatus, SessionTicket, SessionTracker};
pub use update::{UpdateScheduler, UpdateSummary};

/// Timing knobs of a scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    /// Delay between two slices
    pub tick_interval: Duration,
    /// Items processed concurrently per slice
    pub slice_size: usize,
    /// Delay between two queue polls after an acquisition request
    pub poll_interval: Duration,
    pub poll_attempts: usize,
}

impl SchedulerOptions {
    pub fn download() -> Self {
        Self {
            tick_interval: Duration::from_secs(35),
            slice_size: 1,
            poll_interval: Duration::from_secs(10),
            poll_attempts: 3,
        }
    }

    pub fn update() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            ..Self::download()
        }
    }

    pub(crate) fn slice_size(&self) -> usize {
        self.slice_size.max(1)
    }
}

/// Runs only make sense with the admin user present and a media kind enabled
pub(crate) async fn ensure_ready(
    recommendations: &dyn RecommendationRepository,
    settings: &dyn SettingsProvider,
) -> AppResult<()> {
    if !recommendations.user_exists(ADMIN_USER_ID).await? {
        return Err(AppError::Configuration(
            "Admin user does not exist".to_string(),
        ));
    }
    if !settings.any_enabled() {
        return Err(AppError::Configuration(
            "No media kind has recommendations enabled".to_string(),
        ));
    }
    Ok(())
}

/// Logs how a run ended at the level its error kind calls for
pub(crate) fn log_run_outcome<T>(job: &'static str, result: &AppResult<T>) {
    match result {
        Ok(_) => tracing::info!(job, "Run complete"),
        Err(AppError::SessionSuperseded(session_id)) => {
            tracing::debug!(job, session_id = %session_id, "Run superseded by a newer session")
        }
        Err(AppError::Aborted) => tracing::info!(job, "Run aborted"),
        Err(AppError::Configuration(msg)) => tracing::warn!(job, reason = %msg, "Run skipped"),
        Err(e) => tracing::error!(job, error = %e, "Run interrupted"),
    }
}
