//! Job orchestration
//!
//! Owns the planner and both schedulers, reports their status to the control
//! API and drives them on fixed intervals until shutdown.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    services::{
        recommend::{RecommendSummary, RecommendationPlanner},
        scheduler::{DownloadScheduler, JobStatus, SessionTracker, UpdateScheduler},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Recommend,
    Download,
    Update,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Recommend, JobKind::Download, JobKind::Update];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Recommend => "recommend",
            JobKind::Download => "download",
            JobKind::Update => "update",
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recommend" => Ok(JobKind::Recommend),
            "download" => Ok(JobKind::Download),
            "update" => Ok(JobKind::Update),
            other => Err(AppError::NotFound(format!("Unknown job: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub name: JobKind,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Clone)]
pub struct Jobs {
    planner: RecommendationPlanner,
    recommend_session: SessionTracker,
    download: DownloadScheduler,
    update: UpdateScheduler,
}

impl Jobs {
    pub fn new(
        planner: RecommendationPlanner,
        download: DownloadScheduler,
        update: UpdateScheduler,
    ) -> Self {
        Self {
            planner,
            recommend_session: SessionTracker::new(),
            download,
            update,
        }
    }

    /// Regenerates recommendations for every enabled media kind
    ///
    /// Cancelling stops the run between remote calls; rows created so far stay.
    pub async fn recommend(&self) -> AppResult<Vec<RecommendSummary>> {
        let ticket = self.recommend_session.begin().await;
        tracing::info!(job = "recommend", session_id = %ticket.id(), "Starting run");

        let result = tokio::select! {
            summaries = self.planner.recommend_enabled() => Ok(summaries),
            _ = ticket.cancelled() => Err(ticket.check().await.err().unwrap_or(AppError::Aborted)),
        };
        if let Ok(summaries) = &result {
            ticket.add_total(summaries.len()).await;
            ticket.advance(summaries.len()).await;
        }
        ticket.finish().await;
        result
    }

    pub async fn recommend_then_download(&self) {
        match self.recommend().await {
            Ok(_) => {
                // Outcome is logged by the scheduler
                let _ = self.download.run().await;
            }
            Err(e) => {
                tracing::info!(error = %e, "Recommendation run did not finish, skipping downloads")
            }
        }
    }

    pub async fn run(&self, kind: JobKind) {
        match kind {
            JobKind::Recommend => {
                if let Err(e) = self.recommend().await {
                    tracing::info!(job = %kind, error = %e, "Run ended early");
                }
            }
            JobKind::Download => {
                let _ = self.download.run().await;
            }
            JobKind::Update => {
                let _ = self.update.run().await;
            }
        }
    }

    /// Starts a run in the background and returns at once
    pub fn trigger(&self, kind: JobKind) -> JoinHandle<()> {
        let jobs = self.clone();
        tokio::spawn(async move { jobs.run(kind).await })
    }

    pub async fn cancel(&self, kind: JobKind) -> bool {
        match kind {
            JobKind::Recommend => self.recommend_session.cancel().await,
            JobKind::Download => self.download.cancel().await,
            JobKind::Update => self.update.cancel().await,
        }
    }

    pub async fn status(&self, kind: JobKind) -> JobStatus {
        match kind {
            JobKind::Recommend => self.recommend_session.status().await,
            JobKind::Download => self.download.status().await,
            JobKind::Update => self.update.status().await,
        }
    }

    pub async fn statuses(&self) -> Vec<JobView> {
        let mut views = Vec::with_capacity(JobKind::ALL.len());
        for name in JobKind::ALL {
            views.push(JobView {
                name,
                status: self.status(name).await,
            });
        }
        views
    }
}

/// Spawns the periodic "recommend then download" and "update" loops
pub fn spawn_periodic(
    jobs: Jobs,
    recommend_every: Duration,
    update_every: Duration,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let recommend_jobs = jobs.clone();
    let recommend_shutdown = shutdown.clone();
    let recommend = tokio::spawn(async move {
        run_every("recommend", recommend_every, recommend_shutdown, || {
            let jobs = recommend_jobs.clone();
            async move { jobs.recommend_then_download().await }
        })
        .await
    });

    let update = tokio::spawn(async move {
        run_every("update", update_every, shutdown, || {
            let jobs = jobs.clone();
            async move { jobs.run(JobKind::Update).await }
        })
        .await
    });

    vec![recommend, update]
}

async fn run_every<F, Fut>(
    name: &'static str,
    every: Duration,
    shutdown: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    tracing::info!(job = name, interval_secs = every.as_secs(), "Periodic job started");

    let mut interval = tokio::time::interval(every);
    // A run longer than the interval must not trigger a burst of catch-up runs
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(job = name, "Periodic job stopping");
                break;
            }
            _ = interval.tick() => {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!(job = name, "Periodic job stopping mid-run");
                        break;
                    }
                    _ = job() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_job_kind_from_str() {
        assert_eq!("recommend".parse::<JobKind>().unwrap(), JobKind::Recommend);
        assert_eq!("Download".parse::<JobKind>().unwrap(), JobKind::Download);
        assert!(matches!(
            "reindex".parse::<JobKind>(),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_job_view_serializes_flat() {
        let view = JobView {
            name: JobKind::Update,
            status: JobStatus {
                running: true,
                progress: 2,
                total: 5,
            },
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "update", "running": true, "progress": 2, "total": 5})
        );
    }

    #[tokio::test]
    async fn test_run_every_stops_on_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let counter = runs.clone();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            run_every("test", Duration::from_millis(5), token, || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(runs.load(Ordering::SeqCst) >= 1);
    }
}
