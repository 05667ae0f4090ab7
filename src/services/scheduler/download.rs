use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::{
    db::{LibraryRepository, RecommendationRepository},
    error::AppResult,
    models::{Acquisition, AcquisitionRequest, LibraryRequest, MediaType, RecommendedItem},
    services::dvr::{DvrClient, DvrConnector},
    settings::{ServiceProfile, SettingsProvider},
};

use super::{
    ensure_ready, log_run_outcome, JobStatus, QuotaTracker, SchedulerOptions, SessionTicket,
    SessionTracker,
};

const JOB: &str = "download";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DownloadSummary {
    pub attempted: usize,
    /// Items that showed up in the DVR queue
    pub downloading: usize,
    /// Items that never reached the queue and were rolled back
    pub dropped: usize,
    pub failed: usize,
    pub quota_reached: bool,
}

enum ItemOutcome {
    Downloading { bytes: u64 },
    Dropped,
    Failed,
}

/// Hands pending recommendations to the DVR, one slice per tick, until the quota is reached
#[derive(Clone)]
pub struct DownloadScheduler {
    session: SessionTracker,
    recommendations: Arc<dyn RecommendationRepository>,
    library: Arc<dyn LibraryRepository>,
    connector: Arc<dyn DvrConnector>,
    settings: Arc<dyn SettingsProvider>,
    options: SchedulerOptions,
}

impl DownloadScheduler {
    pub fn new(
        recommendations: Arc<dyn RecommendationRepository>,
        library: Arc<dyn LibraryRepository>,
        connector: Arc<dyn DvrConnector>,
        settings: Arc<dyn SettingsProvider>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            session: SessionTracker::new(),
            recommendations,
            library,
            connector,
            settings,
            options,
        }
    }

    pub async fn status(&self) -> JobStatus {
        self.session.status().await
    }

    pub async fn cancel(&self) -> bool {
        self.session.cancel().await
    }

    /// Starts a new session, superseding any run still in progress
    pub async fn run(&self) -> AppResult<DownloadSummary> {
        let ticket = self.session.begin().await;
        tracing::info!(job = JOB, session_id = %ticket.id(), "Starting run");
        ticket.settle().await;

        let result = self.run_session(&ticket).await;
        log_run_outcome(JOB, &result);
        ticket.finish().await;
        result
    }

    async fn run_session(&self, ticket: &SessionTicket) -> AppResult<DownloadSummary> {
        ensure_ready(self.recommendations.as_ref(), self.settings.as_ref()).await?;

        let mut summary = DownloadSummary::default();
        for media_type in MediaType::ALL {
            if self.settings.recommend_settings(media_type).enabled {
                self.download_kind(ticket, media_type, &mut summary).await?;
            }
        }
        Ok(summary)
    }

    async fn download_kind(
        &self,
        ticket: &SessionTicket,
        media_type: MediaType,
        summary: &mut DownloadSummary,
    ) -> AppResult<()> {
        let settings = self.settings.recommend_settings(media_type);
        let profile = self.settings.active_profile(media_type)?;
        let dvr = self.connector.connect(media_type, &profile);

        let pending = self.recommendations.list_pending(media_type).await?;
        let mut quota = QuotaTracker::from_setting(
            &settings.max_quota,
            pending.iter().filter_map(|item| item.file_size),
        );
        let items: Vec<RecommendedItem> = pending
            .into_iter()
            .filter(|item| item.file_size.is_none())
            .collect();

        if quota.is_exhausted() {
            tracing::info!(
                media_type = %media_type,
                size_gb = quota.size_so_far_gb(),
                limit_gb = quota.limit_gb(),
                "Quota already reached"
            );
            summary.quota_reached = true;
            return Ok(());
        }

        tracing::info!(
            session_id = %ticket.id(),
            media_type = %media_type,
            items = items.len(),
            size_gb = quota.size_so_far_gb(),
            limit_gb = quota.limit_gb(),
            "Downloading recommendations"
        );
        ticket.add_total(items.len()).await;

        for (index, slice) in items.chunks(self.options.slice_size()).enumerate() {
            if quota.is_exhausted() {
                tracing::info!(
                    media_type = %media_type,
                    size_gb = quota.size_so_far_gb(),
                    "Quota reached, no further downloads"
                );
                summary.quota_reached = true;
                break;
            }
            if index > 0 {
                ticket.tick(self.options.tick_interval).await?;
            }
            let _slice = ticket.begin_slice().await?;

            let outcomes = join_all(
                slice
                    .iter()
                    .cloned()
                    .map(|item| self.process_item(dvr.as_ref(), &profile, item)),
            )
            .await;

            for outcome in outcomes {
                summary.attempted += 1;
                match outcome {
                    ItemOutcome::Downloading { bytes } => {
                        quota.record_bytes(bytes);
                        summary.downloading += 1;
                    }
                    ItemOutcome::Dropped => summary.dropped += 1,
                    ItemOutcome::Failed => summary.failed += 1,
                }
            }
            ticket.advance(slice.len()).await;
        }

        Ok(())
    }

    async fn process_item(
        &self,
        dvr: &dyn DvrClient,
        profile: &ServiceProfile,
        item: RecommendedItem,
    ) -> ItemOutcome {
        let catalog_id = item.catalog_id;
        let media_type = item.media_type;

        match self.acquire(dvr, profile, item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    catalog_id,
                    media_type = %media_type,
                    dvr = dvr.name(),
                    error = %e,
                    "Acquisition failed"
                );
                ItemOutcome::Failed
            }
        }
    }

    async fn acquire(
        &self,
        dvr: &dyn DvrClient,
        profile: &ServiceProfile,
        item: RecommendedItem,
    ) -> AppResult<ItemOutcome> {
        let request = self.library.create_request(&item, profile.is4k).await?;

        let acquisition = AcquisitionRequest {
            media_type: item.media_type,
            catalog_id: item.catalog_id,
            tvdb_id: item.external_ids.tvdb_id,
            quality_profile_id: profile.active_profile_id,
            root_folder: profile.active_directory.clone(),
            tags: profile.tags.clone(),
            language_profile_id: profile.active_language_profile_id,
        };
        let acquired = match dvr.request_acquisition(&acquisition).await {
            Ok(acquired) => acquired,
            Err(e) => {
                self.roll_back(dvr, &item, request, None).await;
                return Err(e);
            }
        };

        match self
            .follow_up(dvr, profile, item.clone(), request, &acquired)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.roll_back(dvr, &item, request, Some(&acquired)).await;
                Err(e)
            }
        }
    }

    /// Links the library item and waits for the download to show up
    async fn follow_up(
        &self,
        dvr: &dyn DvrClient,
        profile: &ServiceProfile,
        mut item: RecommendedItem,
        request: LibraryRequest,
        acquired: &Acquisition,
    ) -> AppResult<ItemOutcome> {
        let remote = &acquired.remote;
        self.library
            .attach_external_service(request.media_id, remote.id)
            .await?;

        // Already on disk before this request, nothing will be queued
        let bytes = if !acquired.newly_added && remote.has_file {
            Some(remote.size_on_disk)
        } else {
            self.wait_for_queue(dvr, remote.id).await?
        };

        if let Some(bytes) = bytes {
            item.file_size = Some(bytes);
            self.recommendations.save_recommended(&item).await?;
            tracing::info!(
                catalog_id = item.catalog_id,
                media_type = %item.media_type,
                size_bytes = bytes,
                newly_added = acquired.newly_added,
                "Download started"
            );
            return Ok(ItemOutcome::Downloading { bytes });
        }

        tracing::info!(
            catalog_id = item.catalog_id,
            media_type = %item.media_type,
            dvr = dvr.name(),
            "Item never reached the download queue, removing it"
        );
        self.discard(&item, request).await?;

        if acquired.newly_added {
            if let Some(tracked) = dvr.lookup(&item).await? {
                if tracked.monitored && tracked.quality_profile_id == profile.active_profile_id {
                    dvr.delete_remote_item(tracked.id).await?;
                }
            }
        }

        Ok(ItemOutcome::Dropped)
    }

    /// Total size of the queue entries for `remote_id`, polling a bounded number of times
    ///
    /// A series downloads as one entry per episode, so every matching entry counts.
    async fn wait_for_queue(&self, dvr: &dyn DvrClient, remote_id: i64) -> AppResult<Option<u64>> {
        for attempt in 0..self.options.poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.options.poll_interval).await;
            }

            let queue = dvr.list_queue().await?;
            let mut entries = queue
                .iter()
                .filter(|entry| entry.parent_id == remote_id)
                .peekable();
            if entries.peek().is_some() {
                return Ok(Some(entries.map(|entry| entry.size_bytes).sum()));
            }
            tracing::debug!(remote_id, attempt, "Not in the download queue yet");
        }
        Ok(None)
    }

    /// Undoes a failed acquisition, logging cleanup steps that fail in turn
    ///
    /// The remote item is only deleted when this request created it.
    async fn roll_back(
        &self,
        dvr: &dyn DvrClient,
        item: &RecommendedItem,
        request: LibraryRequest,
        acquired: Option<&Acquisition>,
    ) {
        if let Err(e) = self.discard(item, request).await {
            tracing::warn!(
                catalog_id = item.catalog_id,
                error = %e,
                "Rollback of the library request did not complete"
            );
        }

        if let Some(acquired) = acquired.filter(|acquired| acquired.newly_added) {
            if let Err(e) = dvr.delete_remote_item(acquired.remote.id).await {
                tracing::warn!(
                    catalog_id = item.catalog_id,
                    remote_id = acquired.remote.id,
                    dvr = dvr.name(),
                    error = %e,
                    "Rollback of the DVR item did not complete"
                );
            }
        }
    }

    /// Drops the request, the library placeholder and the recommendation row
    async fn discard(&self, item: &RecommendedItem, request: LibraryRequest) -> AppResult<()> {
        self.library.delete_request(request.request_id).await?;
        self.library.delete_media(request.media_id).await?;
        self.recommendations.delete_recommended(item.id).await?;
        Ok(())
    }
}
