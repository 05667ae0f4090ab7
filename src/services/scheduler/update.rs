use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::{
    db::{LibraryRepository, RecommendationRepository},
    error::AppResult,
    models::{MediaType, RecommendedItem},
    services::dvr::{DvrClient, DvrConnector},
    settings::SettingsProvider,
};

use super::{
    ensure_ready, log_run_outcome, JobStatus, SchedulerOptions, SessionTicket, SessionTracker,
};

const JOB: &str = "update";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSummary {
    pub checked: usize,
    pub removed: usize,
    pub refreshed: usize,
    /// Items of a media kind without an enabled DVR
    pub skipped: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Removed,
    Refreshed,
    Unchanged,
    Skipped,
    Failed,
}

/// Applies removals requested by the user and refreshes observed file sizes
#[derive(Clone)]
pub struct UpdateScheduler {
    session: SessionTracker,
    recommendations: Arc<dyn RecommendationRepository>,
    library: Arc<dyn LibraryRepository>,
    connector: Arc<dyn DvrConnector>,
    settings: Arc<dyn SettingsProvider>,
    options: SchedulerOptions,
}

impl UpdateScheduler {
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

    pub async fn run(&self) -> AppResult<UpdateSummary> {
        let ticket = self.session.begin().await;
        tracing::info!(job = JOB, session_id = %ticket.id(), "Starting run");
        ticket.settle().await;

        let result = self.run_session(&ticket).await;
        log_run_outcome(JOB, &result);
        ticket.finish().await;
        result
    }

    /// DVR clients of the enabled media kinds that have a usable profile
    fn connect_enabled(&self) -> HashMap<MediaType, Arc<dyn DvrClient>> {
        let mut clients = HashMap::new();
        for media_type in MediaType::ALL {
            if !self.settings.recommend_settings(media_type).enabled {
                continue;
            }
            match self.settings.active_profile(media_type) {
                Ok(profile) => {
                    clients.insert(media_type, self.connector.connect(media_type, &profile));
                }
                Err(e) => {
                    tracing::warn!(media_type = %media_type, error = %e, "Skipping media kind");
                }
            }
        }
        clients
    }

    async fn run_session(&self, ticket: &SessionTicket) -> AppResult<UpdateSummary> {
        ensure_ready(self.recommendations.as_ref(), self.settings.as_ref()).await?;

        let clients = self.connect_enabled();
        let items = self.recommendations.list_recommended().await?;
        ticket.add_total(items.len()).await;

        tracing::info!(
            session_id = %ticket.id(),
            items = items.len(),
            "Reconciling recommendations"
        );

        let mut summary = UpdateSummary::default();
        for (index, slice) in items.chunks(self.options.slice_size()).enumerate() {
            if index > 0 {
                ticket.tick(self.options.tick_interval).await?;
            }
            let _slice = ticket.begin_slice().await?;

            let outcomes = join_all(
                slice
                    .iter()
                    .cloned()
                    .map(|item| self.process_item(&clients, item)),
            )
            .await;

            for outcome in outcomes {
                summary.checked += 1;
                match outcome {
                    ItemOutcome::Removed => summary.removed += 1,
                    ItemOutcome::Refreshed => summary.refreshed += 1,
                    ItemOutcome::Unchanged => {}
                    ItemOutcome::Skipped => summary.skipped += 1,
                    ItemOutcome::Failed => summary.failed += 1,
                }
            }
            ticket.advance(slice.len()).await;
        }

        Ok(summary)
    }

    async fn process_item(
        &self,
        clients: &HashMap<MediaType, Arc<dyn DvrClient>>,
        item: RecommendedItem,
    ) -> ItemOutcome {
        let Some(dvr) = clients.get(&item.media_type) else {
            return ItemOutcome::Skipped;
        };
        let catalog_id = item.catalog_id;

        match self.reconcile(dvr.as_ref(), item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(catalog_id, dvr = dvr.name(), error = %e, "Reconciliation failed");
                ItemOutcome::Failed
            }
        }
    }

    async fn reconcile(
        &self,
        dvr: &dyn DvrClient,
        mut item: RecommendedItem,
    ) -> AppResult<ItemOutcome> {
        if item.to_remove {
            self.library
                .delete_media_by_catalog_id(item.catalog_id, item.media_type)
                .await?;
            self.recommendations.delete_recommended(item.id).await?;

            if let Some(remote) = dvr.lookup(&item).await? {
                let queue = dvr.list_queue().await?;
                for entry in queue.iter().filter(|entry| entry.parent_id == remote.id) {
                    dvr.remove_from_queue(entry.id).await?;
                }
                dvr.delete_remote_item(remote.id).await?;
            }

            tracing::info!(
                catalog_id = item.catalog_id,
                media_type = %item.media_type,
                "Removed recommendation"
            );
            return Ok(ItemOutcome::Removed);
        }

        match dvr.lookup(&item).await? {
            Some(remote) if remote.has_file && item.file_size != Some(remote.size_on_disk) => {
                item.file_size = Some(remote.size_on_disk);
                self.recommendations.save_recommended(&item).await?;
                tracing::debug!(
                    catalog_id = item.catalog_id,
                    size_bytes = remote.size_on_disk,
                    "Refreshed file size"
                );
                Ok(ItemOutcome::Refreshed)
            }
            _ => Ok(ItemOutcome::Unchanged),
        }
    }
}
