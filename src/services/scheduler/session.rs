use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Progress snapshot of a scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub running: bool,
    /// Items processed so far in the current run
    pub progress: usize,
    /// Items the current run will attempt
    pub total: usize,
}

#[derive(Default)]
struct SessionState {
    running: bool,
    session_id: Option<Uuid>,
    progress: usize,
    total: usize,
    cancel: CancellationToken,
}

/// Run bookkeeping shared between a scheduler and its status readers
///
/// Starting a run mints a new session id and cancels the token of the run it
/// replaces. A run finds out it was replaced or cancelled at its next tick
/// boundary by calling [`SessionTicket::check`].
///
/// At most one slice runs at a time across all sessions of a tracker, so a new
/// run never works on items an old run still has in flight.
#[derive(Clone, Default)]
pub struct SessionTracker {
    state: Arc<RwLock<SessionState>>,
    slice: Arc<Mutex<()>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes any run in progress and starts a new session
    pub async fn begin(&self) -> SessionTicket {
        let mut state = self.state.write().await;
        state.cancel.cancel();

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        state.running = true;
        state.session_id = Some(id);
        state.progress = 0;
        state.total = 0;
        state.cancel = cancel.clone();

        SessionTicket {
            id,
            cancel,
            tracker: self.clone(),
        }
    }

    /// Stops the current run at its next tick boundary; `false` when nothing runs
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.running {
            return false;
        }
        state.running = false;
        state.cancel.cancel();
        true
    }

    pub async fn status(&self) -> JobStatus {
        let state = self.state.read().await;
        JobStatus {
            running: state.running,
            progress: state.progress,
            total: state.total,
        }
    }

    pub async fn current_session(&self) -> Option<Uuid> {
        self.state.read().await.session_id
    }
}

/// Handle held by one run
pub struct SessionTicket {
    id: Uuid,
    cancel: CancellationToken,
    tracker: SessionTracker,
}

impl SessionTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Errors with `SessionSuperseded` or `Aborted` once this run lost ownership
    pub async fn check(&self) -> AppResult<()> {
        let state = self.tracker.state.read().await;
        if state.session_id != Some(self.id) {
            return Err(AppError::SessionSuperseded(self.id));
        }
        if !state.running {
            return Err(AppError::Aborted);
        }
        Ok(())
    }

    /// Waits out the tick delay, cut short by cancel or a newer session
    pub async fn tick(&self, interval: Duration) -> AppResult<()> {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.cancel.cancelled() => {}
        }
        self.check().await
    }

    /// Waits until no older run has a slice in flight
    pub async fn settle(&self) {
        drop(self.tracker.slice.lock().await);
    }

    /// Claims the slice slot, then confirms this run still owns the tracker
    ///
    /// The slice runs while the returned guard is held.
    pub async fn begin_slice(&self) -> AppResult<OwnedMutexGuard<()>> {
        let guard = self.tracker.slice.clone().lock_owned().await;
        self.check().await?;
        Ok(guard)
    }

    /// Resolves once this run is cancelled or superseded
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub async fn add_total(&self, count: usize) {
        let mut state = self.tracker.state.write().await;
        if state.session_id == Some(self.id) {
            state.total += count;
        }
    }

    pub async fn advance(&self, count: usize) {
        let mut state = self.tracker.state.write().await;
        if state.session_id == Some(self.id) {
            state.progress += count;
        }
    }

    /// Marks the run finished unless a newer session already owns the tracker
    pub async fn finish(self) {
        let mut state = self.tracker.state.write().await;
        if state.session_id == Some(self.id) {
            state.running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_begin_and_finish() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.status().await, JobStatus::default());

        let ticket = tracker.begin().await;
        ticket.add_total(4).await;
        ticket.advance(1).await;
        assert_ok!(ticket.check().await);
        assert_eq!(
            tracker.status().await,
            JobStatus {
                running: true,
                progress: 1,
                total: 4
            }
        );
        assert_eq!(tracker.current_session().await, Some(ticket.id()));

        ticket.finish().await;
        assert!(!tracker.status().await.running);
    }

    #[tokio::test]
    async fn test_new_session_supersedes_old() {
        let tracker = SessionTracker::new();
        let first = tracker.begin().await;
        let second = tracker.begin().await;

        let result = first.tick(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AppError::SessionSuperseded(id)) if id == first.id()));
        assert_ok!(second.check().await);

        // A superseded run must not flip the newer run's state
        first.advance(3).await;
        first.finish().await;
        let status = tracker.status().await;
        assert!(status.running);
        assert_eq!(status.progress, 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_tick() {
        let tracker = SessionTracker::new();
        let ticket = tracker.begin().await;

        assert!(tracker.cancel().await);
        let result = ticket.tick(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AppError::Aborted)));
        assert!(!tracker.cancel().await);
    }

    #[tokio::test]
    async fn test_new_session_waits_for_slice_in_flight() {
        let tracker = SessionTracker::new();
        let first = tracker.begin().await;
        let slice = assert_ok!(first.begin_slice().await);

        let second = tracker.begin().await;
        let settle = tokio::spawn(async move {
            second.settle().await;
            second
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!settle.is_finished());

        drop(slice);
        let second = settle.await.unwrap();
        assert!(matches!(
            first.begin_slice().await,
            Err(AppError::SessionSuperseded(_))
        ));
        assert_ok!(second.begin_slice().await);
    }
}
