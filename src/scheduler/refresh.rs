//! Per-source refresh timers

use crate::events::{EventBus, FederationEvent};
use crate::graph::SourceLocation;
use crate::loader::SourceLoader;
use crate::metrics;
use crate::GraphFedError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// An armed periodic reload
///
/// Owns the timer task; cancelling or dropping the handle stops it.
#[derive(Debug)]
pub struct ScheduledTask {
    location: SourceLocation,
    interval: Duration,
    scheduled_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Source being refreshed
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Fixed delay between reloads
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the task was armed
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    /// Stop the timer
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer task is still running
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Summary of one armed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub location: SourceLocation,
    pub interval: Duration,
    pub scheduled_at: DateTime<Utc>,
}

/// Keeps each polled source fresh on its own timer
///
/// Every task sleeps for its interval, reloads, and re-arms, forever. A failed
/// reload is reported and the same interval is used again: no backoff, no
/// jitter. Timers of different sources are independent.
pub struct RefreshScheduler {
    loader: Arc<SourceLoader>,
    events: EventBus,
    tasks: Mutex<HashMap<SourceLocation, ScheduledTask>>,
}

impl RefreshScheduler {
    /// Create a scheduler that reloads through `loader`
    pub fn new(loader: Arc<SourceLoader>, events: EventBus) -> Self {
        Self {
            loader,
            events,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<SourceLocation, ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm a periodic reload for a location
    ///
    /// Returns false if the location already has a running task. Must be called
    /// from within a tokio runtime.
    pub fn schedule(&self, location: SourceLocation, interval: Duration) -> bool {
        let mut tasks = self.tasks();
        if tasks.get(&location).is_some_and(ScheduledTask::is_active) {
            tracing::debug!(location = %location, "Refresh already scheduled");
            return false;
        }

        tracing::info!(
            location = %location,
            interval_secs = interval.as_secs_f64(),
            "Scheduling refresh"
        );

        let handle = tokio::spawn(refresh_loop(
            Arc::clone(&self.loader),
            location.clone(),
            interval,
        ));
        tasks.insert(
            location.clone(),
            ScheduledTask {
                location: location.clone(),
                interval,
                scheduled_at: Utc::now(),
                handle,
            },
        );
        metrics::set_scheduled_tasks(tasks.len());
        drop(tasks);

        self.events
            .send(FederationEvent::RefreshScheduled { location, interval });
        true
    }

    /// Stop refreshing a location
    pub fn cancel(&self, location: &SourceLocation) -> bool {
        let mut tasks = self.tasks();
        let removed = tasks.remove(location);
        metrics::set_scheduled_tasks(tasks.len());
        match removed {
            Some(task) => {
                task.cancel();
                tracing::info!(location = %location, "Refresh cancelled");
                true
            }
            None => false,
        }
    }

    /// Stop every timer
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks();
        for task in tasks.values() {
            task.cancel();
        }
        let count = tasks.len();
        tasks.clear();
        metrics::set_scheduled_tasks(0);
        if count > 0 {
            tracing::info!(count, "All refresh timers cancelled");
        }
    }

    /// Whether a location has a running task
    pub fn is_scheduled(&self, location: &SourceLocation) -> bool {
        self.tasks()
            .get(location)
            .is_some_and(ScheduledTask::is_active)
    }

    /// Armed tasks, sorted by location
    pub fn scheduled(&self) -> Vec<ScheduleEntry> {
        let mut entries: Vec<_> = self
            .tasks()
            .values()
            .map(|task| ScheduleEntry {
                location: task.location.clone(),
                interval: task.interval,
                scheduled_at: task.scheduled_at,
            })
            .collect();
        entries.sort_by(|a, b| a.location.cmp(&b.location));
        entries
    }

    /// Number of armed tasks
    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    /// Whether no tasks are armed
    pub fn is_empty(&self) -> bool {
        self.tasks().is_empty()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn refresh_loop(loader: Arc<SourceLoader>, location: SourceLocation, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        tracing::debug!(location = %location, "Refresh timer fired");
        if let Err(source) = loader.reload(&location).await {
            let error = GraphFedError::ScheduleFire {
                location: location.to_string(),
                source,
            };
            tracing::warn!(
                error = %error,
                retry_in_secs = interval.as_secs_f64(),
                "Scheduled reload failed, will retry"
            );
        }
    }
}
